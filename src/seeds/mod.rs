//! Database seeding functionality
//!
//! Bootstraps a fresh database with the default departments and an admin
//! account. Every step is idempotent, so seeding runs on each startup.

use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::models::Role;
use crate::password::hash_password;
use crate::repositories::department::NewDepartment;
use crate::repositories::user::NewUser;
use crate::repositories::{DepartmentRepository, UserRepository};

const DEFAULT_DEPARTMENTS: [(&str, &str); 4] = [
    ("Human Resources", "HR Department"),
    ("Engineering", "Engineering Department"),
    ("Marketing", "Marketing Department"),
    ("Finance", "Finance Department"),
];

/// Seeds departments and the bootstrap admin.
pub async fn seed_all(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    seed_departments(db).await?;
    seed_admin(db, config).await?;
    Ok(())
}

/// Creates any missing default department.
pub async fn seed_departments(db: &DatabaseConnection) -> Result<()> {
    let repo = DepartmentRepository::new(db);

    for (name, description) in DEFAULT_DEPARTMENTS {
        if repo
            .find_by_name(name)
            .await
            .with_context(|| format!("Failed to look up department '{name}'"))?
            .is_some()
        {
            log::debug!("Department '{}' already exists, skipping", name);
            continue;
        }

        repo.create(
            NewDepartment {
                name: name.to_string(),
                description: Some(description.to_string()),
                head_id: None,
                budget: None,
                goals: None,
            },
            Utc::now(),
        )
        .await
        .with_context(|| format!("Failed to create department '{name}'"))?;
        log::info!("Created department: {}", name);
    }

    Ok(())
}

/// Creates the configured admin account unless some admin already exists.
///
/// Outside local/test profiles an explicit `HR_SEED_ADMIN_PASSWORD` is
/// required; without one the step is skipped with a warning.
pub async fn seed_admin(db: &DatabaseConnection, config: &AppConfig) -> Result<()> {
    let repo = UserRepository::new(db);

    if repo
        .any_admin_exists()
        .await
        .context("Failed to check for existing admin users")?
    {
        log::info!("Admin user already exists, skipping");
        return Ok(());
    }

    let Some(password) = config.seed_admin_password() else {
        log::warn!(
            "No admin user exists and HR_SEED_ADMIN_PASSWORD is not set; skipping admin seeding"
        );
        return Ok(());
    };

    let password_hash = hash_password(password).context("Failed to hash seed admin password")?;
    let email = config.seed_admin_email.trim().to_lowercase();

    repo.create(
        NewUser {
            email: email.clone(),
            password_hash,
            role: Role::Admin,
            employee_id: None,
        },
        Utc::now(),
    )
    .await
    .context("Failed to create seed admin user")?;
    log::info!("Created admin user: {}", email);

    Ok(())
}
