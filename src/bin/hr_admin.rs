//! Operator commands for the HR service database.
//!
//! Usage:
//!   hr-admin create-admin --email ops@example.com --password 's3cret!'
//!   hr-admin reset-password --email jane@example.com --password 'n3w-pass'

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use hr_service::{
    config::ConfigLoader,
    db,
    models::Role,
    password::{MIN_PASSWORD_LEN, hash_password},
    repositories::{UserRepository, user::NewUser},
};

#[derive(Parser, Debug)]
#[command(name = "hr-admin")]
#[command(about = "Account maintenance for the HR service", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create an admin account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Set a new password for an existing account and revoke its refresh token
    ResetPassword {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

fn check_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("password must be at least {MIN_PASSWORD_LEN} characters");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    let db = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&db).await?;

    let users = UserRepository::new(&db);

    match args.command {
        Command::CreateAdmin { email, password } => {
            check_password(&password)?;
            let password_hash = hash_password(&password).context("hashing password")?;
            let user = users
                .create(
                    NewUser {
                        email: email.trim().to_lowercase(),
                        password_hash,
                        role: Role::Admin,
                        employee_id: None,
                    },
                    Utc::now(),
                )
                .await
                .with_context(|| format!("creating admin {email}"))?;
            println!("Created admin user {} (id {})", user.email, user.id);
        }
        Command::ResetPassword { email, password } => {
            check_password(&password)?;
            let user = users
                .find_by_email(&email.trim().to_lowercase())
                .await
                .context("looking up user")?
                .with_context(|| format!("no user with email {email}"))?;
            let password_hash = hash_password(&password).context("hashing password")?;
            users
                .update_password(user, password_hash, Utc::now())
                .await
                .context("updating password")?;
            println!("Password reset for {email}");
        }
    }

    Ok(())
}
