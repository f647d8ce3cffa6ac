//! Database migrations for the HR service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_01_000001_create_departments;
mod m2025_01_01_000002_create_employees;
mod m2025_01_01_000003_create_users;
mod m2025_01_01_000004_create_attendance;
mod m2025_01_01_000005_create_leaves;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_01_000001_create_departments::Migration),
            Box::new(m2025_01_01_000002_create_employees::Migration),
            Box::new(m2025_01_01_000003_create_users::Migration),
            Box::new(m2025_01_01_000004_create_attendance::Migration),
            Box::new(m2025_01_01_000005_create_leaves::Migration),
        ]
    }
}
