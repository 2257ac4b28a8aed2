//! Database migrations for the Standup Recap service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000100_create_connections;
mod m2025_06_01_000200_create_daily_recaps;
mod m2025_06_01_000300_create_recap_scripts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000100_create_connections::Migration),
            Box::new(m2025_06_01_000200_create_daily_recaps::Migration),
            Box::new(m2025_06_01_000300_create_recap_scripts::Migration),
        ]
    }
}
