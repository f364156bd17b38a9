//! User Service Library
//!
//! User repository over a relational store: read queries, transactional
//! writes with uniqueness checks, and a validated service layer on top.
//! The `user-service` binary wraps the schema and connectivity commands.

pub mod config;
pub mod infra;
pub mod repository;
pub mod service;

use std::sync::Arc;

use sea_orm::DbErr;
use tracing::info;

use crate::config::UserServiceConfig;
use crate::infra::{Database, Persistence};
use crate::repository::{UserRepository, UserStore};
use crate::service::UserManager;

/// Connect, apply pending migrations and build the repository.
pub async fn connect(config: &UserServiceConfig) -> Result<UserStore, DbErr> {
    let db = Database::connect(&config.database).await?;
    let persistence = Persistence::new(db.get_connection(), config.isolation_level);
    Ok(UserStore::new(persistence))
}

/// Repository plus the service wrapping it.
pub async fn build_service(config: &UserServiceConfig) -> Result<UserManager, DbErr> {
    let store = connect(config).await?;
    Ok(UserManager::new(Arc::new(store)))
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

/// Check connectivity and report how many users are stored.
pub async fn ping() -> Result<u64, Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;
    db.ping().await?;
    info!("Database reachable");

    let store = UserStore::new(Persistence::new(db.get_connection(), config.isolation_level));
    let total = store.count_all().await?;
    Ok(total)
}
