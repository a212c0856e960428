use anyhow::{Context, Result, anyhow};
use diesel::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::web::PgPool;

// Embed migrations at compile time
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/");

/// Create an r2d2 connection pool for the given database URL
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    Pool::builder()
        .max_size(10)
        .build(manager)
        .context("Failed to create database connection pool")
}

/// Run all pending migrations
pub fn run_migrations(pool: &PgPool) -> Result<()> {
    let mut conn = pool.get().context("Failed to get database connection")?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow!("Failed to run migrations: {e}"))?;

    if applied.is_empty() {
        info!("Database schema is up to date");
    } else {
        for migration in &applied {
            info!("Applied migration: {}", migration);
        }
    }
    Ok(())
}
