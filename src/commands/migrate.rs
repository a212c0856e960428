use anyhow::Result;
use tracing::info;

use crate::db;
use crate::web::PgPool;

/// Run pending migrations and exit
pub fn handle_migrate(pool: &PgPool) -> Result<()> {
    sentry::configure_scope(|scope| {
        scope.set_tag("operation", "migrate");
    });

    info!("Running database migrations");
    db::run_migrations(pool)?;
    info!("Migrations complete");
    Ok(())
}
