//! # Schema Migrations
//!
//! The ledger schema ships inside the binary. `Database::new` brings any
//! store up to date before the engine touches it.
//!
//! ```text
//! migrations/sqlite/
//!   001_ledger_schema.sql   products · users · customers · sales · sale_items
//!                           debts · debt_items · debt_payments
//! ```
//!
//! Applied files are recorded in `_sqlx_migrations` with a checksum. Never
//! edit a released file; add `NNN_description.sql` with the next number.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded in the store.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await.unwrap_or((MIGRATOR.migrations.len(), 0));
    if applied < total {
        info!(pending = total - applied, "Applying ledger migrations");
    }

    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(embedded, applied)` migration counts.
///
/// Fails on a store that has never been migrated, since the bookkeeping
/// table does not exist yet.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await?;

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
