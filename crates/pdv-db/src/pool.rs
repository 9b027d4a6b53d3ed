//! # Ledger Store Handle
//!
//! Opens the SQLite file behind the ledger and hands out transactions and
//! read connections to the engine.
//!
//! ## Opening Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  DbConfig::new(path) / DbConfig::in_memory()                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await                                           │
//! │       ├── pool: WAL journal, foreign_keys=ON, busy timeout             │
//! │       ├── migrations/sqlite/*.sql (embedded)                           │
//! │       └── backfill products.tracks_stock where NULL                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌──────────────── SqlitePool ─────────────────┐                       │
//! │  │  BEGIN IMMEDIATE ─┐                         │                       │
//! │  │  BEGIN IMMEDIATE ─┼─► one writer at a time  │                       │
//! │  │  plain reads     ─┘   never block (WAL)     │                       │
//! │  └──────────────────────────────────────────────┘                       │
//! │       │                                                                 │
//! │       ├── db.begin()   ──► write Transaction (every engine mutation)   │
//! │       └── db.acquire() ──► PoolConnection (read models, listings)      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrent Writers
//! Engine transactions read (idempotency key, product stock) before they
//! write. A deferred `BEGIN` would take the write lock only at the first
//! write, and SQLite refuses that upgrade with `SQLITE_BUSY` at once when
//! another writer holds the lock, without consulting the busy timeout.
//! `begin` therefore issues `BEGIN IMMEDIATE`: the write lock is taken up
//! front, a second writer waits up to `busy_timeout` for it, and the reads
//! inside the transaction see every commit made before it.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::product::ProductRepository;

// =============================================================================
// Configuration
// =============================================================================

/// Where the ledger lives and how the pool behaves.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/pdv/ledger.db")
///     .max_connections(8)
///     .busy_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, created on first open. `:memory:` for a throwaway store.
    pub database_path: PathBuf,

    /// Pool ceiling (default 5).
    pub max_connections: u32,

    /// Connections kept warm (default 1).
    pub min_connections: u32,

    /// How long `begin`/`acquire` wait for a free connection before
    /// `PoolExhausted` (default 30s).
    pub connect_timeout: Duration,

    /// How long a writer waits on a locked file (default 5s).
    pub busy_timeout: Duration,

    /// Idle connections are closed after this. `None` for in-memory
    /// stores, whose data dies with the last connection.
    pub idle_timeout: Option<Duration>,

    /// Apply embedded migrations and the legacy backfill on open.
    pub run_migrations: bool,
}

impl DbConfig {
    /// Ledger stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            idle_timeout: Some(Duration::from_secs(600)),
            run_migrations: true,
        }
    }

    /// Private in-memory ledger on a single connection. Two handles built
    /// from this never see each other's rows.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None,
            ..DbConfig::new(":memory:")
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Skips migrations and the backfill, for stores managed elsewhere.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let url = format!("sqlite://{}?mode=rwc", self.database_path.display());

        Ok(SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // off unless asked for, and the schema relies on them
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the ledger store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the store.
    ///
    /// With `run_migrations` set, pending migrations are applied and
    /// legacy products are classified before the handle is returned.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening ledger store");

        let options = config.connect_options()?;
        debug!(busy_timeout = ?config.busy_timeout, "SQLite options ready");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };

        if config.run_migrations {
            db.run_migrations().await?;
            db.classify_legacy_products().await?;
        }

        info!(max_connections = config.max_connections, "Ledger store ready");
        Ok(db)
    }

    /// Applies pending embedded migrations. Already applied ones are
    /// recorded in `_sqlx_migrations` and skipped.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        debug!("Schema up to date");
        Ok(())
    }

    /// Persists a `tracks_stock` flag on every product that lacks one.
    ///
    /// Legacy catalogs predate the flag; their rows are classified once with
    /// the code/name/category heuristics. Returns the number of rows updated.
    pub async fn classify_legacy_products(&self) -> DbResult<u64> {
        let mut conn = self.acquire().await?;
        let updated = ProductRepository::backfill_tracks_stock(&mut conn).await?;
        if updated > 0 {
            info!(updated, "Classified legacy products");
        }
        Ok(updated)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Starts a write transaction (`BEGIN IMMEDIATE`). Waits up to the
    /// busy timeout while another writer holds the lock. Dropping it
    /// without commit rolls back.
    pub async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(DbError::transaction)
    }

    /// Checks out a pooled connection for reads.
    pub async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        Ok(self.pool.acquire().await?)
    }

    /// Waits for checked-out connections to return, then closes the pool.
    pub async fn close(&self) {
        info!("Closing ledger store");
        self.pool.close().await;
    }

    /// `true` when a trivial query goes through.
    pub async fn health_check(&self) -> bool {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
