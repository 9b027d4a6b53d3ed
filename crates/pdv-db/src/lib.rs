//! # pdv-db: Ledger Store
//!
//! SQLite persistence for the PDV sales ledger, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         PDV Ledger Data Flow                            │
//! │                                                                         │
//! │  pdv-engine (create_sale, register_payment, sync_debts, ...)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     pdv-db (THIS CRATE)                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ PartyRepo     │    │ 001_ledger_  │  │   │
//! │  │   │ begin/acquire │    │ SaleRepo      │    │   schema.sql │  │   │
//! │  │   │               │    │ DebtRepo      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 SQLite Database (WAL mode)                      │   │
//! │  │                 ./data/pdv-ledger.db                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Product, party, sale and debt repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdv_db::{Database, DbConfig, SaleRepository};
//!
//! let db = Database::new(DbConfig::new("./data/pdv-ledger.db")).await?;
//!
//! let mut tx = db.begin().await?;
//! let sale = SaleRepository::find(&mut tx, "7d3c...").await?;
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::debt::{DebtItemLine, DebtRepository, DebtSummary};
pub use repository::party::{PartyKind, PartyRepository};
pub use repository::product::ProductRepository;
pub use repository::sale::{SaleRepository, SaleSummary};
