//! # pdv-engine: Sales Ledger Transaction Engine
//!
//! Applies sale, debt and payment requests from PDV terminals to the
//! ledger store, keeping stock, balances and the sales record consistent.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create_sale(NewSale)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate (ids, amounts)                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌────────────────────── one transaction ───────────────────────┐      │
//! │  │ idempotency guard ──► tax & cost per line ──► stock plan     │      │
//! │  │        │                                          │          │      │
//! │  │     replay                            insert sale + items    │      │
//! │  │        │                                          │          │      │
//! │  │        │                             conditional decrement   │      │
//! │  └────────┼──────────────────────────────────────────┼──────────┘      │
//! │           ▼                                          ▼                  │
//! │     Replayed(view)                           COMMIT ─► publish event   │
//! │                                                        │                │
//! │                                                        ▼                │
//! │                                                  Created(view)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`sales`] - Create, cancel, delete, read and list sales
//! - [`debts`] - Debt creation, payments, debt read models
//! - [`batch`] - Batch debt sync from offline terminals
//! - [`idempotency`] - `Applied<T>` and key lookups
//! - [`inventory`] - Stock classification and conditional decrement
//! - [`side_effects`] - Log of best-effort work that failed
//! - [`views`] - Read models returned to callers
//! - [`config`] - Environment configuration
//! - [`error`] - `LedgerError` and `ErrorKind`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdv_engine::{Ledger, LedgerConfig};
//! use pdv_core::{NewSale, NewSaleItem};
//!
//! let ledger = Ledger::open(LedgerConfig::from_env()?).await?;
//!
//! let sale = NewSale::new("Dinheiro", 34.5)
//!     .with_id(sale_id)
//!     .item(NewSaleItem::units(product_id, 3, 11.5));
//! let applied = ledger.sales().create_sale(sale).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod config;
pub mod debts;
pub mod error;
pub mod idempotency;
pub mod inventory;
pub mod sales;
pub mod side_effects;
pub mod views;

#[cfg(test)]
pub(crate) mod test_support;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch::{BatchSync, SyncItemError, SyncReport, SyncStatus};
pub use config::{ConfigError, LedgerConfig};
pub use debts::DebtService;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use idempotency::Applied;
pub use sales::SaleService;
pub use side_effects::{SideEffect, SideEffectFailure, SideEffectLog};
pub use views::{DebtDetail, DebtView, Listing, PaymentReceipt, SaleView};

use std::sync::Arc;

use pdv_db::{Database, DbError};
use pdv_realtime::{Broadcaster, EventHub, HubConfig, HubHandle, RealtimeResult};
use tracing::info;

// =============================================================================
// Ledger
// =============================================================================

/// Entry point to the engine. Cheap to clone; clones share the store,
/// the event stream and the side-effect log.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) db: Database,
    pub(crate) events: Broadcaster,
    pub(crate) side_effects: Arc<SideEffectLog>,
    hub: HubConfig,
}

impl Ledger {
    /// Opens the store described by `config` and wires up the event
    /// stream and side-effect log.
    pub async fn open(config: LedgerConfig) -> LedgerResult<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DbError::ConnectionFailed(format!(
                        "cannot create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database_path.display(), "Ledger opened");

        let mut ledger = Ledger::new(
            db,
            Broadcaster::new(config.event_capacity),
            config.side_effect_log_capacity,
        );
        ledger.hub = config.hub;
        Ok(ledger)
    }

    /// Builds a ledger over an already open store.
    pub fn new(db: Database, events: Broadcaster, side_effect_capacity: usize) -> Self {
        Ledger {
            db,
            events,
            side_effects: Arc::new(SideEffectLog::new(side_effect_capacity)),
            hub: HubConfig::default(),
        }
    }

    /// Sale operations.
    pub fn sales(&self) -> SaleService<'_> {
        SaleService::new(self)
    }

    /// Debt and payment operations.
    pub fn debts(&self) -> DebtService<'_> {
        DebtService::new(self)
    }

    /// Batch sync from offline terminals.
    pub fn sync(&self) -> BatchSync<'_> {
        BatchSync::new(self)
    }

    /// The event stream. Call `subscribe()` on it to receive events.
    pub fn events(&self) -> &Broadcaster {
        &self.events
    }

    /// Best-effort work that failed after its operation committed.
    pub fn side_effects(&self) -> &SideEffectLog {
        &self.side_effects
    }

    /// The underlying store.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Starts the WebSocket hub relaying this ledger's events.
    pub async fn start_hub(&self) -> RealtimeResult<HubHandle> {
        EventHub::new(self.hub.clone(), self.events.clone()).start().await
    }

    /// Closes the store.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
