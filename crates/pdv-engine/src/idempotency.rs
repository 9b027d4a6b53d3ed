//! # Idempotency Guard
//!
//! Terminals retry. A request carrying a key that is already stored must
//! return the stored record and change nothing.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    lookup(key) ──── found ────► Replayed(existing)   no writes         │
//! │        │                                                                │
//! │      absent                                                             │
//! │        ▼                                                                │
//! │    validate, write, decrement stock                                    │
//! │        │                                                                │
//! │        ├── UNIQUE violation ──► Conflict (a concurrent writer won)     │
//! │        ▼                                                                │
//! │  COMMIT ──────────────────────► Created(new)                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sale keys are caller-supplied UUIDs. Debt keys are the integer ids
//! offline terminals assign; a debt without one is never deduplicated.

use pdv_core::{Debt, Sale};
use pdv_db::{DebtRepository, SaleRepository};
use serde::Serialize;
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::LedgerResult;

/// Outcome of an idempotent operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum Applied<T> {
    /// The request was applied now.
    Created(T),
    /// The key was already stored; this is the stored record.
    Replayed(T),
}

impl<T> Applied<T> {
    pub fn is_replay(&self) -> bool {
        matches!(self, Applied::Replayed(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Applied::Created(value) | Applied::Replayed(value) => value,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Applied::Created(value) | Applied::Replayed(value) => value,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Applied<U> {
        match self {
            Applied::Created(value) => Applied::Created(f(value)),
            Applied::Replayed(value) => Applied::Replayed(f(value)),
        }
    }
}

/// Stored sale for a caller-supplied key.
pub(crate) async fn stored_sale(conn: &mut SqliteConnection, id: &str) -> LedgerResult<Option<Sale>> {
    let existing = SaleRepository::find(conn, id).await?;
    if existing.is_some() {
        debug!(sale_id = %id, "Sale key already stored, replaying");
    }
    Ok(existing)
}

/// Stored debt for a terminal-assigned local id.
pub(crate) async fn stored_debt(
    conn: &mut SqliteConnection,
    local_id: Option<i64>,
) -> LedgerResult<Option<Debt>> {
    let Some(local_id) = local_id else {
        return Ok(None);
    };

    let existing = DebtRepository::find_by_local_id(conn, local_id).await?;
    if existing.is_some() {
        debug!(local_id, "Debt local id already stored, replaying");
    }
    Ok(existing)
}
