//! # Repository Module
//!
//! Database repository implementations for the ledger store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  pdv-engine                                                             │
//! │     │                                                                   │
//! │     │  let mut tx = db.begin().await?;                                  │
//! │     │  SaleRepository::find(&mut tx, id)         ◄── inside a tx        │
//! │     │                                                                   │
//! │     │  let mut conn = db.acquire().await?;                              │
//! │     │  SaleRepository::list(&mut conn, &filter)  ◄── plain read         │
//! │     ▼                                                                   │
//! │  Repositories are stateless: every method takes the connection it       │
//! │  runs on, so the engine decides the transaction boundary.               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product lookup, conditional stock decrement
//! - [`party::PartyRepository`] - User/customer lookup
//! - [`sale::SaleRepository`] - Sales, sale items, listings
//! - [`debt::DebtRepository`] - Debts, debt items, payments

pub mod debt;
pub mod party;
pub mod product;
pub mod sale;

use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use tracing::warn;

/// Decodes listing rows, dropping the ones that fail to decode.
///
/// Legacy rows with NULLs in required columns should not take a whole
/// listing down. Returns the decoded rows and the number skipped.
pub(crate) fn decode_rows<T>(rows: Vec<SqliteRow>, entity: &'static str) -> (Vec<T>, usize)
where
    T: for<'r> FromRow<'r, SqliteRow>,
{
    let mut items = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in rows {
        match T::from_row(&row) {
            Ok(item) => items.push(item),
            Err(e) => {
                skipped += 1;
                warn!(entity, error = %e, "Skipping row that failed to decode");
            }
        }
    }

    (items, skipped)
}
