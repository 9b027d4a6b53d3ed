//! # Ledger Error Types
//!
//! The one error type callers of the engine see, and the coarse
//! [`ErrorKind`] an outer transport maps to a status code.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │                                  ├──► LedgerError ──► kind()           │
//! │  sqlx::Error ──────► DbError ────┘                                     │
//! │                                                                         │
//! │  DbError::UniqueViolation      → Conflict                              │
//! │  DbError::StaleWrite           → Conflict                              │
//! │  DbError::ForeignKeyViolation  → Referential                           │
//! │  DbError::CheckViolation       → Validation                            │
//! │  DbError::NotFound             → NotFound                              │
//! │  anything else                 → TransientStore (tx rolled back)       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pdv_core::{CoreError, ValidationError};
use pdv_db::DbError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for engine operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or rule-breaking request. Retrying unchanged fails again.
    Validation,
    /// The request references a record that does not exist.
    Referential,
    /// Not enough stock for a tracked line.
    InsufficientStock,
    /// Another writer got to the same record first.
    Conflict,
    /// Unknown sale or debt id.
    NotFound,
    /// The store failed; nothing was written. Safe to retry.
    TransientStore,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Referential => "REFERENTIAL",
            ErrorKind::InsufficientStock => "INSUFFICIENT_STOCK",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::TransientStore => "TRANSIENT_STORE",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed request.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// A line references a product the catalog does not know.
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    /// A tracked line asks for more than is on hand.
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: f64,
        requested: f64,
    },

    /// Payment against a settled debt.
    #[error("Debt {0} is already settled")]
    DebtSettled(String),

    /// Payment larger than the remaining balance.
    #[error("Payment of {requested} exceeds remaining balance {remaining} on debt {debt_id}")]
    PaymentExceedsBalance {
        debt_id: String,
        remaining: f64,
        requested: f64,
    },

    /// Delete requested on a sale that is still active.
    #[error("Sale {0} is not cancelled")]
    SaleNotCancelled(String),

    /// Unknown sale or debt.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The store refused a write that raced with another one.
    ///
    /// ## When This Occurs
    /// - A duplicate key reached the store (sale id, debt local id)
    /// - A debt changed between a payment's validation and its write
    ///
    /// Re-sending a creation returns the stored record as a replay.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store rejected a reference (foreign key).
    #[error("Referential integrity violation: {0}")]
    Referential(String),

    /// The store rejected a value (CHECK constraint).
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Connectivity or transaction failure.
    #[error("Store error: {0}")]
    Store(#[source] DbError),
}

impl LedgerError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Classifies the error for the outer transport.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_)
            | LedgerError::DebtSettled(_)
            | LedgerError::PaymentExceedsBalance { .. }
            | LedgerError::SaleNotCancelled(_)
            | LedgerError::Constraint(_) => ErrorKind::Validation,
            LedgerError::UnknownProduct(_) | LedgerError::Referential(_) => ErrorKind::Referential,
            LedgerError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            LedgerError::Conflict(_) => ErrorKind::Conflict,
            LedgerError::NotFound { .. } => ErrorKind::NotFound,
            LedgerError::Store(_) => ErrorKind::TransientStore,
        }
    }
}

impl From<CoreError> for LedgerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => LedgerError::UnknownProduct(id),
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => LedgerError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            CoreError::DebtAlreadySettled(id) => LedgerError::DebtSettled(id),
            CoreError::PaymentExceedsBalance {
                debt_id,
                remaining,
                requested,
            } => LedgerError::PaymentExceedsBalance {
                debt_id,
                remaining,
                requested,
            },
            CoreError::SaleNotCancelled(id) => LedgerError::SaleNotCancelled(id),
            CoreError::Validation(e) => LedgerError::Validation(e),
        }
    }
}

impl From<DbError> for LedgerError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation { constraint } => {
                LedgerError::Conflict(format!("{} already exists", constraint))
            }
            DbError::StaleWrite { entity, id } => {
                LedgerError::Conflict(format!("{} {} changed concurrently", entity, id))
            }
            DbError::ForeignKeyViolation { message } => LedgerError::Referential(message),
            DbError::CheckViolation { message } => LedgerError::Constraint(message),
            DbError::NotFound { entity, id } => LedgerError::NotFound { entity, id },
            other => LedgerError::Store(other),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
