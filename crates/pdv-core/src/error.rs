//! # Error Types
//!
//! Domain-specific error types for pdv-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CoreError (ledger rule violated)                                      │
//! │  ├── ProductNotFound        line references an unknown product         │
//! │  ├── InsufficientStock      delta exceeds stock on hand                │
//! │  ├── DebtAlreadySettled     payment against a settled debt             │
//! │  ├── PaymentExceedsBalance  payment above remaining balance            │
//! │  ├── SaleNotCancelled       delete requested on an active sale         │
//! │  └── Validation ──────────► ValidationError (bad input shape)          │
//! │                             ├── Required                               │
//! │                             ├── TooLong                                │
//! │                             ├── MustBePositive                         │
//! │                             ├── MustNotBeNegative                      │
//! │                             └── InvalidFormat                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Every variant is raised before the engine writes anything, so the
/// caller can retry with a corrected request.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A sale or debt line references a product the catalog does not know.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Insufficient stock to complete a sale.
    ///
    /// ## When This Occurs
    /// - A stock-tracked line asks for more units (or kg) than on hand
    /// - Two lines of the same sale together exceed the stock
    ///
    /// ```text
    /// Sale line (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: f64,
        requested: f64,
    },

    /// The debt is already settled and accepts no further payments.
    #[error("Debt {0} is already settled")]
    DebtAlreadySettled(String),

    /// The payment is larger than what is still owed.
    #[error("Payment of {requested} exceeds remaining balance {remaining} on debt {debt_id}")]
    PaymentExceedsBalance {
        debt_id: String,
        remaining: f64,
        requested: f64,
    },

    /// Only cancelled sales can be deleted.
    #[error("Sale {0} is not cancelled; only cancelled sales can be deleted")]
    SaleNotCancelled(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised while checking the shape of a request, before any lookup.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, NaN amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
