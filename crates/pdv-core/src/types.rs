//! # Ledger Records
//!
//! The persisted shape of every entity the transaction engine reads or
//! writes.
//!
//! ## Entity Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Product ◄──────────── SaleItem ───────────► Sale                     │
//! │      ▲                  (frozen cost,          (cancelled flag,         │
//! │      │                   VAT split)             tax applied flag)       │
//! │      │                                            ▲                     │
//! │      │                                            │ synthetic sale      │
//! │      │                                            │ per payment         │
//! │      └──────────────── DebtItem ───────────► Debt ◄──── DebtPayment     │
//! │                                         (Pending → Partial → Settled)   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Identifiers are canonical hyphenated UUID strings. Amounts, stock and
//! weights are `f64`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Product
// =============================================================================

/// A sellable item or service, as seen by the ledger.
///
/// Catalog management owns every field except `stock`, which only the
/// inventory reconciler mutates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    /// Optional catalog code, unique when present.
    pub code: Option<String>,
    pub name: String,
    /// Tax-inclusive unit price.
    pub unit_price: f64,
    /// Current unit cost. Copied onto sale items at sale time.
    pub unit_cost: f64,
    /// VAT rate as a percentage (15.0 = 15%).
    pub tax_rate: f64,
    /// Units on hand, or kg for products sold by weight.
    pub stock: f64,
    /// Whether sales deplete stock.
    ///
    /// `None` only for legacy records that predate the flag and have not
    /// been backfilled yet.
    pub tracks_stock: Option<bool>,
    pub sold_by_weight: bool,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// One completed or cancelled transaction.
///
/// `total` is whatever the terminal charged; the ledger never recomputes
/// it from the items. A sale synthesized from a debt payment has no items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub user_id: Option<String>,
    pub customer_id: Option<String>,
    pub total: f64,
    pub discount: f64,
    pub payment_method: String,
    pub notes: Option<String>,
    pub tax_applied: bool,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a sale. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub weight_kg: Option<f64>,
    pub unit_price: f64,
    /// Tax-inclusive line total.
    pub subtotal: f64,
    /// Unit cost frozen at sale time.
    pub unit_cost: f64,
    pub tax_rate: f64,
    pub tax_base: f64,
    pub tax_amount: f64,
}

// =============================================================================
// Debt
// =============================================================================

/// Lifecycle of a debt account.
///
/// ## State Machine
/// ```text
/// Pending ──payment──► Partial ──payment──► Settled
///    │                                        ▲
///    └─────────────── full payment ───────────┘
/// ```
/// Transitions only move right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "PascalCase"))]
pub enum DebtStatus {
    /// Nothing paid yet.
    #[serde(alias = "Pendente")]
    Pending,
    /// Some payments applied, balance remains.
    #[serde(alias = "Parcial")]
    Partial,
    /// Paid in full (within the settlement tolerance).
    #[serde(alias = "Quitado")]
    Settled,
}

impl DebtStatus {
    /// Returns the label stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            DebtStatus::Pending => "Pending",
            DebtStatus::Partial => "Partial",
            DebtStatus::Settled => "Settled",
        }
    }
}

impl std::fmt::Display for DebtStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A customer credit balance ("fiado").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Debt {
    pub id: String,
    /// Id assigned by an offline terminal; the idempotency key for sync.
    pub local_id: Option<i64>,
    pub customer_id: Option<String>,
    pub user_id: Option<String>,
    /// Sum of item subtotals before discount.
    pub original_value: f64,
    pub discount_applied: f64,
    pub discount_percent: f64,
    /// Amount due after discount.
    pub total: f64,
    pub amount_paid: f64,
    pub status: DebtStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    /// Amount still owed, never negative.
    pub fn remaining(&self) -> f64 {
        (self.total - self.amount_paid).max(0.0)
    }
}

/// One line of a debt. Quantity is fractional for goods sold by weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DebtItem {
    pub id: String,
    pub debt_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// A payment applied to a debt. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DebtPayment {
    pub id: String,
    pub debt_id: String,
    pub value: f64,
    pub payment_method: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
