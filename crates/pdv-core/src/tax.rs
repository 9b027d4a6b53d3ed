//! # Tax & Pricing
//!
//! VAT split for tax-inclusive prices, and the unit cost frozen on each
//! sale line.
//!
//! ## Tax-Inclusive Pricing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shelf price already contains VAT. The split is a division:            │
//! │                                                                         │
//! │      factor = 1 + rate / 100                                            │
//! │      base   = subtotal / factor                                         │
//! │      tax    = subtotal - base                                           │
//! │                                                                         │
//! │  subtotal 115.00 @ 15%  ──►  base 100.00 + tax 15.00                   │
//! │                                                                         │
//! │  NOT  tax = subtotal × rate  (that would charge VAT on VAT)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::COST_EPSILON;

/// VAT split of one line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    /// Rate recorded on the line, as a percentage. Zero when tax is off.
    pub rate: f64,
    /// Subtotal net of tax.
    pub base: f64,
    /// Tax contained in the subtotal.
    pub amount: f64,
}

impl TaxBreakdown {
    /// A line that carries no tax.
    pub fn untaxed(subtotal: f64) -> Self {
        TaxBreakdown {
            rate: 0.0,
            base: subtotal,
            amount: 0.0,
        }
    }
}

/// Splits a tax-inclusive subtotal into base and tax.
///
/// ## Rules
/// - `apply_tax == false`: no tax, recorded rate 0
/// - `rate <= 0`: no tax, rate kept as given
/// - otherwise: inclusive split (see module docs)
///
/// ## Example
/// ```rust
/// use pdv_core::tax::split_inclusive;
///
/// let line = split_inclusive(115.0, 15.0, true);
/// assert!((line.base - 100.0).abs() < 1e-6);
/// assert!((line.amount - 15.0).abs() < 1e-6);
/// ```
pub fn split_inclusive(subtotal: f64, rate: f64, apply_tax: bool) -> TaxBreakdown {
    if !apply_tax {
        return TaxBreakdown::untaxed(subtotal);
    }

    if rate <= 0.0 {
        return TaxBreakdown {
            rate,
            base: subtotal,
            amount: 0.0,
        };
    }

    let factor = 1.0 + rate / 100.0;
    let base = subtotal / factor;

    TaxBreakdown {
        rate,
        base,
        amount: subtotal - base,
    }
}

/// Picks the unit cost frozen onto a sale line.
///
/// The terminal's cost wins when it is meaningfully positive, so a sale
/// recorded offline keeps the margin it had when it happened even if the
/// catalog cost changed in the meantime.
pub fn resolve_unit_cost(client_cost: Option<f64>, catalog_cost: f64) -> f64 {
    match client_cost {
        Some(cost) if cost > COST_EPSILON => cost,
        _ => catalog_cost,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
