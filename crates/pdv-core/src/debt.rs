//! # Debt Rules
//!
//! Totals for a new debt and the status machine driven by payments.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create ──► Pending (paid = 0)                                          │
//! │                │                                                        │
//! │                │ pay(v)  paid += v                                      │
//! │                ▼                                                        │
//! │       paid >= total - ε ? ──yes──► Settled  (terminal)                  │
//! │                │                                                        │
//! │                no                                                       │
//! │                ▼                                                        │
//! │             Partial ──pay(v)──► (same check)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult};
use crate::requests::NewDebtItem;
use crate::types::{Debt, DebtStatus};
use crate::SETTLEMENT_EPSILON;

// =============================================================================
// Totals
// =============================================================================

/// Computed amounts of a new debt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebtTotals {
    pub original_value: f64,
    pub discount_applied: f64,
    pub discount_percent: f64,
    pub total: f64,
}

impl DebtTotals {
    /// Computes totals from the request lines and discount.
    ///
    /// The percentage wins over the explicit amount when positive. The
    /// total never goes below zero.
    ///
    /// ## Example
    /// ```rust
    /// use pdv_core::debt::DebtTotals;
    /// use pdv_core::NewDebtItem;
    ///
    /// let items = vec![NewDebtItem::new("p", 2.0, 100.0)];
    /// let totals = DebtTotals::compute(&items, 30.0, 10.0);
    /// assert_eq!(totals.discount_applied, 20.0);
    /// assert_eq!(totals.total, 180.0);
    /// ```
    pub fn compute(items: &[NewDebtItem], discount_applied: f64, discount_percent: f64) -> Self {
        let original_value: f64 = items.iter().map(|item| item.subtotal).sum();

        let discount = if discount_percent > 0.0 {
            original_value * discount_percent / 100.0
        } else {
            discount_applied
        };

        DebtTotals {
            original_value,
            discount_applied: discount,
            discount_percent,
            total: (original_value - discount).max(0.0),
        }
    }
}

// =============================================================================
// Payments
// =============================================================================

/// Status implied by a paid amount.
pub fn status_for(amount_paid: f64, total: f64) -> DebtStatus {
    if amount_paid >= total - SETTLEMENT_EPSILON {
        DebtStatus::Settled
    } else if amount_paid > 0.0 {
        DebtStatus::Partial
    } else {
        DebtStatus::Pending
    }
}

/// Debt state after one payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentOutcome {
    pub amount_paid: f64,
    pub status: DebtStatus,
}

/// Applies a payment to a debt without mutating it.
///
/// ## Errors
/// - [`CoreError::DebtAlreadySettled`] when the debt is settled
/// - [`CoreError::PaymentExceedsBalance`] when `value` is more than the
///   remaining balance plus the settlement tolerance
///
/// The payment value itself must already be validated as positive.
pub fn apply_payment(debt: &Debt, value: f64) -> CoreResult<PaymentOutcome> {
    if debt.status == DebtStatus::Settled {
        return Err(CoreError::DebtAlreadySettled(debt.id.clone()));
    }

    let remaining = debt.remaining();
    if value > remaining + SETTLEMENT_EPSILON {
        return Err(CoreError::PaymentExceedsBalance {
            debt_id: debt.id.clone(),
            remaining,
            requested: value,
        });
    }

    let amount_paid = debt.amount_paid + value;
    let status = match status_for(amount_paid, debt.total) {
        DebtStatus::Settled => DebtStatus::Settled,
        // a positive payment always leaves Pending
        _ => DebtStatus::Partial,
    };

    Ok(PaymentOutcome {
        amount_paid,
        status,
    })
}

/// Observation written on the sale synthesized for a debt payment.
pub fn payment_sale_note(debt: &Debt) -> String {
    match debt.local_id {
        Some(local_id) => format!("Pagamento de dívida #{}", local_id),
        None => format!("Pagamento de dívida #{}", debt.id),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn debt(total: f64, amount_paid: f64, status: DebtStatus) -> Debt {
        let now = Utc::now();
        Debt {
            id: "d-1".to_string(),
            local_id: None,
            customer_id: None,
            user_id: None,
            original_value: total,
            discount_applied: 0.0,
            discount_percent: 0.0,
            total,
            amount_paid,
            status,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_totals_without_discount() {
        let items = vec![
            NewDebtItem::new("a", 1.0, 120.0),
            NewDebtItem::new("b", 2.0, 40.0),
        ];
        let totals = DebtTotals::compute(&items, 0.0, 0.0);
        assert_eq!(totals.original_value, 200.0);
        assert_eq!(totals.total, 200.0);
    }

    #[test]
    fn test_explicit_discount_used_without_percent() {
        let items = vec![NewDebtItem::new("a", 1.0, 50.0)];
        let totals = DebtTotals::compute(&items, 5.0, 0.0);
        assert_eq!(totals.discount_applied, 5.0);
        assert_eq!(totals.total, 45.0);
    }

    #[test]
    fn test_total_never_negative() {
        let items = vec![NewDebtItem::new("a", 1.0, 10.0)];
        let totals = DebtTotals::compute(&items, 25.0, 0.0);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn test_partial_then_settled() {
        let d = debt(200.0, 0.0, DebtStatus::Pending);
        let first = apply_payment(&d, 150.0).unwrap();
        assert_eq!(first.status, DebtStatus::Partial);
        assert_eq!(first.amount_paid, 150.0);

        let d = debt(200.0, first.amount_paid, first.status);
        let second = apply_payment(&d, 50.0).unwrap();
        assert_eq!(second.status, DebtStatus::Settled);
        assert_eq!(second.amount_paid, 200.0);
    }

    #[test]
    fn test_settles_within_tolerance() {
        let d = debt(100.0, 0.0, DebtStatus::Pending);
        let outcome = apply_payment(&d, 99.995).unwrap();
        assert_eq!(outcome.status, DebtStatus::Settled);
    }

    #[test]
    fn test_settled_debt_rejects_payment() {
        let d = debt(100.0, 100.0, DebtStatus::Settled);
        assert!(matches!(
            apply_payment(&d, 1.0),
            Err(CoreError::DebtAlreadySettled(_))
        ));
    }

    #[test]
    fn test_overpayment_rejected() {
        let d = debt(100.0, 60.0, DebtStatus::Partial);
        assert!(matches!(
            apply_payment(&d, 41.0),
            Err(CoreError::PaymentExceedsBalance { .. })
        ));
    }

    #[test]
    fn test_status_for() {
        assert_eq!(status_for(0.0, 10.0), DebtStatus::Pending);
        assert_eq!(status_for(5.0, 10.0), DebtStatus::Partial);
        assert_eq!(status_for(9.995, 10.0), DebtStatus::Settled);
    }

    #[test]
    fn test_payment_sale_note_prefers_local_id() {
        let mut d = debt(10.0, 0.0, DebtStatus::Pending);
        assert_eq!(payment_sale_note(&d), "Pagamento de dívida #d-1");
        d.local_id = Some(7);
        assert_eq!(payment_sale_note(&d), "Pagamento de dívida #7");
    }
}
