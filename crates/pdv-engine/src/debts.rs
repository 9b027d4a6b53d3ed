//! # Debt Lifecycle
//!
//! Store credit ("fiado"): a customer takes goods now and pays later, in
//! one or more payments.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_debt ──► Pending ──payment──► Partial ──payment──► Settled    │
//! │                      │                                        ▲         │
//! │                      └──────── payment covering total ────────┘         │
//! │                                                                         │
//! │   amount_paid only grows. Settled accepts no payments.                 │
//! │                                                                         │
//! │   Each payment also records a revenue sale (no items, total = value)   │
//! │   after the payment commits, so payments show up in sales reports     │
//! │   without counting the goods twice.                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use pdv_core::debt::{apply_payment, payment_sale_note, DebtTotals};
use pdv_core::validation::{parse_optional_uuid, parse_uuid, validate_new_debt, validate_new_payment, DebtIds};
use pdv_core::{Debt, DebtFilter, DebtItem, DebtPayment, DebtStatus, NewDebt, NewPayment, Sale};
use pdv_db::{DbError, DbResult, DebtRepository, SaleRepository};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::idempotency::{self, Applied};
use crate::inventory;
use crate::side_effects::SideEffect;
use crate::views::{DebtDetail, DebtView, Listing, PaymentReceipt};
use crate::Ledger;

/// Debt operations on a [`Ledger`].
pub struct DebtService<'a> {
    ledger: &'a Ledger,
}

impl<'a> DebtService<'a> {
    pub(crate) fn new(ledger: &'a Ledger) -> Self {
        DebtService { ledger }
    }

    /// Records a debt, or returns the stored one if its local id is known.
    ///
    /// Debts do not move stock.
    pub async fn create_debt(&self, request: NewDebt) -> LedgerResult<Applied<DebtView>> {
        let ids = validate_new_debt(&request)?;
        let mut tx = self.ledger.db.begin().await?;

        let applied = insert_debt(&mut tx, &request, &ids).await?;
        let view = DebtView::load(&mut tx, &applied.get().id).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        if !applied.is_replay() {
            info!(
                debt_id = %view.debt.id,
                local_id = ?view.debt.local_id,
                total = view.debt.total,
                "Debt recorded"
            );
        }
        Ok(applied.map(|_| view))
    }

    /// Applies a payment to a debt.
    ///
    /// ## Errors
    /// - `Validation` - non-positive value, blank method, settled debt,
    ///   or a value above the remaining balance
    /// - `NotFound` - unknown debt
    /// - `Conflict` - the debt changed between the balance check and the
    ///   write
    pub async fn register_payment(&self, debt_id: &str, payment: NewPayment) -> LedgerResult<PaymentReceipt> {
        let debt_id = parse_uuid("debt_id", debt_id)?;
        let user_id = validate_new_payment(&payment)?;

        let mut tx = self.ledger.db.begin().await?;

        let debt = DebtRepository::find(&mut tx, &debt_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Debt", &debt_id))?;
        apply_payment(&debt, payment.value)?;

        let now = Utc::now();
        let record = DebtPayment {
            id: Uuid::new_v4().to_string(),
            debt_id: debt.id.clone(),
            value: payment.value,
            payment_method: payment.payment_method.trim().to_string(),
            user_id,
            created_at: now,
        };
        DebtRepository::insert_payment(&mut tx, &record).await?;
        let updated = DebtRepository::add_payment_amount(&mut tx, &debt.id, record.value, now).await?;

        let view = DebtView::load(&mut tx, &debt.id).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            debt_id = %debt.id,
            value = record.value,
            amount_paid = updated.amount_paid,
            status = %updated.status,
            "Debt payment registered"
        );

        let revenue_sale_id = match self.record_payment_sale(&debt, &record).await {
            Ok(id) => Some(id),
            Err(e) => {
                self.ledger
                    .side_effects
                    .record(SideEffect::PaymentSale, &debt.id, e.to_string());
                None
            }
        };

        Ok(PaymentReceipt {
            debt: view,
            payment: record,
            revenue_sale_id,
        })
    }

    /// Debts matching a filter, newest first.
    pub async fn list_debts(&self, filter: DebtFilter) -> LedgerResult<Listing<DebtView>> {
        let filter = DebtFilter {
            customer_id: parse_optional_uuid("customer_id", filter.customer_id.as_deref())?,
            ..filter
        };

        let mut conn = self.ledger.db.acquire().await?;
        let (items, skipped) = DebtRepository::list(&mut conn, &filter).await?;
        Ok(Listing::new(items, skipped).map(DebtView::from))
    }

    /// Every debt that is not settled, newest first, optionally for one
    /// customer.
    pub async fn list_open_debts(&self, customer_id: Option<&str>) -> LedgerResult<Listing<DebtView>> {
        let customer_id = parse_optional_uuid("customer_id", customer_id)?;

        let mut conn = self.ledger.db.acquire().await?;
        let (items, skipped) = DebtRepository::list_open(&mut conn, customer_id.as_deref()).await?;
        Ok(Listing::new(items, skipped).map(DebtView::from))
    }

    /// One debt with its lines and payments.
    pub async fn get_debt(&self, id: &str) -> LedgerResult<DebtDetail> {
        let id = parse_uuid("id", id)?;
        let mut conn = self.ledger.db.acquire().await?;

        let debt = DebtView::load(&mut conn, &id).await?;
        let items = DebtRepository::items(&mut conn, &id).await?;
        let payments = DebtRepository::payments(&mut conn, &id).await?;

        Ok(DebtDetail {
            debt,
            items,
            payments,
        })
    }

    /// Writes the revenue sale for a committed payment. Not broadcast:
    /// terminals track debts, not this bookkeeping sale.
    async fn record_payment_sale(&self, debt: &Debt, payment: &DebtPayment) -> DbResult<String> {
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            user_id: payment.user_id.clone().or_else(|| debt.user_id.clone()),
            customer_id: debt.customer_id.clone(),
            total: payment.value,
            discount: 0.0,
            payment_method: payment.payment_method.clone(),
            notes: Some(payment_sale_note(debt)),
            tax_applied: false,
            cancelled: false,
            created_at: payment.created_at,
            updated_at: payment.created_at,
        };

        let mut tx = self.ledger.db.begin().await?;
        SaleRepository::insert(&mut tx, &sale).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        info!(sale_id = %sale.id, debt_id = %debt.id, total = sale.total, "Payment revenue sale recorded");
        Ok(sale.id)
    }
}

/// Inserts a debt and its lines on `conn`, or returns the stored debt for
/// the same local id.
///
/// Shared by `create_debt` and batch sync, which runs it inside a savepoint.
pub(crate) async fn insert_debt(
    conn: &mut SqliteConnection,
    request: &NewDebt,
    ids: &DebtIds,
) -> LedgerResult<Applied<Debt>> {
    if let Some(existing) = idempotency::stored_debt(conn, request.local_id).await? {
        return Ok(Applied::Replayed(existing));
    }

    inventory::load_products(conn, &ids.product_ids).await?;

    let totals = DebtTotals::compute(&request.items, request.discount_applied, request.discount_percent);
    let now = Utc::now();
    let debt = Debt {
        id: Uuid::new_v4().to_string(),
        local_id: request.local_id,
        customer_id: ids.customer_id.clone(),
        user_id: ids.user_id.clone(),
        original_value: totals.original_value,
        discount_applied: totals.discount_applied,
        discount_percent: totals.discount_percent,
        total: totals.total,
        amount_paid: 0.0,
        status: DebtStatus::Pending,
        notes: request.notes.clone(),
        created_at: now,
        updated_at: now,
    };
    DebtRepository::insert(conn, &debt).await?;

    for (item, product_id) in request.items.iter().zip(&ids.product_ids) {
        let line = DebtItem {
            id: Uuid::new_v4().to_string(),
            debt_id: debt.id.clone(),
            product_id: product_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        };
        DebtRepository::insert_item(conn, &line).await?;
    }

    Ok(Applied::Created(debt))
}

// =============================================================================
// Unit Tests
// =============================================================================
