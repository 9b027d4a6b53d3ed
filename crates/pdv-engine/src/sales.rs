//! # Sale Service
//!
//! Records sales, cancels them, and removes cancelled ones.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create_sale ──► ACTIVE ──cancel_sale──► CANCELLED ──delete_sale──► ∅  │
//! │                     │                                                   │
//! │                     └──delete_sale──► rejected (Validation)             │
//! │                                                                         │
//! │   Stock leaves on create. Cancelling or deleting does not return it.    │
//! │   Each transition publishes an event after it commits:                 │
//! │   sale.created · sale.cancelled · sale.deleted                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use pdv_core::tax::{resolve_unit_cost, split_inclusive};
use pdv_core::validation::{parse_optional_uuid, parse_uuid, validate_new_sale};
use pdv_core::{CoreError, NewSale, Sale, SaleFilter, SaleItem};
use pdv_db::{DbError, SaleRepository, SaleSummary};
use pdv_realtime::LedgerEvent;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LedgerError, LedgerResult};
use crate::idempotency::{self, Applied};
use crate::inventory;
use crate::views::{Listing, SaleView};
use crate::Ledger;

/// Sale operations on a [`Ledger`].
pub struct SaleService<'a> {
    ledger: &'a Ledger,
}

impl<'a> SaleService<'a> {
    pub(crate) fn new(ledger: &'a Ledger) -> Self {
        SaleService { ledger }
    }

    /// Records a sale, or returns the stored one if its id is known.
    ///
    /// ## What This Does
    /// 1. Validates identifiers and amounts
    /// 2. Opens a transaction and looks the sale id up (replay ends here)
    /// 3. Loads every line's product and plans the stock depletion
    /// 4. Writes the sale and its lines with tax split and frozen cost
    /// 5. Decrements stock conditionally
    /// 6. Commits, then publishes `sale.created`
    ///
    /// ## Errors
    /// - `Validation` - malformed id, negative amount, blank payment method
    /// - `UnknownProduct` - a line references a missing product
    /// - `InsufficientStock` - a tracked product cannot cover its lines
    /// - `Conflict` - a concurrent request stored the same id first
    pub async fn create_sale(&self, request: NewSale) -> LedgerResult<Applied<SaleView>> {
        let ids = validate_new_sale(&request)?;
        let sale_id = ids
            .sale_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut tx = self.ledger.db.begin().await?;

        if let Some(existing) = idempotency::stored_sale(&mut tx, &sale_id).await? {
            let view = SaleView::load(&mut tx, existing).await?;
            tx.commit().await.map_err(DbError::transaction)?;
            return Ok(Applied::Replayed(view));
        }

        let products = inventory::load_products(&mut tx, &ids.product_ids).await?;
        let plan = inventory::plan_depletion(&products, &request.items)?;

        let now = Utc::now();
        let sale = Sale {
            id: sale_id,
            user_id: ids.user_id,
            customer_id: ids.customer_id,
            total: request.total,
            discount: request.discount,
            payment_method: request.payment_method.trim().to_string(),
            notes: request.notes.clone(),
            tax_applied: request.apply_tax,
            cancelled: false,
            created_at: request.created_at.unwrap_or(now),
            updated_at: now,
        };
        SaleRepository::insert(&mut tx, &sale).await?;

        for (item, product) in request.items.iter().zip(&products) {
            let tax = split_inclusive(item.subtotal, product.tax_rate, request.apply_tax);
            let line = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id: product.id.clone(),
                quantity: item.quantity,
                weight_kg: item.weight_kg,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
                unit_cost: resolve_unit_cost(item.unit_cost, product.unit_cost),
                tax_rate: tax.rate,
                tax_base: tax.base,
                tax_amount: tax.amount,
            };
            SaleRepository::insert_item(&mut tx, &line).await?;
        }

        inventory::apply(&mut tx, &plan).await?;

        let view = SaleView::load(&mut tx, sale).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        info!(
            sale_id = %view.sale.id,
            total = view.sale.total,
            items = view.items.len(),
            "Sale recorded"
        );

        self.ledger.events.publish(LedgerEvent::sale_created(
            view.sale.id.clone(),
            view.sale.user_id.clone(),
            view.sale.total,
            view.sale.discount,
            view.sale.payment_method.clone(),
            view.sale.created_at,
        ));

        Ok(Applied::Created(view))
    }

    /// Marks a sale cancelled. Cancelling a cancelled sale changes nothing
    /// and publishes nothing.
    pub async fn cancel_sale(&self, id: &str) -> LedgerResult<SaleView> {
        let id = parse_uuid("id", id)?;
        let mut tx = self.ledger.db.begin().await?;

        let sale = SaleRepository::find(&mut tx, &id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", &id))?;

        if sale.cancelled {
            debug!(sale_id = %id, "Sale already cancelled");
            let view = SaleView::load(&mut tx, sale).await?;
            tx.commit().await.map_err(DbError::transaction)?;
            return Ok(view);
        }

        let now = Utc::now();
        SaleRepository::set_cancelled(&mut tx, &id, now).await?;
        let sale = Sale {
            cancelled: true,
            updated_at: now,
            ..sale
        };
        let view = SaleView::load(&mut tx, sale).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        info!(sale_id = %id, "Sale cancelled");
        self.ledger.events.publish(LedgerEvent::sale_cancelled(id));

        Ok(view)
    }

    /// Removes a cancelled sale and its lines.
    pub async fn delete_sale(&self, id: &str) -> LedgerResult<()> {
        let id = parse_uuid("id", id)?;
        let mut tx = self.ledger.db.begin().await?;

        let sale = SaleRepository::find(&mut tx, &id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", &id))?;
        if !sale.cancelled {
            return Err(CoreError::SaleNotCancelled(id).into());
        }

        let items = SaleRepository::delete_with_items(&mut tx, &id).await?;
        tx.commit().await.map_err(DbError::transaction)?;

        info!(sale_id = %id, items, "Sale deleted");
        self.ledger.events.publish(LedgerEvent::sale_deleted(id));

        Ok(())
    }

    /// Reads one sale with its lines and party names.
    pub async fn get_sale(&self, id: &str) -> LedgerResult<SaleView> {
        let id = parse_uuid("id", id)?;
        let mut conn = self.ledger.db.acquire().await?;

        let sale = SaleRepository::find(&mut conn, &id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Sale", &id))?;
        SaleView::load(&mut conn, sale).await
    }

    /// Lists sales newest first. Rows that cannot be decoded are left out
    /// and counted in `skipped`.
    pub async fn list_sales(&self, filter: SaleFilter) -> LedgerResult<Listing<SaleSummary>> {
        let filter = SaleFilter {
            user_id: parse_optional_uuid("user_id", filter.user_id.as_deref())?,
            ..filter
        };

        let mut conn = self.ledger.db.acquire().await?;
        let (items, skipped) = SaleRepository::list(&mut conn, &filter).await?;
        Ok(Listing::new(items, skipped))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
