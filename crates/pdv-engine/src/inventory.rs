//! # Inventory Reconciler
//!
//! Decides which sale lines touch stock and removes that stock inside the
//! sale's transaction.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  lines ──► load products ──► classify ──► plan (cumulative per product)│
//! │                 │               │                 │                     │
//! │           unknown id      service line       plan > stock               │
//! │                 ▼               ▼                 ▼                     │
//! │          UnknownProduct      skipped      InsufficientStock            │
//! │                                                                         │
//! │  after the sale rows are written:                                      │
//! │  apply(plan) ──► UPDATE ... WHERE stock >= delta - ε  (per product)    │
//! │                     │                                                   │
//! │               0 rows updated ──► InsufficientStock (tx rolls back)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use pdv_core::stock::{self, ClassSource, DepletionPlan};
use pdv_core::{NewSaleItem, Product};
use pdv_db::ProductRepository;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Loads the product of every line, in line order.
///
/// Fails with `UnknownProduct` on the first id the catalog does not know.
pub(crate) async fn load_products(
    conn: &mut SqliteConnection,
    product_ids: &[String],
) -> LedgerResult<Vec<Product>> {
    let mut products = Vec::with_capacity(product_ids.len());
    for id in product_ids {
        let product = ProductRepository::find(conn, id)
            .await?
            .ok_or_else(|| LedgerError::UnknownProduct(id.clone()))?;
        products.push(product);
    }
    Ok(products)
}

/// Builds the stock depletion of a sale and checks it against the stock
/// read in this transaction.
///
/// `products[i]` must be the product of `items[i]`.
pub(crate) fn plan_depletion(products: &[Product], items: &[NewSaleItem]) -> LedgerResult<DepletionPlan> {
    let mut plan = DepletionPlan::new();

    for (product, item) in products.iter().zip(items) {
        let class = stock::classify(product);
        if class.source == ClassSource::LegacyDefault {
            warn!(
                product_id = %product.id,
                tracked = class.is_tracked(),
                "Product has no tracks_stock flag, using legacy classification"
            );
        }
        if !class.is_tracked() {
            debug!(product_id = %product.id, "Service line, stock untouched");
            continue;
        }

        let delta = stock::depletion_delta(product, item.quantity, item.weight_kg);
        let requested = plan.add(&product.id, delta);
        if !stock::is_sufficient(product.stock, requested) {
            return Err(LedgerError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock,
                requested,
            });
        }
    }

    Ok(plan)
}

/// Removes the planned stock. Each decrement is conditional, so stock
/// taken by a concurrent writer since the plan was checked is caught here.
pub(crate) async fn apply(conn: &mut SqliteConnection, plan: &DepletionPlan) -> LedgerResult<()> {
    for (product_id, delta) in plan.iter() {
        if !ProductRepository::decrement_stock(conn, product_id, delta).await? {
            let available = ProductRepository::get(conn, product_id).await?.stock;
            return Err(LedgerError::InsufficientStock {
                product_id: product_id.to_string(),
                available,
                requested: delta,
            });
        }
    }
    Ok(())
}
