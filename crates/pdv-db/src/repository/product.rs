//! # Product Repository
//!
//! Product lookups for the engine and the one write it is allowed to make:
//! decrementing stock.
//!
//! ## Conditional Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ❌ Read-then-write (race between check and update)                    │
//! │     SELECT stock ... ; if stock >= 3 { UPDATE ... SET stock = 7 }      │
//! │                                                                         │
//! │  ✅ Check and write in one statement                                   │
//! │     UPDATE products SET stock = MAX(stock - 3, 0)                       │
//! │     WHERE id = ? AND stock >= 3 - ε                                     │
//! │                                                                         │
//! │  rows_affected = 0  ──►  someone else took the stock first             │
//! │  CHECK (stock >= 0) ──►  no other write can go negative either         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use pdv_core::stock::legacy_tracks_stock;
use pdv_core::{Product, STOCK_EPSILON};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

const PRODUCT_COLUMNS: &str = "id, code, name, unit_price, unit_cost, tax_rate, stock, \
     tracks_stock, sold_by_weight, category_id, created_at, updated_at";

/// Repository for product operations.
pub struct ProductRepository;

impl ProductRepository {
    /// Finds a product by id.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(product)
    }

    /// Gets a product by id, failing with `NotFound` when absent.
    pub async fn get(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
        Self::find(conn, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Number of products in the catalog.
    pub async fn count(conn: &mut SqliteConnection) -> DbResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// Inserts a catalog record.
    ///
    /// Catalog management lives outside the ledger; this exists for
    /// seeding and for tests.
    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, unit_price, unit_cost, tax_rate, stock,
                tracks_stock, sold_by_weight, category_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(product.unit_price)
        .bind(product.unit_cost)
        .bind(product.tax_rate)
        .bind(product.stock)
        .bind(product.tracks_stock)
        .bind(product.sold_by_weight)
        .bind(product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Removes `delta` from a product's stock if enough is on hand.
    ///
    /// ## Returns
    /// * `Ok(true)` - stock decremented
    /// * `Ok(false)` - not enough stock; nothing changed
    /// * `Err(NotFound)` - product does not exist
    pub async fn decrement_stock(conn: &mut SqliteConnection, id: &str, delta: f64) -> DbResult<bool> {
        debug!(id = %id, delta, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = MAX(stock - ?2, 0), updated_at = ?3
            WHERE id = ?1 AND stock >= ?2 - ?4
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(Utc::now())
        .bind(STOCK_EPSILON)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        match Self::find(conn, id).await? {
            Some(_) => Ok(false),
            None => Err(DbError::not_found("Product", id)),
        }
    }

    /// Persists a `tracks_stock` flag on every product that has none.
    ///
    /// Uses the legacy code/name/category heuristics. Returns the number of
    /// products classified.
    pub async fn backfill_tracks_stock(conn: &mut SqliteConnection) -> DbResult<u64> {
        let legacy: Vec<(String, Option<String>, String, Option<i64>)> = sqlx::query_as(
            "SELECT id, code, name, category_id FROM products WHERE tracks_stock IS NULL",
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut updated = 0;
        for (id, code, name, category_id) in legacy {
            let tracks = legacy_tracks_stock(code.as_deref(), &name, category_id);
            debug!(id = %id, tracks, "Classifying legacy product");

            updated += sqlx::query(
                "UPDATE products SET tracks_stock = ?2 WHERE id = ?1 AND tracks_stock IS NULL",
            )
            .bind(&id)
            .bind(tracks)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        }

        Ok(updated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn product(id: &str, name: &str, stock: f64, tracks_stock: Option<bool>) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            code: None,
            name: name.to_string(),
            unit_price: 10.0,
            unit_cost: 4.0,
            tax_rate: 15.0,
            stock,
            tracks_stock,
            sold_by_weight: false,
            category_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        let p = product("p-1", "Feijão 1kg", 10.0, Some(true));
        ProductRepository::insert(&mut conn, &p).await.unwrap();

        let found = ProductRepository::find(&mut conn, "p-1").await.unwrap().unwrap();
        assert_eq!(found.name, "Feijão 1kg");
        assert_eq!(found.tracks_stock, Some(true));
        assert_eq!(ProductRepository::count(&mut conn).await.unwrap(), 1);
        assert!(ProductRepository::find(&mut conn, "nope").await.unwrap().is_none());
        assert!(matches!(
            ProductRepository::get(&mut conn, "nope").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_decrement_stock_is_conditional() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();
        ProductRepository::insert(&mut conn, &product("p-1", "Óleo", 5.0, Some(true)))
            .await
            .unwrap();

        assert!(ProductRepository::decrement_stock(&mut conn, "p-1", 3.0).await.unwrap());
        assert!(!ProductRepository::decrement_stock(&mut conn, "p-1", 3.0).await.unwrap());

        let p = ProductRepository::get(&mut conn, "p-1").await.unwrap();
        assert_eq!(p.stock, 2.0);

        // a shortfall inside the tolerance empties the shelf, never below zero
        assert!(ProductRepository::decrement_stock(&mut conn, "p-1", 2.0 + 1e-10).await.unwrap());
        let p = ProductRepository::get(&mut conn, "p-1").await.unwrap();
        assert_eq!(p.stock, 0.0);

        assert!(matches!(
            ProductRepository::decrement_stock(&mut conn, "missing", 1.0).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_negative_stock_is_refused_by_the_store() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        let err = ProductRepository::insert(&mut conn, &product("p-neg", "Açúcar", -1.0, Some(true)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));

        ProductRepository::insert(&mut conn, &product("p-1", "Açúcar", 1.0, Some(true)))
            .await
            .unwrap();
        let err: DbError = sqlx::query("UPDATE products SET stock = stock - 5 WHERE id = 'p-1'")
            .execute(&mut *conn)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::CheckViolation { .. }));
        assert_eq!(ProductRepository::get(&mut conn, "p-1").await.unwrap().stock, 1.0);
    }

    #[tokio::test]
    async fn test_backfill_classifies_only_unflagged() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        ProductRepository::insert(&mut conn, &product("a", "Impressão colorida", 0.0, None))
            .await
            .unwrap();
        ProductRepository::insert(&mut conn, &product("b", "Arroz", 8.0, None))
            .await
            .unwrap();
        ProductRepository::insert(&mut conn, &product("c", "Serviço avulso", 8.0, Some(true)))
            .await
            .unwrap();

        assert_eq!(ProductRepository::backfill_tracks_stock(&mut conn).await.unwrap(), 2);
        assert_eq!(ProductRepository::backfill_tracks_stock(&mut conn).await.unwrap(), 0);

        let a = ProductRepository::get(&mut conn, "a").await.unwrap();
        let b = ProductRepository::get(&mut conn, "b").await.unwrap();
        let c = ProductRepository::get(&mut conn, "c").await.unwrap();
        assert_eq!(a.tracks_stock, Some(false));
        assert_eq!(b.tracks_stock, Some(true));
        // explicit flag is never overwritten
        assert_eq!(c.tracks_stock, Some(true));
    }
}
