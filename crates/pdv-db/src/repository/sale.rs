//! # Sale Repository
//!
//! Sales and their items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   insert + insert_item × N  (one engine transaction)                   │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   ┌──────────┐   set_cancelled   ┌───────────┐   delete_with_items     │
//! │   │  active  │ ────────────────► │ cancelled │ ──────────────────► ∅   │
//! │   └──────────┘                   └───────────┘                          │
//! │                                                                         │
//! │   Items are immutable. Active sales are never deleted.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use pdv_core::{Sale, SaleFilter, SaleItem, SaleStatusFilter};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use super::decode_rows;
use crate::error::{DbError, DbResult};

const SALE_COLUMNS: &str = "id, user_id, customer_id, total, discount, payment_method, notes, \
     tax_applied, cancelled, created_at, updated_at";

const SALE_ITEM_COLUMNS: &str = "id, sale_id, product_id, quantity, weight_kg, unit_price, \
     subtotal, unit_cost, tax_rate, tax_base, tax_amount";

/// A sale row joined with seller and customer names, for listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SaleSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub sale: Sale,
    pub seller_name: Option<String>,
    pub customer_name: Option<String>,
}

/// Repository for sale operations.
pub struct SaleRepository;

impl SaleRepository {
    /// Finds a sale by id.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(sale)
    }

    /// Items of a sale, in insertion order.
    pub async fn items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!("SELECT {SALE_ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY rowid");
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(items)
    }

    /// Inserts a sale header.
    ///
    /// A second insert with the same id fails with `UniqueViolation`.
    pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, total = sale.total, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, user_id, customer_id, total, discount, payment_method, notes,
                tax_applied, cancelled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.user_id)
        .bind(&sale.customer_id)
        .bind(sale.total)
        .bind(sale.discount)
        .bind(&sale.payment_method)
        .bind(&sale.notes)
        .bind(sale.tax_applied)
        .bind(sale.cancelled)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one sale item.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, quantity, weight_kg, unit_price,
                subtotal, unit_cost, tax_rate, tax_base, tax_amount
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.weight_kg)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .bind(item.unit_cost)
        .bind(item.tax_rate)
        .bind(item.tax_base)
        .bind(item.tax_amount)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Marks a sale as cancelled.
    pub async fn set_cancelled(
        conn: &mut SqliteConnection,
        id: &str,
        at: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(id = %id, "Cancelling sale");

        let result = sqlx::query("UPDATE sales SET cancelled = 1, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(at)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }
        Ok(())
    }

    /// Deletes a sale and its items. Returns the number of items removed.
    ///
    /// Callers check that the sale is cancelled first.
    pub async fn delete_with_items(conn: &mut SqliteConnection, id: &str) -> DbResult<u64> {
        debug!(id = %id, "Deleting sale");

        let items = sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?
            .rows_affected();

        let result = sqlx::query("DELETE FROM sales WHERE id = ?1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale", id));
        }
        Ok(items)
    }

    /// Lists sales matching a filter, newest first.
    ///
    /// Rows that fail to decode are left out; the second element of the
    /// result counts them.
    pub async fn list(
        conn: &mut SqliteConnection,
        filter: &SaleFilter,
    ) -> DbResult<(Vec<SaleSummary>, usize)> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT s.id AS id, s.user_id AS user_id, s.customer_id AS customer_id,
                   s.total AS total, s.discount AS discount,
                   s.payment_method AS payment_method, s.notes AS notes,
                   s.tax_applied AS tax_applied, s.cancelled AS cancelled,
                   s.created_at AS created_at, s.updated_at AS updated_at,
                   u.name AS seller_name, c.name AS customer_name
            FROM sales s
            LEFT JOIN users u ON u.id = s.user_id
            LEFT JOIN customers c ON c.id = s.customer_id
            WHERE 1 = 1
            "#,
        );

        match filter.status {
            SaleStatusFilter::Open => {
                qb.push(" AND s.cancelled = 0");
            }
            SaleStatusFilter::Cancelled => {
                qb.push(" AND s.cancelled = 1");
            }
            SaleStatusFilter::Any => {}
        }

        if let Some(user_id) = &filter.user_id {
            qb.push(" AND s.user_id = ").push_bind(user_id.clone());
        }
        if let Some(from) = filter.from {
            qb.push(" AND s.created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND s.created_at < ").push_bind(to);
        }

        qb.push(" ORDER BY s.created_at DESC");
        // LIMIT -1 means no limit in SQLite
        qb.push(" LIMIT ").push_bind(filter.limit.unwrap_or(-1));
        qb.push(" OFFSET ").push_bind(filter.offset.max(0));

        let rows = qb.build().fetch_all(&mut *conn).await?;
        Ok(decode_rows(rows, "sale"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::party::{PartyKind, PartyRepository};
    use chrono::Duration;

    fn sale(id: &str, user_id: Option<&str>, created_at: DateTime<Utc>) -> Sale {
        Sale {
            id: id.to_string(),
            user_id: user_id.map(str::to_string),
            customer_id: None,
            total: 20.0,
            discount: 0.0,
            payment_method: "Dinheiro".to_string(),
            notes: None,
            tax_applied: true,
            cancelled: false,
            created_at,
            updated_at: created_at,
        }
    }

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_id_is_unique_violation() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        let s = sale("s-1", None, Utc::now());
        SaleRepository::insert(&mut conn, &s).await.unwrap();
        let err = SaleRepository::insert(&mut conn, &s).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_cancel_and_delete() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        SaleRepository::insert(&mut conn, &sale("s-1", None, Utc::now()))
            .await
            .unwrap();
        SaleRepository::set_cancelled(&mut conn, "s-1", Utc::now())
            .await
            .unwrap();
        assert!(SaleRepository::find(&mut conn, "s-1").await.unwrap().unwrap().cancelled);

        assert_eq!(SaleRepository::delete_with_items(&mut conn, "s-1").await.unwrap(), 0);
        assert!(SaleRepository::find(&mut conn, "s-1").await.unwrap().is_none());

        assert!(matches!(
            SaleRepository::set_cancelled(&mut conn, "s-1", Utc::now()).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_names() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();
        PartyRepository::upsert(&mut conn, PartyKind::User, "u-1", "Ana")
            .await
            .unwrap();

        let now = Utc::now();
        SaleRepository::insert(&mut conn, &sale("old", Some("u-1"), now - Duration::days(3)))
            .await
            .unwrap();
        SaleRepository::insert(&mut conn, &sale("new", Some("u-1"), now))
            .await
            .unwrap();
        SaleRepository::insert(&mut conn, &sale("other", None, now))
            .await
            .unwrap();
        SaleRepository::set_cancelled(&mut conn, "other", now).await.unwrap();

        let (open, skipped) = SaleRepository::list(&mut conn, &SaleFilter::default())
            .await
            .unwrap();
        assert_eq!(skipped, 0);
        let ids: Vec<_> = open.iter().map(|s| s.sale.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(open[0].seller_name.as_deref(), Some("Ana"));

        let filter = SaleFilter {
            user_id: Some("u-1".to_string()),
            from: Some(now - Duration::days(1)),
            to: Some(now + Duration::days(1)),
            ..SaleFilter::default()
        };
        let (recent, _) = SaleRepository::list(&mut conn, &filter).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].sale.id, "new");

        let filter = SaleFilter {
            status: SaleStatusFilter::Cancelled,
            ..SaleFilter::default()
        };
        let (cancelled, _) = SaleRepository::list(&mut conn, &filter).await.unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].sale.id, "other");
    }

    #[tokio::test]
    async fn test_list_skips_malformed_rows() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        SaleRepository::insert(&mut conn, &sale("good", None, Utc::now()))
            .await
            .unwrap();
        // legacy row with an unparseable timestamp
        sqlx::query(
            "INSERT INTO sales (id, total, payment_method, created_at, updated_at) \
             VALUES ('bad', 5, 'Pix', 'ontem', 'ontem')",
        )
        .execute(&mut *conn)
        .await
        .unwrap();

        let filter = SaleFilter {
            status: SaleStatusFilter::Any,
            ..SaleFilter::default()
        };
        let (sales, skipped) = SaleRepository::list(&mut conn, &filter).await.unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].sale.id, "good");
    }

    #[tokio::test]
    async fn test_limit_and_offset() {
        let db = setup().await;
        let mut conn = db.acquire().await.unwrap();

        let now = Utc::now();
        for i in 0..5 {
            let s = sale(&format!("s-{i}"), None, now - Duration::minutes(i));
            SaleRepository::insert(&mut conn, &s).await.unwrap();
        }

        let filter = SaleFilter {
            limit: Some(2),
            offset: 1,
            ..SaleFilter::default()
        };
        let (page, _) = SaleRepository::list(&mut conn, &filter).await.unwrap();
        let ids: Vec<_> = page.iter().map(|s| s.sale.id.as_str()).collect();
        assert_eq!(ids, vec!["s-1", "s-2"]);
    }
}
