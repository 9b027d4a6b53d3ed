//! # Debt Repository
//!
//! Debts, their items and the append-only payment log.

use chrono::{DateTime, Utc};
use pdv_core::SETTLEMENT_EPSILON;
use pdv_core::{Debt, DebtFilter, DebtItem, DebtPayment, DebtStatus};
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

use super::decode_rows;
use crate::error::{DbError, DbResult};

const DEBT_COLUMNS: &str = "id, local_id, customer_id, user_id, original_value, discount_applied, \
     discount_percent, total, amount_paid, status, notes, created_at, updated_at";

/// A debt joined with the customer's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DebtSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub debt: Debt,
    pub customer_name: Option<String>,
}

/// A debt item joined with the product's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DebtItemLine {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub item: DebtItem,
    pub product_name: Option<String>,
}

/// Repository for debt operations.
pub struct DebtRepository;

impl DebtRepository {
    /// Finds a debt by id.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Debt>> {
        let sql = format!("SELECT {DEBT_COLUMNS} FROM debts WHERE id = ?1");
        let debt = sqlx::query_as::<_, Debt>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(debt)
    }

    /// Finds a debt by the id an offline terminal assigned to it.
    pub async fn find_by_local_id(
        conn: &mut SqliteConnection,
        local_id: i64,
    ) -> DbResult<Option<Debt>> {
        let sql = format!("SELECT {DEBT_COLUMNS} FROM debts WHERE local_id = ?1");
        let debt = sqlx::query_as::<_, Debt>(&sql)
            .bind(local_id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(debt)
    }

    /// Inserts a debt header.
    ///
    /// A second insert with the same local id fails with `UniqueViolation`.
    pub async fn insert(conn: &mut SqliteConnection, debt: &Debt) -> DbResult<()> {
        debug!(id = %debt.id, local_id = ?debt.local_id, total = debt.total, "Inserting debt");

        sqlx::query(
            r#"
            INSERT INTO debts (
                id, local_id, customer_id, user_id, original_value, discount_applied,
                discount_percent, total, amount_paid, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&debt.id)
        .bind(debt.local_id)
        .bind(&debt.customer_id)
        .bind(&debt.user_id)
        .bind(debt.original_value)
        .bind(debt.discount_applied)
        .bind(debt.discount_percent)
        .bind(debt.total)
        .bind(debt.amount_paid)
        .bind(debt.status)
        .bind(&debt.notes)
        .bind(debt.created_at)
        .bind(debt.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one debt item.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &DebtItem) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO debt_items (id, debt_id, product_id, quantity, unit_price, subtotal)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.debt_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price)
        .bind(item.subtotal)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Appends a payment.
    pub async fn insert_payment(conn: &mut SqliteConnection, payment: &DebtPayment) -> DbResult<()> {
        debug!(debt_id = %payment.debt_id, value = payment.value, "Recording debt payment");

        sqlx::query(
            r#"
            INSERT INTO debt_payments (id, debt_id, value, payment_method, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.debt_id)
        .bind(payment.value)
        .bind(&payment.payment_method)
        .bind(&payment.user_id)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Adds a payment to the paid amount and moves the status, in one
    /// statement, returning the debt as stored afterwards.
    ///
    /// The increment is relative to the stored amount, so two payments can
    /// never overwrite each other. The row only changes while the debt is
    /// open and the new amount stays within `total + SETTLEMENT_EPSILON`;
    /// otherwise the debt changed since the caller validated the payment
    /// and `StaleWrite` is returned.
    pub async fn add_payment_amount(
        conn: &mut SqliteConnection,
        id: &str,
        value: f64,
        at: DateTime<Utc>,
    ) -> DbResult<Debt> {
        let sql = format!(
            r#"
            UPDATE debts
            SET amount_paid = amount_paid + ?2,
                status = CASE WHEN amount_paid + ?2 >= total - ?3 THEN ?4 ELSE ?5 END,
                updated_at = ?6
            WHERE id = ?1
              AND status != ?4
              AND amount_paid + ?2 <= total + ?3
            RETURNING {DEBT_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, Debt>(&sql)
            .bind(id)
            .bind(value)
            .bind(SETTLEMENT_EPSILON)
            .bind(DebtStatus::Settled)
            .bind(DebtStatus::Partial)
            .bind(at)
            .fetch_optional(&mut *conn)
            .await?;

        match updated {
            Some(debt) => {
                debug!(debt_id = %id, amount_paid = debt.amount_paid, status = %debt.status, "Debt balance updated");
                Ok(debt)
            }
            None if Self::find(conn, id).await?.is_some() => Err(DbError::StaleWrite {
                entity: "Debt".to_string(),
                id: id.to_string(),
            }),
            None => Err(DbError::not_found("Debt", id)),
        }
    }

    /// Items of a debt with product names, in insertion order.
    pub async fn items(conn: &mut SqliteConnection, debt_id: &str) -> DbResult<Vec<DebtItemLine>> {
        let items = sqlx::query_as::<_, DebtItemLine>(
            r#"
            SELECT i.id AS id, i.debt_id AS debt_id, i.product_id AS product_id,
                   i.quantity AS quantity, i.unit_price AS unit_price, i.subtotal AS subtotal,
                   p.name AS product_name
            FROM debt_items i
            LEFT JOIN products p ON p.id = i.product_id
            WHERE i.debt_id = ?1
            ORDER BY i.rowid
            "#,
        )
        .bind(debt_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(items)
    }

    /// Payments of a debt, oldest first.
    pub async fn payments(conn: &mut SqliteConnection, debt_id: &str) -> DbResult<Vec<DebtPayment>> {
        let payments = sqlx::query_as::<_, DebtPayment>(
            r#"
            SELECT id, debt_id, value, payment_method, user_id, created_at
            FROM debt_payments
            WHERE debt_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(debt_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(payments)
    }

    /// Finds a debt by id, joined with the customer's name.
    pub async fn summary(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<DebtSummary>> {
        let mut qb = Self::summary_query();
        qb.push(" WHERE d.id = ").push_bind(id.to_string());

        let summary = qb
            .build_query_as::<DebtSummary>()
            .fetch_optional(&mut *conn)
            .await?;
        Ok(summary)
    }

    /// Lists debts matching a filter, newest first.
    ///
    /// Rows that fail to decode are left out and counted.
    pub async fn list(
        conn: &mut SqliteConnection,
        filter: &DebtFilter,
    ) -> DbResult<(Vec<DebtSummary>, usize)> {
        let mut qb = Self::summary_query();
        qb.push(" WHERE 1 = 1");

        if let Some(status) = filter.status {
            qb.push(" AND d.status = ").push_bind(status);
        }
        if let Some(customer_id) = &filter.customer_id {
            qb.push(" AND d.customer_id = ").push_bind(customer_id.clone());
        }
        qb.push(" ORDER BY d.created_at DESC, d.rowid DESC");

        let rows = qb.build().fetch_all(&mut *conn).await?;
        Ok(decode_rows(rows, "debt"))
    }

    /// Lists every debt that is not settled, newest first, optionally for
    /// one customer.
    pub async fn list_open(
        conn: &mut SqliteConnection,
        customer_id: Option<&str>,
    ) -> DbResult<(Vec<DebtSummary>, usize)> {
        let mut qb = Self::summary_query();
        qb.push(" WHERE d.status != ").push_bind(DebtStatus::Settled);
        if let Some(customer_id) = customer_id {
            qb.push(" AND d.customer_id = ").push_bind(customer_id.to_string());
        }
        qb.push(" ORDER BY d.created_at DESC, d.rowid DESC");

        let rows = qb.build().fetch_all(&mut *conn).await?;
        Ok(decode_rows(rows, "debt"))
    }

    fn summary_query() -> QueryBuilder<'static, Sqlite> {
        QueryBuilder::new(
            r#"
            SELECT d.id AS id, d.local_id AS local_id, d.customer_id AS customer_id,
                   d.user_id AS user_id, d.original_value AS original_value,
                   d.discount_applied AS discount_applied,
                   d.discount_percent AS discount_percent, d.total AS total,
                   d.amount_paid AS amount_paid, d.status AS status, d.notes AS notes,
                   d.created_at AS created_at, d.updated_at AS updated_at,
                   c.name AS customer_name
            FROM debts d
            LEFT JOIN customers c ON c.id = d.customer_id
            "#,
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
