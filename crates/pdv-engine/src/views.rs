//! # Read Models
//!
//! What the engine hands back to callers. Domain records stay untouched;
//! derived names (seller, customer, product) live only on these views and
//! are filled from joins.

use pdv_core::{Debt, DebtPayment, Sale, SaleItem};
use pdv_db::{
    DebtItemLine, DebtRepository, DebtSummary, PartyKind, PartyRepository, SaleRepository,
};
use serde::Serialize;
use sqlx::SqliteConnection;

use crate::error::{LedgerError, LedgerResult};

/// A sale with its lines and party names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    pub seller_name: Option<String>,
    pub customer_name: Option<String>,
    pub items: Vec<SaleItem>,
}

impl SaleView {
    /// Builds the view of `sale` from the store.
    pub(crate) async fn load(conn: &mut SqliteConnection, sale: Sale) -> LedgerResult<Self> {
        let items = SaleRepository::items(conn, &sale.id).await?;
        let seller_name = PartyRepository::name_of_opt(conn, PartyKind::User, sale.user_id.as_deref()).await?;
        let customer_name =
            PartyRepository::name_of_opt(conn, PartyKind::Customer, sale.customer_id.as_deref()).await?;

        Ok(SaleView {
            sale,
            seller_name,
            customer_name,
            items,
        })
    }
}

/// A debt with the customer's name and what is still owed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtView {
    #[serde(flatten)]
    pub debt: Debt,
    pub customer_name: Option<String>,
    pub remaining: f64,
}

impl From<DebtSummary> for DebtView {
    fn from(summary: DebtSummary) -> Self {
        let remaining = summary.debt.remaining();
        DebtView {
            debt: summary.debt,
            customer_name: summary.customer_name,
            remaining,
        }
    }
}

impl DebtView {
    pub(crate) async fn load(conn: &mut SqliteConnection, id: &str) -> LedgerResult<Self> {
        DebtRepository::summary(conn, id)
            .await?
            .map(DebtView::from)
            .ok_or_else(|| LedgerError::not_found("Debt", id))
    }
}

/// A debt with its lines and payment history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebtDetail {
    #[serde(flatten)]
    pub debt: DebtView,
    pub items: Vec<DebtItemLine>,
    pub payments: Vec<DebtPayment>,
}

/// Result of a registered payment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    /// The debt after the payment.
    pub debt: DebtView,
    pub payment: DebtPayment,
    /// Id of the revenue sale synthesized for the payment, when that
    /// best-effort step succeeded.
    pub revenue_sale_id: Option<String>,
}

/// A listing plus the number of stored rows left out because they could
/// not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>, skipped: usize) -> Self {
        Listing { items, skipped }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub(crate) fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        Listing {
            items: self.items.into_iter().map(f).collect(),
            skipped: self.skipped,
        }
    }
}
