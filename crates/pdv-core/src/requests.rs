//! # Request Records
//!
//! Inbound requests sent by POS terminals. Field names follow the ledger
//! records; serde aliases accept the labels older PDV terminals still send
//! (`produto_id`, `quantidade`, `aplicar_iva`, `id_local`, ...).
//!
//! Requests are plain data. Nothing here is validated until the engine
//! runs it through [`crate::validation`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DebtStatus;

fn default_true() -> bool {
    true
}

fn default_quantity() -> i64 {
    1
}

// =============================================================================
// Sales
// =============================================================================

/// A proposed sale.
///
/// `id` is the idempotency key. Offline terminals generate it locally and
/// replay the same request until they see a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    #[serde(default, alias = "uuid")]
    pub id: Option<String>,

    #[serde(default, alias = "usuario_id")]
    pub user_id: Option<String>,

    #[serde(default, alias = "cliente_id")]
    pub customer_id: Option<String>,

    pub total: f64,

    #[serde(default, alias = "desconto")]
    pub discount: f64,

    #[serde(alias = "forma_pagamento")]
    pub payment_method: String,

    #[serde(default, alias = "observacoes")]
    pub notes: Option<String>,

    /// Whether VAT is split out of the line subtotals. Defaults to true.
    #[serde(default = "default_true", alias = "aplicar_iva")]
    pub apply_tax: bool,

    #[serde(default, alias = "itens")]
    pub items: Vec<NewSaleItem>,

    /// Original sale time on the terminal, preserved on sync.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewSale {
    /// Creates a sale request with no items and tax applied.
    pub fn new(payment_method: impl Into<String>, total: f64) -> Self {
        NewSale {
            id: None,
            user_id: None,
            customer_id: None,
            total,
            discount: 0.0,
            payment_method: payment_method.into(),
            notes: None,
            apply_tax: true,
            items: Vec::new(),
            created_at: None,
        }
    }

    /// Sets the idempotency key.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the seller.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the customer.
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Sets whether VAT applies to the whole sale.
    pub fn apply_tax(mut self, apply: bool) -> Self {
        self.apply_tax = apply;
        self
    }

    /// Appends a line.
    pub fn item(mut self, item: NewSaleItem) -> Self {
        self.items.push(item);
        self
    }
}

/// One proposed sale line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSaleItem {
    #[serde(alias = "produto_id")]
    pub product_id: String,

    #[serde(default = "default_quantity", alias = "quantidade")]
    pub quantity: i64,

    #[serde(default, alias = "peso_kg")]
    pub weight_kg: Option<f64>,

    #[serde(alias = "preco_unitario")]
    pub unit_price: f64,

    pub subtotal: f64,

    /// Unit cost as known by the terminal when the sale happened.
    #[serde(default, alias = "preco_custo_unitario")]
    pub unit_cost: Option<f64>,
}

impl NewSaleItem {
    /// A line sold by unit count; subtotal is `quantity × unit_price`.
    pub fn units(product_id: impl Into<String>, quantity: i64, unit_price: f64) -> Self {
        NewSaleItem {
            product_id: product_id.into(),
            quantity,
            weight_kg: None,
            unit_price,
            subtotal: quantity as f64 * unit_price,
            unit_cost: None,
        }
    }

    /// A line sold by weight; subtotal is `weight_kg × unit_price`.
    pub fn weighed(product_id: impl Into<String>, weight_kg: f64, unit_price: f64) -> Self {
        NewSaleItem {
            product_id: product_id.into(),
            quantity: 1,
            weight_kg: Some(weight_kg),
            unit_price,
            subtotal: weight_kg * unit_price,
            unit_cost: None,
        }
    }

    /// Sets the terminal-side unit cost.
    pub fn with_unit_cost(mut self, cost: f64) -> Self {
        self.unit_cost = Some(cost);
        self
    }
}

/// Which sales a listing returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatusFilter {
    /// Sales that are not cancelled.
    #[default]
    Open,
    /// Cancelled sales only.
    Cancelled,
    /// Every sale.
    Any,
}

/// Filter for sale listings.
///
/// The date range is half-open: `from <= created_at < to`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleFilter {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: SaleStatusFilter,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: i64,
}

// =============================================================================
// Debts
// =============================================================================

/// A proposed debt account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDebt {
    /// Terminal-assigned id; the idempotency key for batch sync.
    #[serde(default, alias = "id_local")]
    pub local_id: Option<i64>,

    #[serde(default, alias = "cliente_id")]
    pub customer_id: Option<String>,

    #[serde(default, alias = "usuario_id")]
    pub user_id: Option<String>,

    #[serde(default, alias = "observacao")]
    pub notes: Option<String>,

    #[serde(default, alias = "desconto_aplicado")]
    pub discount_applied: f64,

    /// Percentage discount; takes precedence over `discount_applied` when > 0.
    #[serde(default, alias = "percentual_desconto")]
    pub discount_percent: f64,

    #[serde(default, alias = "itens")]
    pub items: Vec<NewDebtItem>,
}

impl NewDebt {
    /// Creates a debt request without items or discount.
    pub fn new() -> Self {
        NewDebt {
            local_id: None,
            customer_id: None,
            user_id: None,
            notes: None,
            discount_applied: 0.0,
            discount_percent: 0.0,
            items: Vec::new(),
        }
    }

    /// Sets the terminal-assigned id.
    pub fn with_local_id(mut self, local_id: i64) -> Self {
        self.local_id = Some(local_id);
        self
    }

    /// Sets the customer.
    pub fn with_customer(mut self, customer_id: impl Into<String>) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    /// Appends a line.
    pub fn item(mut self, item: NewDebtItem) -> Self {
        self.items.push(item);
        self
    }
}

impl Default for NewDebt {
    fn default() -> Self {
        NewDebt::new()
    }
}

/// One proposed debt line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDebtItem {
    #[serde(alias = "produto_id")]
    pub product_id: String,

    #[serde(alias = "quantidade")]
    pub quantity: f64,

    #[serde(alias = "preco_unitario")]
    pub unit_price: f64,

    pub subtotal: f64,
}

impl NewDebtItem {
    /// A debt line with `subtotal = quantity × unit_price`.
    pub fn new(product_id: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        NewDebtItem {
            product_id: product_id.into(),
            quantity,
            unit_price,
            subtotal: quantity * unit_price,
        }
    }
}

/// A payment against a debt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    #[serde(alias = "valor")]
    pub value: f64,

    #[serde(alias = "forma_pagamento")]
    pub payment_method: String,

    #[serde(default, alias = "usuario_id")]
    pub user_id: Option<String>,
}

impl NewPayment {
    pub fn new(value: f64, payment_method: impl Into<String>) -> Self {
        NewPayment {
            value,
            payment_method: payment_method.into(),
            user_id: None,
        }
    }
}

/// Filter for debt listings. Empty filter lists everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebtFilter {
    #[serde(default)]
    pub status: Option<DebtStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sale_request_from_terminal_payload() {
        let json = r#"{
            "uuid": "6f1c0d4e-8a4b-4c7e-9a51-3f0a2b1c9d10",
            "usuario_id": "a8c1f1de-2f0e-4a52-8e1d-2b7c5b1d0f33",
            "total": 34.5,
            "forma_pagamento": "Dinheiro",
            "itens": [
                {"produto_id": "p-1", "quantidade": 3, "preco_unitario": 11.5, "subtotal": 34.5}
            ]
        }"#;

        let sale: NewSale = serde_json::from_str(json).unwrap();
        assert_eq!(sale.id.as_deref(), Some("6f1c0d4e-8a4b-4c7e-9a51-3f0a2b1c9d10"));
        assert!(sale.apply_tax);
        assert_eq!(sale.discount, 0.0);
        assert_eq!(sale.items.len(), 1);
        assert_eq!(sale.items[0].quantity, 3);
        assert!(sale.items[0].unit_cost.is_none());
    }

    #[test]
    fn test_apply_tax_can_be_disabled() {
        let json = r#"{"total": 10.0, "forma_pagamento": "Pix", "aplicar_iva": false}"#;
        let sale: NewSale = serde_json::from_str(json).unwrap();
        assert!(!sale.apply_tax);
        assert!(sale.items.is_empty());
    }

    #[test]
    fn test_debt_request_from_terminal_payload() {
        let json = r#"{
            "id_local": 42,
            "percentual_desconto": 10,
            "itens": [{"produto_id": "p-1", "quantidade": 0.5, "preco_unitario": 20, "subtotal": 10}]
        }"#;

        let debt: NewDebt = serde_json::from_str(json).unwrap();
        assert_eq!(debt.local_id, Some(42));
        assert_eq!(debt.discount_percent, 10.0);
        assert_eq!(debt.items[0].quantity, 0.5);
    }

    #[test]
    fn test_line_builders_compute_subtotal() {
        assert_eq!(NewSaleItem::units("p", 3, 11.5).subtotal, 34.5);
        assert_eq!(NewSaleItem::weighed("p", 0.5, 20.0).subtotal, 10.0);
        assert_eq!(NewDebtItem::new("p", 4.0, 25.0).subtotal, 100.0);
    }

    #[test]
    fn test_sale_filter_defaults_to_open() {
        let filter = SaleFilter::default();
        assert_eq!(filter.status, SaleStatusFilter::Open);
        assert_eq!(filter.offset, 0);
    }
}
