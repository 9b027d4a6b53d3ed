//! # Stock Classification & Depletion
//!
//! Decides whether a sale line touches inventory and by how much.
//!
//! ## Classification Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product.tracks_stock = Some(flag) ──► flag decides        (normal)    │
//! │                                                                         │
//! │  product.tracks_stock = None  (legacy record, not backfilled)          │
//! │       │                                                                 │
//! │       ├── code starts with "srv" / "serv"      ──► Service             │
//! │       ├── name contains "servi" / "impress"    ──► Service             │
//! │       ├── category in SERVICE_CATEGORY_IDS     ──► Service             │
//! │       └── otherwise                            ──► Tracked             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The heuristics exist to backfill catalogs created before the flag did.
//! New products always carry an explicit flag.

use serde::{Deserialize, Serialize};

use crate::types::Product;
use crate::{SERVICE_CATEGORY_IDS, STOCK_EPSILON};

// =============================================================================
// Classification
// =============================================================================

/// How a product's lines affect stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockClass {
    /// Sales decrement stock.
    Tracked,
    /// Sales never touch stock.
    Service,
}

/// Where a classification came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassSource {
    /// The product's `tracks_stock` flag.
    Flag,
    /// The legacy heuristics, because the flag is unset.
    LegacyDefault,
}

/// Classification result for one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub class: StockClass,
    pub source: ClassSource,
}

impl Classification {
    pub fn is_tracked(&self) -> bool {
        self.class == StockClass::Tracked
    }
}

/// Classifies a product for stock purposes.
pub fn classify(product: &Product) -> Classification {
    match product.tracks_stock {
        Some(tracks) => Classification {
            class: if tracks {
                StockClass::Tracked
            } else {
                StockClass::Service
            },
            source: ClassSource::Flag,
        },
        None => Classification {
            class: if legacy_tracks_stock(product.code.as_deref(), &product.name, product.category_id) {
                StockClass::Tracked
            } else {
                StockClass::Service
            },
            source: ClassSource::LegacyDefault,
        },
    }
}

/// Heuristic default for products without a `tracks_stock` flag.
///
/// Returns `false` (service) when any of the code, name or category
/// checks match.
///
/// ## Example
/// ```rust
/// use pdv_core::stock::legacy_tracks_stock;
///
/// assert!(!legacy_tracks_stock(Some("SRV-001"), "Formatação", None));
/// assert!(!legacy_tracks_stock(None, "Impressão A4", None));
/// assert!(!legacy_tracks_stock(None, "Cabo HDMI", Some(14)));
/// assert!(legacy_tracks_stock(Some("CB-01"), "Cabo HDMI", Some(3)));
/// ```
pub fn legacy_tracks_stock(code: Option<&str>, name: &str, category_id: Option<i64>) -> bool {
    let code = code.unwrap_or_default().trim().to_lowercase();
    if code.starts_with("srv") || code.starts_with("serv") {
        return false;
    }

    let name = name.to_lowercase();
    if name.contains("servi") || name.contains("impress") {
        return false;
    }

    if let Some(category) = category_id {
        if SERVICE_CATEGORY_IDS.contains(&category) {
            return false;
        }
    }

    true
}

// =============================================================================
// Depletion
// =============================================================================

/// Amount a stock-tracked line removes from inventory.
///
/// Weight (kg) for products sold by weight when a positive weight is
/// given, otherwise the unit count with a floor of 1.
pub fn depletion_delta(product: &Product, quantity: i64, weight_kg: Option<f64>) -> f64 {
    match weight_kg {
        Some(weight) if product.sold_by_weight && weight > 0.0 => weight,
        _ => quantity.max(1) as f64,
    }
}

/// Whether `stock` can cover `delta`.
pub fn is_sufficient(stock: f64, delta: f64) -> bool {
    stock >= delta - STOCK_EPSILON
}

/// Cumulative stock demand of one transaction, per product.
///
/// Two lines for the same product must be checked against their sum,
/// not each against the full stock.
#[derive(Debug, Clone, Default)]
pub struct DepletionPlan {
    entries: Vec<(String, f64)>,
}

impl DepletionPlan {
    pub fn new() -> Self {
        DepletionPlan::default()
    }

    /// Adds a delta for a product and returns the product's running total.
    pub fn add(&mut self, product_id: &str, delta: f64) -> f64 {
        if let Some((_, total)) = self.entries.iter_mut().find(|(id, _)| id == product_id) {
            *total += delta;
            return *total;
        }
        self.entries.push((product_id.to_string(), delta));
        delta
    }

    /// Per-product totals, in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(id, total)| (id.as_str(), *total))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
