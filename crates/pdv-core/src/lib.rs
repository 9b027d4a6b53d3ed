//! # pdv-core: Pure Ledger Rules for the PDV Backend
//!
//! This crate holds every rule of the transaction engine that can be
//! expressed without touching a database, a socket or a clock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        PDV Ledger Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            POS terminals (online + offline-first)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ requests                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 pdv-engine (transactions)                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ pdv-core (THIS CRATE) ★                         │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │    tax    │  │   stock   │  │   debt    │  │   │
//! │  │   │ requests  │  │ inclusive │  │ tracked / │  │ totals +  │  │   │
//! │  │   │  records  │  │  pricing  │  │  service  │  │  status   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger records (Product, Sale, Debt, ...)
//! - [`requests`] - Inbound request records sent by terminals
//! - [`tax`] - Tax-inclusive VAT split and frozen unit cost
//! - [`stock`] - Stock-tracked vs service classification, depletion deltas
//! - [`debt`] - Debt totals and the status state machine
//! - [`validation`] - Identifier and field validation
//! - [`error`] - Domain error types
//!
//! ## Floating Point Money
//!
//! Terminals send totals as decimal numbers and the ledger stores them as
//! `f64`. Every comparison on those values goes through one of the named
//! tolerances below, never a bare literal.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod debt;
pub mod error;
pub mod requests;
pub mod stock;
pub mod tax;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tolerance when deciding whether a debt is settled.
///
/// A debt counts as settled once `amount_paid >= total - SETTLEMENT_EPSILON`.
/// One cent in the store currency.
pub const SETTLEMENT_EPSILON: f64 = 0.01;

/// Tolerance for stock sufficiency checks.
///
/// A line is rejected when `stock < delta - STOCK_EPSILON`. Weight-based
/// stock accumulates float error, so an exact comparison would reject a
/// sale of the last 0.3 kg.
pub const STOCK_EPSILON: f64 = 1e-9;

/// Minimum client-supplied unit cost that overrides the catalog cost.
pub const COST_EPSILON: f64 = 1e-9;

/// Category ids that hold services in legacy catalogs.
pub const SERVICE_CATEGORY_IDS: [i64; 3] = [10, 14, 15];

/// Maximum length of a payment method label.
pub const MAX_PAYMENT_METHOD_LEN: usize = 50;
