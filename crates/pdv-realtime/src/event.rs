//! # Ledger Events
//!
//! The notifications terminals receive after a sale changes.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  One JSON text frame per event:                                        │
//! │                                                                         │
//! │  {                                                                      │
//! │    "event": "sale.created",                                             │
//! │    "ts":    "2024-05-01T12:00:00Z",                                     │
//! │    "data":  { "id": "...", "user_id": "...", "total": 34.5,            │
//! │               "discount": 0.0, "payment_method": "Dinheiro",            │
//! │               "created_at": "..." }                                     │
//! │  }                                                                      │
//! │                                                                         │
//! │  sale.cancelled  data = { "id": "...", "cancelled": true }              │
//! │  sale.deleted    data = { "id": "..." }                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RealtimeResult;

/// Event names as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "sale.created")]
    SaleCreated,
    #[serde(rename = "sale.cancelled")]
    SaleCancelled,
    #[serde(rename = "sale.deleted")]
    SaleDeleted,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::SaleCreated => "sale.created",
            EventName::SaleCancelled => "sale.cancelled",
            EventName::SaleDeleted => "sale.deleted",
        }
    }
}

impl std::fmt::Display for EventName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event payloads. Kept minimal: terminals refetch what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventData {
    SaleCreated {
        id: String,
        user_id: Option<String>,
        total: f64,
        discount: f64,
        payment_method: String,
        created_at: DateTime<Utc>,
    },
    SaleCancelled {
        id: String,
        cancelled: bool,
    },
    SaleDeleted {
        id: String,
    },
}

/// A committed ledger change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event: EventName,
    pub ts: DateTime<Utc>,
    pub data: EventData,
}

impl LedgerEvent {
    /// A sale was committed.
    pub fn sale_created(
        id: impl Into<String>,
        user_id: Option<String>,
        total: f64,
        discount: f64,
        payment_method: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        LedgerEvent {
            event: EventName::SaleCreated,
            ts: Utc::now(),
            data: EventData::SaleCreated {
                id: id.into(),
                user_id,
                total,
                discount,
                payment_method: payment_method.into(),
                created_at,
            },
        }
    }

    /// A sale was marked cancelled.
    pub fn sale_cancelled(id: impl Into<String>) -> Self {
        LedgerEvent {
            event: EventName::SaleCancelled,
            ts: Utc::now(),
            data: EventData::SaleCancelled {
                id: id.into(),
                cancelled: true,
            },
        }
    }

    /// A cancelled sale was removed.
    pub fn sale_deleted(id: impl Into<String>) -> Self {
        LedgerEvent {
            event: EventName::SaleDeleted,
            ts: Utc::now(),
            data: EventData::SaleDeleted { id: id.into() },
        }
    }

    /// Id of the sale the event is about.
    pub fn sale_id(&self) -> &str {
        match &self.data {
            EventData::SaleCreated { id, .. }
            | EventData::SaleCancelled { id, .. }
            | EventData::SaleDeleted { id } => id,
        }
    }

    /// Encodes the event as a WebSocket text frame.
    pub fn to_frame(&self) -> RealtimeResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
