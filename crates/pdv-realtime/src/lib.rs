//! # pdv-realtime: Live Ledger Events
//!
//! Publishes committed sale changes to whoever is listening: in-process
//! subscribers and terminals connected to the WebSocket hub.
//!
//! ## Delivery Guarantees
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ✓ Published only after the originating transaction commits            │
//! │  ✓ Publishing never fails or blocks the caller                         │
//! │  ✗ No persistence: offline terminals miss events                       │
//! │  ✗ No replay: lagging subscribers skip the oldest events               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`event`] - `LedgerEvent` and its wire format
//! - [`broadcaster`] - In-process fan-out over a tokio broadcast channel
//! - [`hub`] - Axum WebSocket server relaying events to terminals
//! - [`error`] - Hub errors
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdv_realtime::{Broadcaster, EventHub, HubConfig, LedgerEvent};
//!
//! let broadcaster = Broadcaster::new(256);
//! let hub = EventHub::new(HubConfig::default(), broadcaster.clone()).start().await?;
//!
//! broadcaster.publish(LedgerEvent::sale_deleted(sale_id));
//! ```

pub mod broadcaster;
pub mod error;
pub mod event;
pub mod hub;

pub use broadcaster::{Broadcaster, DEFAULT_EVENT_CAPACITY};
pub use error::{RealtimeError, RealtimeResult};
pub use event::{EventData, EventName, LedgerEvent};
pub use hub::{ConnectedClient, EventHub, HubConfig, HubHandle, DEFAULT_HUB_PORT};
