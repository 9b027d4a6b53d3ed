//! # Event Broadcaster
//!
//! In-process fan-out of [`LedgerEvent`]s over a tokio broadcast channel.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  publish(event)                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  broadcast::Sender ──► Receiver (EventHub connection #1)               │
//! │   (capacity N)     ──► Receiver (EventHub connection #2)               │
//! │                    ──► Receiver (in-process subscriber)                │
//! │                                                                         │
//! │  No receivers      ──► event dropped, publish still succeeds           │
//! │  Slow receiver     ──► loses the oldest events (RecvError::Lagged)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tokio::sync::broadcast;
use tracing::debug;

use crate::event::LedgerEvent;

/// Default channel capacity.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Publish side of the ledger event stream. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<LedgerEvent>,
}

impl Broadcaster {
    /// Creates a broadcaster buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        // broadcast::channel rejects a zero capacity
        let (tx, _) = broadcast::channel(capacity.max(1));
        Broadcaster { tx }
    }

    /// Publishes an event to every current subscriber.
    ///
    /// Never fails. Returns how many subscribers the event was queued for.
    pub fn publish(&self, event: LedgerEvent) -> usize {
        let name = event.event;
        match self.tx.send(event) {
            Ok(delivered) => {
                debug!(event = %name, delivered, "Published ledger event");
                delivered
            }
            Err(_) => {
                debug!(event = %name, "No subscribers for ledger event");
                0
            }
        }
    }

    /// Subscribes to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Broadcaster::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventName;
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let broadcaster = Broadcaster::new(4);
        assert_eq!(broadcaster.publish(LedgerEvent::sale_deleted("s-1")), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives() {
        let broadcaster = Broadcaster::new(4);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        assert_eq!(broadcaster.publish(LedgerEvent::sale_cancelled("s-1")), 2);

        assert_eq!(a.recv().await.unwrap().event, EventName::SaleCancelled);
        assert_eq!(b.recv().await.unwrap().sale_id(), "s-1");
    }

    #[tokio::test]
    async fn test_lagging_subscriber_loses_oldest() {
        let broadcaster = Broadcaster::new(2);
        let mut rx = broadcaster.subscribe();

        for i in 0..3 {
            broadcaster.publish(LedgerEvent::sale_deleted(format!("s-{i}")));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().sale_id(), "s-1");
        assert_eq!(rx.recv().await.unwrap().sale_id(), "s-2");
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let broadcaster = Broadcaster::new(0);
        let _rx = broadcaster.subscribe();
        assert_eq!(broadcaster.publish(LedgerEvent::sale_deleted("s-1")), 1);
    }
}
