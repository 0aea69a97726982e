//! Change notification bus.
//!
//! The browser original synchronized tabs through the `storage` event: every
//! write to a shared key woke the other tabs, which re-read the record. This
//! is the explicit version of that mechanism: stores publish a notice after
//! each persisted write, and any number of subscribers (WebSocket watchers,
//! tests) receive it. Delivery is fire-and-forget; a lagging subscriber
//! drops notices rather than blocking writers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Which record kind changed for a company.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Queue,
    Profile,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChangeNotice {
    pub company_id: String,
    pub kind: RecordKind,
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ChangeNotice>,
}

impl EventBus {
    pub fn new() -> Self {
        // Small ring buffer; watchers that fall further behind miss notices,
        // same as a tab that was closed during a storage event.
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }

    /// Publish a change for `company_id`. Having no subscribers is normal.
    pub fn publish(&self, company_id: &str, kind: RecordKind) {
        let _ = self.tx.send(ChangeNotice {
            company_id: company_id.to_string(),
            kind,
        });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_notices() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish("acme", RecordKind::Queue);
        bus.publish("acme", RecordKind::Profile);

        assert_eq!(
            rx.recv().await.unwrap(),
            ChangeNotice {
                company_id: "acme".to_string(),
                kind: RecordKind::Queue
            }
        );
        assert_eq!(rx.recv().await.unwrap().kind, RecordKind::Profile);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        bus.publish("acme", RecordKind::Queue);
    }
}
