//! Process-wide change feed.
//!
//! Stands in for the store's notification mechanism: every response mutation and
//! every externally ingested notification is broadcast to all subscribers.

use tokio::sync::broadcast;

use super::normalize::raw_record;
use crate::models::{ChangeKind, GuestRecord, RawChangeEvent};

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<RawChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RawChangeEvent> {
        self.sender.subscribe()
    }

    /// Broadcast one notification. Returns how many subscribers received it.
    pub fn publish(&self, event: RawChangeEvent) -> usize {
        // No subscribers is not an error; nobody is watching.
        self.sender.send(event).unwrap_or(0)
    }

    pub fn publish_insert(&self, record: &GuestRecord) -> usize {
        self.publish(RawChangeEvent {
            event_type: ChangeKind::Insert,
            new: Some(raw_record(record)),
            old: None,
        })
    }

    pub fn publish_update(&self, record: &GuestRecord) -> usize {
        self.publish(RawChangeEvent {
            event_type: ChangeKind::Update,
            new: Some(raw_record(record)),
            old: None,
        })
    }

    pub fn publish_delete(&self, record: &GuestRecord) -> usize {
        self.publish(RawChangeEvent {
            event_type: ChangeKind::Delete,
            new: None,
            old: Some(serde_json::json!({
                "id": record.id,
                "invitation_id": record.invitation_id,
            })),
        })
    }
}
