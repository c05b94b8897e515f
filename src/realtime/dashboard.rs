//! Host dashboard projection of an invitation's responses.
//!
//! A dashboard stream is one task owning a [`DashboardView`]: it subscribes, loads,
//! then applies notifications in arrival order and pushes a frame after every
//! applied change.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use super::feed::ChangeFeed;
use super::loader::load_initial;
use super::normalize::normalize;
use super::reconcile::{DiscardReason, Reconciliation, ResponseSet};
use super::stats::aggregate;
use super::subscription::{ChannelState, Connectivity, SubscriptionManager};
use crate::db::Repository;
use crate::models::{AggregateStats, GuestRecord, LoadedResponses, RawChangeEvent};

/// What the host UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardFrame {
    pub responses: Vec<GuestRecord>,
    pub stats: AggregateStats,
    pub connectivity: Connectivity,
}

#[derive(Debug)]
pub struct DashboardView {
    responses: ResponseSet,
    stats: AggregateStats,
    connectivity: Connectivity,
}

impl Default for DashboardView {
    fn default() -> Self {
        Self {
            responses: ResponseSet::default(),
            stats: AggregateStats::default(),
            connectivity: Connectivity::Disconnected,
        }
    }
}

impl DashboardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responses(&self) -> &[GuestRecord] {
        self.responses.records()
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    /// Install the initial load. A failed load (`None`) yields the empty state.
    pub fn load(&mut self, loaded: Option<LoadedResponses>) {
        let Some(loaded) = loaded else {
            self.responses = ResponseSet::default();
            self.stats = AggregateStats::default();
            return;
        };
        self.responses = ResponseSet::new(loaded.responses);
        self.stats = aggregate(self.responses.records());
        if self.stats != loaded.stats {
            tracing::debug!(
                loaded = ?loaded.stats,
                recomputed = ?self.stats,
                "Stored aggregates drifted from response set"
            );
        }
    }

    /// Normalize and apply one notification; stats are recomputed only when it applied.
    pub fn apply(&mut self, event: &RawChangeEvent) -> Reconciliation {
        let normalized = match normalize(event) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!("Dropping unusable change notification: {}", e);
                return Reconciliation::Discarded(DiscardReason::Malformed);
            }
        };
        let id = normalized.id().to_string();
        let outcome = self.responses.apply(normalized);
        match outcome {
            Reconciliation::Applied => {
                self.stats = aggregate(self.responses.records());
                tracing::debug!(%id, kind = ?event.event_type, responses = self.responses.records().len(), "Applied change");
            }
            Reconciliation::Discarded(reason) => {
                tracing::debug!(%id, ?reason, "Discarded change");
            }
        }
        outcome
    }

    /// Returns whether the indicator changed.
    pub fn set_connectivity(&mut self, connectivity: Connectivity) -> bool {
        let changed = self.connectivity != connectivity;
        self.connectivity = connectivity;
        changed
    }

    pub fn frame(&self) -> DashboardFrame {
        DashboardFrame {
            responses: self.responses().to_vec(),
            stats: self.stats(),
            connectivity: self.connectivity,
        }
    }
}

/// Drive one dashboard until `out` is dropped by the consumer.
pub async fn run_dashboard(
    invitation_id: String,
    repo: Arc<Repository>,
    feed: Option<ChangeFeed>,
    out: mpsc::Sender<DashboardFrame>,
) {
    // Subscribe before loading so nothing published during the load is missed;
    // overlap with the load is absorbed by id-based reconciliation.
    let mut subscription = SubscriptionManager::new(feed);
    subscription.open(&invitation_id);

    let mut view = DashboardView::new();
    view.load(load_initial(&repo, &invitation_id).await);
    view.set_connectivity(subscription.connectivity());
    if out.send(view.frame()).await.is_err() {
        return;
    }

    let mut live = subscription.state() == ChannelState::Connected;
    loop {
        tokio::select! {
            _ = out.closed() => break,
            event = subscription.next_event(), if live => match event {
                Some(event) => {
                    if view.apply(&event).is_applied() && out.send(view.frame()).await.is_err() {
                        break;
                    }
                }
                None => {
                    // No reconnect: the view keeps what it has and reports disconnected.
                    live = false;
                    if view.set_connectivity(subscription.connectivity())
                        && out.send(view.frame()).await.is_err()
                    {
                        break;
                    }
                }
            }
        }
    }

    subscription.close();
    tracing::debug!(%invitation_id, "Dashboard stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::ChangeKind;
    use crate::realtime::normalize_record;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn change(kind: ChangeKind, payload: Value) -> RawChangeEvent {
        match kind {
            ChangeKind::Delete => RawChangeEvent {
                event_type: kind,
                new: None,
                old: Some(payload),
            },
            _ => RawChangeEvent {
                event_type: kind,
                new: Some(payload),
                old: None,
            },
        }
    }

    #[test]
    fn test_insert_update_delete_scenario() {
        let mut view = DashboardView::new();
        view.load(Some(LoadedResponses::default()));

        view.apply(&change(
            ChangeKind::Insert,
            json!({ "id": "A", "attending": true, "companions": 2 }),
        ));
        assert_eq!(view.stats().total_guests, 2);

        view.apply(&change(
            ChangeKind::Update,
            json!({ "id": "A", "attending": true, "companions": 3 }),
        ));
        assert_eq!(view.stats().total_guests, 3);

        view.apply(&change(ChangeKind::Delete, json!({ "id": "A" })));
        assert!(view.responses().is_empty());
        assert_eq!(view.stats().total_guests, 0);
        assert_eq!(view.stats(), AggregateStats::default());
    }

    #[test]
    fn test_redelivered_insert_overlapping_load() {
        let loaded = normalize_record(json!({ "id": 1, "attending": true }).as_object().unwrap()).unwrap();
        let mut view = DashboardView::new();
        view.load(Some(LoadedResponses {
            stats: aggregate(std::slice::from_ref(&loaded)),
            responses: vec![loaded],
        }));

        let outcome = view.apply(&change(ChangeKind::Insert, json!({ "id": 1, "attending": true })));

        assert_eq!(outcome, Reconciliation::Discarded(DiscardReason::DuplicateInsert));
        assert_eq!(view.responses().len(), 1);
        assert_eq!(view.responses()[0].id, "1");
    }

    #[test]
    fn test_idempotent_insert() {
        let event = change(
            ChangeKind::Insert,
            json!({ "id": "g", "attending": false, "dietary_notes": "none" }),
        );
        let mut once = DashboardView::new();
        once.apply(&event);
        let mut twice = DashboardView::new();
        twice.apply(&event);
        twice.apply(&event);

        assert_eq!(once.frame(), twice.frame());
    }

    #[test]
    fn test_unknown_ids_leave_view_unchanged() {
        let mut view = DashboardView::new();
        view.apply(&change(ChangeKind::Insert, json!({ "id": "a", "attending": true, "companions": 1 })));
        let before = view.frame();

        view.apply(&change(ChangeKind::Update, json!({ "id": "missing", "attending": true, "companions": 9 })));
        view.apply(&change(ChangeKind::Delete, json!({ "id": "missing" })));

        assert_eq!(view.frame(), before);
    }

    #[test]
    fn test_stats_match_fresh_recomputation() {
        let mut view = DashboardView::new();
        let events = [
            change(ChangeKind::Insert, json!({ "id": "a", "attending": true, "companions": 2 })),
            change(ChangeKind::Insert, json!({ "id": "b", "attending": false, "music_suggestion": "x" })),
            change(ChangeKind::Insert, json!({ "id": "a", "attending": false })),
            change(ChangeKind::Update, json!({ "id": "b", "attending": true, "companions": 4 })),
            change(ChangeKind::Insert, json!({ "id": "c", "dietary_notes": "gluten" })),
            change(ChangeKind::Delete, json!({ "id": "a" })),
            change(ChangeKind::Update, json!({ "id": "z", "attending": true })),
            change(ChangeKind::Delete, json!({ "id": "a" })),
        ];

        for event in &events {
            view.apply(event);
            assert_eq!(view.stats(), aggregate(view.responses()));
        }
        assert_eq!(view.stats().total_guests, 4);
        assert_eq!(view.stats().awaiting, 1);
    }

    #[test]
    fn test_malformed_event_is_discarded() {
        let mut view = DashboardView::new();
        let outcome = view.apply(&change(ChangeKind::Insert, json!({ "name": "no id" })));

        assert_eq!(outcome, Reconciliation::Discarded(DiscardReason::Malformed));
        assert!(view.responses().is_empty());
    }

    #[test]
    fn test_failed_load_is_empty_state() {
        let mut view = DashboardView::new();
        view.apply(&change(ChangeKind::Insert, json!({ "id": "a" })));

        view.load(None);

        assert!(view.responses().is_empty());
        assert_eq!(view.stats(), AggregateStats::default());
    }

    async fn repository(dir: &TempDir) -> Arc<Repository> {
        let pool = init_database(&dir.path().join("dashboard.sqlite"))
            .await
            .unwrap();
        Arc::new(Repository::new(pool))
    }

    fn scoped_insert(id: &str) -> RawChangeEvent {
        change(
            ChangeKind::Insert,
            json!({ "id": id, "invitation_id": "inv-1", "attending": true }),
        )
    }

    #[tokio::test]
    async fn test_consumer_drop_closes_subscription() {
        let dir = TempDir::new().unwrap();
        let feed = ChangeFeed::new(8);
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(run_dashboard(
            "inv-1".to_string(),
            repository(&dir).await,
            Some(feed.clone()),
            tx,
        ));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.connectivity, Connectivity::Connected);
        assert_eq!(feed.publish(scoped_insert("a")), 1);
        assert_eq!(rx.recv().await.unwrap().responses.len(), 1);

        drop(rx);
        task.await.unwrap();

        assert_eq!(feed.publish(scoped_insert("b")), 0);
    }

    #[tokio::test]
    async fn test_lagged_feed_reports_disconnected() {
        let dir = TempDir::new().unwrap();
        let feed = ChangeFeed::new(2);
        let (tx, mut rx) = mpsc::channel(4);
        let task = tokio::spawn(run_dashboard(
            "inv-1".to_string(),
            repository(&dir).await,
            Some(feed.clone()),
            tx,
        ));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.connectivity, Connectivity::Connected);

        for i in 0..5 {
            feed.publish(scoped_insert(&i.to_string()));
        }

        let frame = rx.recv().await.unwrap();
        assert_eq!(serde_json::to_value(&frame).unwrap()["connectivity"], "disconnected");
        assert!(frame.responses.is_empty());
        // No reconnect: the channel was released and nothing else arrives.
        assert_eq!(feed.publish(scoped_insert("late")), 0);

        drop(rx);
        task.await.unwrap();
    }
}
