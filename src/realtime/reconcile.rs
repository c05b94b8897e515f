//! Applies normalized events to the ordered response set.
//!
//! Events are applied one at a time in arrival order. Identity is the only key:
//! duplicate inserts and updates/deletes for unknown ids are discarded, which is
//! what lets the set tolerate redelivery and overlap with the initial load.

use super::normalize::NormalizedEvent;
use crate::models::GuestRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    Applied,
    Discarded(DiscardReason),
}

impl Reconciliation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Reconciliation::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The notification could not be normalized.
    Malformed,
    DuplicateInsert,
    UnknownUpdate,
    UnknownDelete,
}

/// Guest records, most recent first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSet {
    records: Vec<GuestRecord>,
}

impl ResponseSet {
    pub fn new(records: Vec<GuestRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[GuestRecord] {
        &self.records
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn apply(&mut self, event: NormalizedEvent) -> Reconciliation {
        match event {
            NormalizedEvent::Insert(record) => {
                if self.position(&record.id).is_some() {
                    Reconciliation::Discarded(DiscardReason::DuplicateInsert)
                } else {
                    self.records.insert(0, record);
                    Reconciliation::Applied
                }
            }
            NormalizedEvent::Update(record) => match self.position(&record.id) {
                Some(index) => {
                    self.records[index] = record;
                    Reconciliation::Applied
                }
                None => {
                    tracing::debug!(id = %record.id, "Discarding update for unknown response");
                    Reconciliation::Discarded(DiscardReason::UnknownUpdate)
                }
            },
            NormalizedEvent::Delete { id } => match self.position(&id) {
                Some(index) => {
                    self.records.remove(index);
                    Reconciliation::Applied
                }
                None => {
                    tracing::debug!(%id, "Discarding delete for unknown response");
                    Reconciliation::Discarded(DiscardReason::UnknownDelete)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::normalize_record;
    use serde_json::json;

    fn record(id: &str, name: &str) -> GuestRecord {
        normalize_record(json!({ "id": id, "name": name }).as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_insert_prepends_and_dedups() {
        let mut set = ResponseSet::default();

        assert!(set.apply(NormalizedEvent::Insert(record("a", "Ana"))).is_applied());
        assert!(set.apply(NormalizedEvent::Insert(record("b", "Ben"))).is_applied());
        let before = set.clone();
        assert_eq!(
            set.apply(NormalizedEvent::Insert(record("a", "Ana again"))),
            Reconciliation::Discarded(DiscardReason::DuplicateInsert)
        );

        assert_eq!(set, before);
        let ids: Vec<_> = set.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut set = ResponseSet::new(vec![record("a", "Ana"), record("b", "Ben"), record("c", "Cy")]);

        assert!(set.apply(NormalizedEvent::Update(record("b", "Benjamin"))).is_applied());

        assert_eq!(set.records()[1].name, "Benjamin");
        assert_eq!(set.records().len(), 3);
    }

    #[test]
    fn test_unknown_ids_are_noops() {
        let mut set = ResponseSet::new(vec![record("a", "Ana")]);
        let before = set.clone();

        assert_eq!(
            set.apply(NormalizedEvent::Update(record("zz", "Ghost"))),
            Reconciliation::Discarded(DiscardReason::UnknownUpdate)
        );
        assert_eq!(
            set.apply(NormalizedEvent::Delete { id: "zz".to_string() }),
            Reconciliation::Discarded(DiscardReason::UnknownDelete)
        );
        assert_eq!(set, before);
    }

    #[test]
    fn test_delete_removes() {
        let mut set = ResponseSet::new(vec![record("a", "Ana"), record("b", "Ben")]);

        assert!(set.apply(NormalizedEvent::Delete { id: "a".to_string() }).is_applied());

        assert_eq!(set.records().len(), 1);
        assert_eq!(set.records()[0].id, "b");
    }
}
