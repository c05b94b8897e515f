//! Recomputes aggregate statistics from the full response set.

use crate::models::{AggregateStats, GuestRecord};

/// Pure recomputation; called after every load and every applied event.
pub fn aggregate(records: &[GuestRecord]) -> AggregateStats {
    let mut stats = AggregateStats::default();
    for record in records {
        match record.attending {
            Some(true) => {
                stats.attending += 1;
                stats.total_guests += u64::from(record.companions);
            }
            Some(false) => stats.declined += 1,
            None => stats.awaiting += 1,
        }
        if !record.dietary_notes.trim().is_empty() {
            stats.with_dietary_notes += 1;
        }
        if !record.music_suggestion.trim().is_empty() {
            stats.with_music_suggestion += 1;
        }
    }
    stats
}
