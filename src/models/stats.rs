//! Aggregate statistics derived from the response set.

use serde::{Deserialize, Serialize};

use super::GuestRecord;

/// Derived counts over one invitation's responses. Never patched in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub attending: u32,
    pub declined: u32,
    pub awaiting: u32,
    /// Sum of companion counts over attending entries
    pub total_guests: u64,
    pub with_dietary_notes: u32,
    pub with_music_suggestion: u32,
}

/// A bulk load of responses together with the store's precomputed stats.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadedResponses {
    pub responses: Vec<GuestRecord>,
    pub stats: AggregateStats,
}
