//! Chooses how a snapshot reaches the render surface.
//!
//! Small snapshots travel whole inside the preview address. Large ones travel
//! redacted inside the address and whole over the message channel after the
//! surface reports ready.

use serde_json::Value;
use url::Url;

use crate::errors::AppError;
use crate::models::Snapshot;

/// Replaces large field values in a redacted inline payload.
pub const REDACTION_SENTINEL: &str = "__OUT_OF_BAND__";

/// Snapshot fields that are withheld from a redacted inline payload.
pub const OUT_OF_BAND_FIELDS: [&str; 4] = ["heroImage", "galleryImages", "schedule", "venues"];

/// Query parameter carrying the inline payload.
pub const DATA_PARAM: &str = "data";

/// Outcome of one channel decision.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferPlan {
    /// Navigable address carrying the full or redacted payload
    pub address: String,
    /// Full snapshot to deliver over the message channel, when redacted
    pub held: Option<Snapshot>,
    /// Character length of the full serialized snapshot
    pub serialized_len: usize,
}

impl TransferPlan {
    pub fn is_redacted(&self) -> bool {
        self.held.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct ChannelSelector {
    base_url: Url,
    threshold: usize,
}

impl ChannelSelector {
    pub fn new(base_url: Url, threshold: usize) -> Self {
        Self {
            base_url,
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Decide the transfer strategy for one snapshot.
    pub fn select(&self, snapshot: &Snapshot) -> Result<TransferPlan, AppError> {
        let serialized = serde_json::to_string(snapshot)?;
        let serialized_len = serialized.chars().count();

        if serialized_len < self.threshold {
            return Ok(TransferPlan {
                address: self.address(&snapshot.invitation_id, &serialized),
                held: None,
                serialized_len,
            });
        }

        let redacted = serde_json::to_string(&redact(snapshot)?)?;
        tracing::debug!(
            invitation_id = %snapshot.invitation_id,
            serialized_len,
            redacted_len = redacted.chars().count(),
            "Snapshot exceeds inline limit, holding full payload for message delivery"
        );

        Ok(TransferPlan {
            address: self.address(&snapshot.invitation_id, &redacted),
            held: Some(snapshot.clone()),
            serialized_len,
        })
    }

    fn address(&self, invitation_id: &str, payload: &str) -> String {
        let mut url = self.base_url.clone();
        let path = format!("{}/preview/{}", url.path().trim_end_matches('/'), invitation_id);
        url.set_path(&path);
        url.query_pairs_mut().clear().append_pair(DATA_PARAM, payload);
        url.into()
    }
}

/// The snapshot as JSON with every out-of-band field replaced by the sentinel.
pub fn redact(snapshot: &Snapshot) -> Result<Value, AppError> {
    let mut value = serde_json::to_value(snapshot)?;
    if let Value::Object(map) = &mut value {
        for field in OUT_OF_BAND_FIELDS {
            if let Some(slot) = map.get_mut(field) {
                *slot = Value::String(REDACTION_SENTINEL.to_string());
            }
        }
    }
    Ok(value)
}
