//! Raw change notifications in their wire shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One notification from the change feed.
///
/// `new` carries the record for INSERT/UPDATE, `old` the identity for DELETE.
/// Records are untyped JSON with snake_case keys; they are normalized before use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawChangeEvent {
    pub event_type: ChangeKind,
    #[serde(default)]
    pub new: Option<Value>,
    #[serde(default)]
    pub old: Option<Value>,
}

impl RawChangeEvent {
    /// The invitation a notification belongs to, if the payload names one.
    pub fn invitation_id(&self) -> Option<&str> {
        let payload = match self.event_type {
            ChangeKind::Insert | ChangeKind::Update => self.new.as_ref(),
            ChangeKind::Delete => self.old.as_ref(),
        };
        payload?.get("invitation_id")?.as_str()
    }
}
