//! Guest response models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One guest response as held by the dashboard.
///
/// `id` is the only reconciliation key; every other field is replaced in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestRecord {
    pub id: String,
    pub invitation_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// `Some(true)` attending, `Some(false)` declined, `None` not answered yet
    pub attending: Option<bool>,
    pub companions: u32,
    pub dietary_notes: String,
    pub music_suggestion: String,
    pub message: String,
    pub custom_answers: BTreeMap<String, String>,
    pub created_at: String,
}

/// Request body for a guest submitting a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub attending: Option<bool>,
    #[serde(default)]
    pub companions: Option<u32>,
    #[serde(default)]
    pub dietary_notes: Option<String>,
    #[serde(default)]
    pub music_suggestion: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub custom_answers: Option<BTreeMap<String, String>>,
}

/// Request body for a host editing an existing response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResponseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub attending: Option<bool>,
    /// Resets the answer to "not answered yet"
    #[serde(default)]
    pub clear_attending: bool,
    #[serde(default)]
    pub companions: Option<u32>,
    #[serde(default)]
    pub dietary_notes: Option<String>,
    #[serde(default)]
    pub music_suggestion: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub custom_answers: Option<BTreeMap<String, String>>,
}
