//! Editor input and the canonical preview snapshot.
//!
//! `EditorFields` mirrors what the wizard posts: every field may be missing.
//! `Snapshot` is the fully-defaulted document the render surface consumes.

use serde::{Deserialize, Serialize};

/// Raw wizard state as posted by the editor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorFields {
    #[serde(default)]
    pub skin: Option<String>,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub partner_one: Option<String>,
    #[serde(default)]
    pub partner_two: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub welcome_message: Option<String>,
    #[serde(default)]
    pub hero_image: Option<String>,
    #[serde(default)]
    pub gallery_images: Option<Vec<String>>,
    #[serde(default)]
    pub schedule: Option<Vec<ScheduleEntryFields>>,
    #[serde(default)]
    pub venues: Option<Vec<VenueFields>>,
    #[serde(default)]
    pub features: Option<FeatureFields>,
    #[serde(default)]
    pub rsvp: Option<RsvpFields>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntryFields {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueFields {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub map_url: Option<String>,
    #[serde(default)]
    pub starts_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFields {
    #[serde(default)]
    pub countdown: Option<bool>,
    #[serde(default)]
    pub gallery: Option<bool>,
    #[serde(default)]
    pub schedule: Option<bool>,
    #[serde(default)]
    pub venues: Option<bool>,
    #[serde(default)]
    pub rsvp: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpFields {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub allow_companions: Option<bool>,
    #[serde(default)]
    pub max_companions: Option<u32>,
    #[serde(default)]
    pub ask_dietary: Option<bool>,
    #[serde(default)]
    pub ask_music: Option<bool>,
    #[serde(default)]
    pub custom_questions: Option<Vec<String>>,
}

/// One immutable, self-contained rendition of an invitation being edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub invitation_id: String,
    pub skin: String,
    pub headline: String,
    pub couple: Couple,
    pub event_date: String,
    pub welcome_message: String,
    pub hero_image: String,
    pub gallery_images: Vec<String>,
    pub schedule: Vec<ScheduleEntry>,
    pub venues: Vec<Venue>,
    pub features: FeatureFlags,
    pub rsvp: RsvpSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Couple {
    pub partner_one: String,
    pub partner_two: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub time: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Venue {
    pub kind: String,
    pub name: String,
    pub address: String,
    pub map_url: String,
    pub starts_at: String,
}

/// Which sections of the page are visible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFlags {
    pub countdown: bool,
    pub gallery: bool,
    pub schedule: bool,
    pub venues: bool,
    pub rsvp: bool,
}

/// Response-collection configuration shown on the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsvpSettings {
    pub enabled: bool,
    pub deadline: String,
    pub allow_companions: bool,
    pub max_companions: u32,
    pub ask_dietary: bool,
    pub ask_music: bool,
    pub custom_questions: Vec<String>,
}
