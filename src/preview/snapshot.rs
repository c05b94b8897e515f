//! Builds the canonical snapshot from raw editor fields.
//!
//! Every optional field resolves to an explicit value here so nothing downstream
//! has to tell "missing" apart from "empty".

use crate::models::{
    Couple, EditorFields, FeatureFlags, RsvpSettings, ScheduleEntry, Snapshot, Venue,
};

pub const DEFAULT_SKIN: &str = "classic";
pub const DEFAULT_HEADLINE: &str = "We're getting married!";
pub const DEFAULT_MAX_COMPANIONS: u32 = 4;

/// Build a snapshot for `invitation_id` from the current editor state.
pub fn build_snapshot(invitation_id: &str, fields: &EditorFields) -> Snapshot {
    let features = fields.features.clone().unwrap_or_default();
    let rsvp = fields.rsvp.clone().unwrap_or_default();

    Snapshot {
        invitation_id: invitation_id.to_string(),
        skin: named(&fields.skin, DEFAULT_SKIN),
        headline: named(&fields.headline, DEFAULT_HEADLINE),
        couple: Couple {
            partner_one: text(&fields.partner_one),
            partner_two: text(&fields.partner_two),
        },
        event_date: text(&fields.event_date),
        welcome_message: text(&fields.welcome_message),
        hero_image: text(&fields.hero_image),
        gallery_images: fields.gallery_images.clone().unwrap_or_default(),
        schedule: fields
            .schedule
            .iter()
            .flatten()
            .map(|entry| ScheduleEntry {
                time: text(&entry.time),
                title: text(&entry.title),
                description: text(&entry.description),
            })
            .collect(),
        venues: fields
            .venues
            .iter()
            .flatten()
            .map(|venue| Venue {
                kind: text(&venue.kind),
                name: text(&venue.name),
                address: text(&venue.address),
                map_url: text(&venue.map_url),
                starts_at: text(&venue.starts_at),
            })
            .collect(),
        features: FeatureFlags {
            countdown: features.countdown.unwrap_or(true),
            gallery: features.gallery.unwrap_or(true),
            schedule: features.schedule.unwrap_or(true),
            venues: features.venues.unwrap_or(true),
            rsvp: features.rsvp.unwrap_or(true),
        },
        rsvp: RsvpSettings {
            enabled: rsvp.enabled.unwrap_or(true),
            deadline: text(&rsvp.deadline),
            allow_companions: rsvp.allow_companions.unwrap_or(true),
            max_companions: rsvp.max_companions.unwrap_or(DEFAULT_MAX_COMPANIONS),
            ask_dietary: rsvp.ask_dietary.unwrap_or(true),
            ask_music: rsvp.ask_music.unwrap_or(false),
            custom_questions: rsvp.custom_questions.unwrap_or_default(),
        },
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Blank values fall back too, so a cleared headline never renders empty.
fn named(value: &Option<String>, fallback: &str) -> String {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}
