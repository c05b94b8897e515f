//! Maps raw change notifications into canonical guest records.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::models::{ChangeKind, GuestRecord, RawChangeEvent};

/// A change notification after default-filling.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    Insert(GuestRecord),
    Update(GuestRecord),
    Delete { id: String },
}

impl NormalizedEvent {
    pub fn id(&self) -> &str {
        match self {
            NormalizedEvent::Insert(record) | NormalizedEvent::Update(record) => &record.id,
            NormalizedEvent::Delete { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// The payload the event kind requires is null or not an object.
    MissingPayload(ChangeKind),
    /// The payload has no usable `id`.
    MissingId,
}

impl fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizeError::MissingPayload(kind) => write!(f, "{:?} event without a record payload", kind),
            NormalizeError::MissingId => write!(f, "record payload without an id"),
        }
    }
}

impl std::error::Error for NormalizeError {}

pub fn normalize(event: &RawChangeEvent) -> Result<NormalizedEvent, NormalizeError> {
    match event.event_type {
        ChangeKind::Insert => Ok(NormalizedEvent::Insert(normalize_record(
            payload(&event.new, ChangeKind::Insert)?,
        )?)),
        ChangeKind::Update => Ok(NormalizedEvent::Update(normalize_record(
            payload(&event.new, ChangeKind::Update)?,
        )?)),
        ChangeKind::Delete => Ok(NormalizedEvent::Delete {
            id: record_id(payload(&event.old, ChangeKind::Delete)?)?,
        }),
    }
}

/// Default-fill one raw record.
pub fn normalize_record(raw: &Map<String, Value>) -> Result<GuestRecord, NormalizeError> {
    Ok(GuestRecord {
        id: record_id(raw)?,
        invitation_id: text(raw, "invitation_id"),
        name: text(raw, "name"),
        email: text(raw, "email"),
        phone: text(raw, "phone"),
        attending: attendance(raw),
        companions: companions(raw),
        dietary_notes: text(raw, "dietary_notes"),
        music_suggestion: text(raw, "music_suggestion"),
        message: text(raw, "message"),
        custom_answers: custom_answers(raw),
        created_at: text(raw, "created_at"),
    })
}

/// Inverse of [`normalize_record`]: the raw shape published on the change feed.
///
/// An unanswered record omits `attending`; an explicit null there is reserved for
/// legacy rows.
pub fn raw_record(record: &GuestRecord) -> Value {
    let mut raw = Map::new();
    raw.insert("id".into(), record.id.clone().into());
    raw.insert("invitation_id".into(), record.invitation_id.clone().into());
    raw.insert("name".into(), record.name.clone().into());
    raw.insert("email".into(), record.email.clone().into());
    raw.insert("phone".into(), record.phone.clone().into());
    if let Some(attending) = record.attending {
        raw.insert("attending".into(), attending.into());
    }
    raw.insert("companions".into(), record.companions.into());
    raw.insert("dietary_notes".into(), record.dietary_notes.clone().into());
    raw.insert("music_suggestion".into(), record.music_suggestion.clone().into());
    raw.insert("message".into(), record.message.clone().into());
    raw.insert(
        "custom_answers".into(),
        Value::Object(
            record
                .custom_answers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        ),
    );
    raw.insert("created_at".into(), record.created_at.clone().into());
    Value::Object(raw)
}

fn payload(value: &Option<Value>, kind: ChangeKind) -> Result<&Map<String, Value>, NormalizeError> {
    value
        .as_ref()
        .and_then(Value::as_object)
        .ok_or(NormalizeError::MissingPayload(kind))
}

fn record_id(raw: &Map<String, Value>) -> Result<String, NormalizeError> {
    match raw.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(NormalizeError::MissingId),
    }
}

fn text(raw: &Map<String, Value>, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

// Legacy rows stored "attending" as an explicit null; those count as attending.
// An absent key is an unanswered response. Do not extend this to other fields.
fn attendance(raw: &Map<String, Value>) -> Option<bool> {
    match raw.get("attending") {
        None => None,
        Some(Value::Null) => Some(true),
        Some(Value::Bool(b)) => Some(*b),
        Some(other) => {
            tracing::debug!("Unrecognised attendance value {}, treating as unanswered", other);
            None
        }
    }
}

fn companions(raw: &Map<String, Value>) -> u32 {
    let count = match raw.get("companions") {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    count.unwrap_or(0).clamp(0, u32::MAX as i64) as u32
}

fn custom_answers(raw: &Map<String, Value>) -> BTreeMap<String, String> {
    let Some(Value::Object(answers)) = raw.get("custom_answers") else {
        return BTreeMap::new();
    };
    answers
        .iter()
        .filter_map(|(question, answer)| match answer {
            Value::Null => None,
            Value::String(s) => Some((question.clone(), s.clone())),
            other => Some((question.clone(), other.to_string())),
        })
        .collect()
}
