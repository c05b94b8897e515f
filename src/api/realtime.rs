//! Ingestion of change notifications from an external store.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::RawChangeEvent;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IngestReceipt {
    pub receivers: usize,
}

/// POST /api/realtime/events - Broadcast one raw notification to subscribers.
///
/// Delivery is at-least-once and unordered; dashboards deduplicate by id.
pub async fn ingest_event(
    State(state): State<AppState>,
    Json(event): Json<RawChangeEvent>,
) -> ApiResult<IngestReceipt> {
    let Some(feed) = &state.feed else {
        return Err(AppError::Unavailable(
            "Realtime notifications are disabled".to_string(),
        ));
    };
    let receivers = feed.publish(event);
    success(IngestReceipt { receivers })
}
