//! Guest response endpoints.
//!
//! Every successful mutation is also published on the change feed.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{GuestRecord, LoadedResponses, SubmitResponseRequest, UpdateResponseRequest};
use crate::realtime::load_initial;
use crate::AppState;

/// GET /api/invitations/:id/responses - Bulk load responses and aggregates.
///
/// A failed load is reported as the empty state, same as an invitation with no responses.
pub async fn list_responses(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
) -> ApiResult<LoadedResponses> {
    let loaded = load_initial(&state.repo, &invitation_id)
        .await
        .unwrap_or_default();
    success(loaded)
}

/// POST /api/invitations/:id/responses - A guest submits a response.
pub async fn submit_response(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
    Json(request): Json<SubmitResponseRequest>,
) -> ApiResult<GuestRecord> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }

    let record = state.repo.create_response(&invitation_id, &request).await?;
    if let Some(feed) = &state.feed {
        let receivers = feed.publish_insert(&record);
        tracing::debug!(id = %record.id, receivers, "Published response insert");
    }
    success(record)
}

/// PUT /api/responses/:id - A host edits a response.
pub async fn update_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateResponseRequest>,
) -> ApiResult<GuestRecord> {
    if matches!(&request.name, Some(name) if name.trim().is_empty()) {
        return Err(AppError::Validation("Name cannot be blank".to_string()));
    }

    let record = state.repo.update_response(&id, &request).await?;
    if let Some(feed) = &state.feed {
        feed.publish_update(&record);
    }
    success(record)
}

/// DELETE /api/responses/:id - A host removes a response.
pub async fn delete_response(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let record = state.repo.delete_response(&id).await?;
    if let Some(feed) = &state.feed {
        feed.publish_delete(&record);
    }
    success(())
}
