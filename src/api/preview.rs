//! Live preview endpoints for the editor and the render surface.

use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use serde::Deserialize;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::EditorFields;
use crate::preview::{HandshakeOutcome, PreviewFrame, SurfaceMessage, SurfaceOutput};
use crate::AppState;

/// PUT /api/invitations/:id/draft - Editor reports the current field values.
pub async fn put_draft(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
    Json(fields): Json<EditorFields>,
) -> ApiResult<()> {
    state.previews.edit(&invitation_id, fields).await;
    success(())
}

/// GET /api/invitations/:id/preview - Current preview frame.
pub async fn get_preview(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
) -> ApiResult<PreviewFrame> {
    success(state.previews.frame(&invitation_id).await?)
}

/// DELETE /api/invitations/:id/preview - Editor closed.
pub async fn close_preview(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
) -> ApiResult<()> {
    if !state.previews.close(&invitation_id).await {
        return Err(AppError::NotFound(format!(
            "No preview session for {}",
            invitation_id
        )));
    }
    success(())
}

/// GET /api/invitations/:id/preview/surface - Render surface channel (SSE).
pub async fn surface_channel(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let (generation, outbox) = state.previews.attach(&invitation_id).await?;
    tracing::info!(%invitation_id, generation, "Render surface connected");

    let stream = ReceiverStream::new(outbox).map(|output| Ok(surface_event(output)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Every surface message names the surface lifetime it was sent from.
#[derive(Debug, Deserialize)]
pub struct SurfaceQuery {
    pub generation: u64,
}

/// POST /api/invitations/:id/preview/surface/messages - Render surface message.
pub async fn surface_message(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
    Query(query): Query<SurfaceQuery>,
    Json(message): Json<SurfaceMessage>,
) -> ApiResult<HandshakeOutcome> {
    let outcome = state
        .previews
        .message(&invitation_id, query.generation, message)
        .await?;
    success(outcome)
}

fn surface_event(output: SurfaceOutput) -> Event {
    match output {
        SurfaceOutput::Navigate {
            generation,
            address,
        } => Event::default()
            .event("navigate")
            .data(serde_json::json!({ "generation": generation, "address": address }).to_string()),
        SurfaceOutput::Message(message) => match serde_json::to_string(&message) {
            Ok(body) => Event::default().event("message").data(body),
            Err(e) => {
                tracing::error!("Failed to encode surface message: {}", e);
                Event::default().comment("encode error")
            }
        },
    }
}
