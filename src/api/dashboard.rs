//! Host dashboard stream.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};

use crate::realtime::{run_dashboard, DashboardFrame};
use crate::AppState;

const FRAME_BUFFER: usize = 32;

/// GET /api/invitations/:id/dashboard - Live responses and stats (SSE).
///
/// The first frame is the initial load; each later frame follows an applied change.
/// Dropping the connection tears down the subscription.
pub async fn dashboard_stream(
    State(state): State<AppState>,
    Path(invitation_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel(FRAME_BUFFER);
    tokio::spawn(run_dashboard(
        invitation_id,
        state.repo.clone(),
        state.feed.clone(),
        tx,
    ));

    let stream = ReceiverStream::new(rx).map(|frame| Ok(frame_event(&frame)));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn frame_event(frame: &DashboardFrame) -> Event {
    match serde_json::to_string(frame) {
        Ok(body) => Event::default().event("frame").data(body),
        Err(e) => {
            tracing::error!("Failed to encode dashboard frame: {}", e);
            Event::default().comment("encode error")
        }
    }
}
