//! One-shot bulk load of an invitation's responses.

use crate::db::Repository;
use crate::models::LoadedResponses;

/// Fetch the current responses and the store's aggregates.
///
/// Returns `None` on failure; callers show the empty state and do not retry.
pub async fn load_initial(repo: &Repository, invitation_id: &str) -> Option<LoadedResponses> {
    let responses = match repo.list_responses(invitation_id).await {
        Ok(responses) => responses,
        Err(e) => {
            tracing::warn!(invitation_id, "Initial response load failed: {}", e);
            return None;
        }
    };
    let stats = match repo.response_stats(invitation_id).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(invitation_id, "Initial stats load failed: {}", e);
            return None;
        }
    };
    Some(LoadedResponses { responses, stats })
}
