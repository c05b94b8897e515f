//! Long-lived notification channel scoped to one invitation.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};

use super::feed::ChangeFeed;
use crate::models::RawChangeEvent;

/// Internal channel state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No notification mechanism is configured; no channel was opened.
    Unavailable,
    Disconnected,
    Connecting,
    Connected,
}

/// The two-valued indicator shown to hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Connected,
    Disconnected,
}

impl From<ChannelState> for Connectivity {
    fn from(state: ChannelState) -> Self {
        match state {
            ChannelState::Connected => Connectivity::Connected,
            _ => Connectivity::Disconnected,
        }
    }
}

pub struct SubscriptionManager {
    feed: Option<ChangeFeed>,
    state: ChannelState,
    scope: Option<String>,
    receiver: Option<broadcast::Receiver<RawChangeEvent>>,
}

impl SubscriptionManager {
    pub fn new(feed: Option<ChangeFeed>) -> Self {
        let state = if feed.is_some() {
            ChannelState::Disconnected
        } else {
            ChannelState::Unavailable
        };
        Self {
            feed,
            state,
            scope: None,
            receiver: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn connectivity(&self) -> Connectivity {
        self.state.into()
    }

    /// Open the channel for `invitation_id`, closing any previous one.
    pub fn open(&mut self, invitation_id: &str) -> ChannelState {
        let Some(feed) = self.feed.as_ref() else {
            tracing::info!(invitation_id, "Realtime feed not configured, relying on initial load");
            return ChannelState::Unavailable;
        };
        let receiver = feed.subscribe();
        self.close();

        self.state = ChannelState::Connecting;
        tracing::debug!(invitation_id, "Opening response subscription");
        self.scope = Some(invitation_id.to_string());
        self.receiver = Some(receiver);
        self.state = ChannelState::Connected;
        self.state
    }

    /// Next notification for the scoped invitation.
    ///
    /// Returns `None` once the channel is closed or fails; the state is then
    /// `Disconnected` (or `Unavailable`) and stays so.
    pub async fn next_event(&mut self) -> Option<RawChangeEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(event) => {
                    if self.in_scope(&event) {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        scope = ?self.scope,
                        skipped,
                        "Response subscription lagged, disconnecting"
                    );
                    self.fail();
                    return None;
                }
                Err(RecvError::Closed) => {
                    tracing::warn!(scope = ?self.scope, "Response subscription closed");
                    self.fail();
                    return None;
                }
            }
        }
    }

    /// Release the channel.
    pub fn close(&mut self) {
        if self.receiver.take().is_some() {
            tracing::debug!(scope = ?self.scope, "Response subscription released");
        }
        self.scope = None;
        if self.state != ChannelState::Unavailable {
            self.state = ChannelState::Disconnected;
        }
    }

    fn fail(&mut self) {
        self.receiver = None;
        self.state = ChannelState::Disconnected;
    }

    // Deletes may carry only the record id; those pass and are resolved by id.
    fn in_scope(&self, event: &RawChangeEvent) -> bool {
        match (event.invitation_id(), self.scope.as_deref()) {
            (Some(owner), Some(scope)) => owner == scope,
            (None, Some(_)) => true,
            (_, None) => false,
        }
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.close();
    }
}
