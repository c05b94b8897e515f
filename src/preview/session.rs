//! Per-invitation preview sessions.
//!
//! Each session is one task that exclusively owns a [`DebounceScheduler`] and a
//! [`PreviewBridge`]. Editors and render surfaces talk to it through commands.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{sleep_until, Instant};

use super::bridge::{HandshakeOutcome, PreviewBridge, SurfaceMessage, SurfaceOutput};
use super::channel::ChannelSelector;
use super::debounce::DebounceScheduler;
use super::snapshot::build_snapshot;
use crate::errors::AppError;
use crate::models::{EditorFields, Snapshot};

const COMMAND_BUFFER: usize = 64;
const SURFACE_BUFFER: usize = 16;

/// What the editor can see of a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    pub invitation_id: String,
    pub generation: u64,
    pub address: String,
    pub out_of_band_pending: bool,
    pub serialized_len: usize,
    pub emissions: u64,
    pub surface_attached: bool,
    pub snapshot: Option<Snapshot>,
}

enum PreviewCommand {
    Edit(EditorFields),
    Attach {
        reply: oneshot::Sender<(u64, mpsc::Receiver<SurfaceOutput>)>,
    },
    Message {
        generation: u64,
        message: SurfaceMessage,
        reply: oneshot::Sender<HandshakeOutcome>,
    },
    Frame {
        reply: oneshot::Sender<PreviewFrame>,
    },
}

struct PreviewSession {
    invitation_id: String,
    idle: Duration,
    selector: ChannelSelector,
    scheduler: DebounceScheduler<EditorFields>,
    bridge: PreviewBridge,
    latest: Option<Snapshot>,
    emissions: u64,
}

impl PreviewSession {
    async fn run(mut self, initial: EditorFields, mut commands: mpsc::Receiver<PreviewCommand>) {
        if let Some(fields) = self.scheduler.mount(initial) {
            self.emit(fields);
        }

        let mut last_activity = Instant::now();
        loop {
            let deadline = self.scheduler.deadline();
            let evictable = !self.bridge.is_attached() && !self.scheduler.is_pending();
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        last_activity = Instant::now();
                        self.handle(command);
                    }
                    None => break,
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some(fields) = self.scheduler.poll_ready(Instant::now()) {
                        self.emit(fields);
                    }
                }
                _ = self.bridge.surface_closed(), if self.bridge.is_attached() => {
                    self.bridge.detach();
                    last_activity = Instant::now();
                }
                _ = sleep_until(last_activity + self.idle), if evictable => {
                    tracing::info!(
                        invitation_id = %self.invitation_id,
                        idle = ?self.idle,
                        "Closing idle preview session"
                    );
                    break;
                }
            }
        }

        let dropped_pending = self.scheduler.is_pending();
        self.scheduler.teardown();
        self.bridge.detach();
        tracing::debug!(
            invitation_id = %self.invitation_id,
            dropped_pending,
            "Preview session closed"
        );
    }

    fn handle(&mut self, command: PreviewCommand) {
        match command {
            PreviewCommand::Edit(fields) => self.scheduler.signal(fields, Instant::now()),
            PreviewCommand::Attach { reply } => {
                let (tx, rx) = mpsc::channel(SURFACE_BUFFER);
                let generation = self.bridge.attach(tx);
                if reply.send((generation, rx)).is_err() {
                    self.bridge.detach();
                }
            }
            PreviewCommand::Message {
                generation,
                message,
                reply,
            } => {
                let outcome = self.bridge.on_message(generation, message);
                let _ = reply.send(outcome);
            }
            PreviewCommand::Frame { reply } => {
                let _ = reply.send(self.frame());
            }
        }
    }

    fn emit(&mut self, fields: EditorFields) {
        let snapshot = build_snapshot(&self.invitation_id, &fields);
        match self.selector.select(&snapshot) {
            Ok(plan) => {
                self.emissions += 1;
                tracing::debug!(
                    invitation_id = %self.invitation_id,
                    emission = self.emissions,
                    serialized_len = plan.serialized_len,
                    inline_limit = self.selector.threshold(),
                    redacted = plan.is_redacted(),
                    "Snapshot ready"
                );
                self.bridge.publish(plan);
                self.latest = Some(snapshot);
            }
            Err(e) => {
                tracing::error!(invitation_id = %self.invitation_id, "Failed to plan snapshot transfer: {}", e);
            }
        }
    }

    fn frame(&self) -> PreviewFrame {
        let plan = self.bridge.current();
        PreviewFrame {
            invitation_id: self.invitation_id.clone(),
            generation: self.bridge.generation(),
            address: plan.map(|p| p.address.clone()).unwrap_or_default(),
            out_of_band_pending: plan.is_some_and(|p| p.is_redacted()),
            serialized_len: plan.map(|p| p.serialized_len).unwrap_or(0),
            emissions: self.emissions,
            surface_attached: self.bridge.is_attached(),
            snapshot: self.latest.clone(),
        }
    }
}

/// Live preview sessions keyed by invitation id.
///
/// A session with no attached surface and no pending emission closes itself after
/// `idle` without commands; its entry is pruned on the next call that finds it closed.
pub struct PreviewRegistry {
    sessions: RwLock<HashMap<String, mpsc::Sender<PreviewCommand>>>,
    selector: ChannelSelector,
    window: Duration,
    idle: Duration,
}

impl PreviewRegistry {
    pub fn new(selector: ChannelSelector, window: Duration, idle: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            selector,
            window,
            idle,
        }
    }

    /// Signal an edit. The first edit for an invitation mounts its session and is
    /// emitted immediately; later edits are debounced.
    pub async fn edit(&self, invitation_id: &str, fields: EditorFields) {
        let existing = self.sessions.read().await.get(invitation_id).cloned();
        let fields = match existing {
            Some(tx) => match tx.send(PreviewCommand::Edit(fields)).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(command)) => {
                    tracing::debug!(invitation_id, "Preview session had stopped, remounting");
                    let PreviewCommand::Edit(fields) = command else {
                        return;
                    };
                    fields
                }
            },
            None => fields,
        };

        let mut sessions = self.sessions.write().await;
        // Another edit may have mounted the session while the lock was released.
        if let Some(tx) = sessions.get(invitation_id).filter(|tx| !tx.is_closed()).cloned() {
            drop(sessions);
            if tx.send(PreviewCommand::Edit(fields)).await.is_err() {
                tracing::warn!(invitation_id, "Dropped edit for a preview session that just closed");
            }
            return;
        }
        sessions.insert(invitation_id.to_string(), self.spawn(invitation_id, fields));
    }

    /// Attach a render surface; returns its generation and outbox.
    pub async fn attach(
        &self,
        invitation_id: &str,
    ) -> Result<(u64, mpsc::Receiver<SurfaceOutput>), AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(invitation_id, PreviewCommand::Attach { reply }).await?;
        rx.await.map_err(|_| closed(invitation_id))
    }

    pub async fn message(
        &self,
        invitation_id: &str,
        generation: u64,
        message: SurfaceMessage,
    ) -> Result<HandshakeOutcome, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(
            invitation_id,
            PreviewCommand::Message {
                generation,
                message,
                reply,
            },
        )
        .await?;
        rx.await.map_err(|_| closed(invitation_id))
    }

    pub async fn frame(&self, invitation_id: &str) -> Result<PreviewFrame, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(invitation_id, PreviewCommand::Frame { reply }).await?;
        rx.await.map_err(|_| closed(invitation_id))
    }

    /// Tear the session down. Pending emissions are cancelled and the surface detached.
    pub async fn close(&self, invitation_id: &str) -> bool {
        self.sessions
            .write()
            .await
            .remove(invitation_id)
            .is_some_and(|tx| !tx.is_closed())
    }

    fn spawn(&self, invitation_id: &str, initial: EditorFields) -> mpsc::Sender<PreviewCommand> {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let session = PreviewSession {
            invitation_id: invitation_id.to_string(),
            idle: self.idle,
            selector: self.selector.clone(),
            scheduler: DebounceScheduler::new(self.window),
            bridge: PreviewBridge::new(),
            latest: None,
            emissions: 0,
        };
        tracing::debug!(invitation_id, "Preview session mounted");
        tokio::spawn(session.run(initial, rx));
        tx
    }

    async fn send(&self, invitation_id: &str, command: PreviewCommand) -> Result<(), AppError> {
        let tx = self
            .sessions
            .read()
            .await
            .get(invitation_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No preview session for {}", invitation_id)))?;
        if tx.send(command).await.is_err() {
            self.prune(invitation_id, &tx).await;
            return Err(closed(invitation_id));
        }
        Ok(())
    }

    async fn prune(&self, invitation_id: &str, stale: &mpsc::Sender<PreviewCommand>) {
        let mut sessions = self.sessions.write().await;
        if sessions
            .get(invitation_id)
            .is_some_and(|tx| tx.same_channel(stale))
        {
            sessions.remove(invitation_id);
        }
    }
}

fn closed(invitation_id: &str) -> AppError {
    AppError::NotFound(format!("Preview session for {} has closed", invitation_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::BridgeMessage;
    use url::Url;

    const WINDOW: Duration = Duration::from_millis(500);
    const IDLE: Duration = Duration::from_secs(60);

    fn registry(threshold: usize) -> PreviewRegistry {
        let selector = ChannelSelector::new(Url::parse("http://preview.test").unwrap(), threshold);
        PreviewRegistry::new(selector, WINDOW, IDLE)
    }

    fn headline(text: &str) -> EditorFields {
        EditorFields {
            headline: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_emits_immediately() {
        let registry = registry(8_000);
        registry.edit("inv-1", headline("first")).await;

        let frame = registry.frame("inv-1").await.unwrap();
        assert_eq!(frame.emissions, 1);
        assert_eq!(frame.snapshot.unwrap().headline, "first");
        assert!(!frame.out_of_band_pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_emission() {
        let registry = registry(8_000);
        registry.edit("inv-1", headline("mount")).await;

        for i in 0..5 {
            registry.edit("inv-1", headline(&format!("edit-{}", i))).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let frame = registry.frame("inv-1").await.unwrap();
        assert_eq!(frame.emissions, 1);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let frame = registry.frame("inv-1").await.unwrap();
        assert_eq!(frame.emissions, 2);
        assert_eq!(frame.snapshot.unwrap().headline, "edit-4");
    }

    #[tokio::test(start_paused = true)]
    async fn test_surface_handshake_through_session() {
        let registry = registry(10);
        registry.edit("inv-1", headline("large")).await;

        let (generation, mut outbox) = registry.attach("inv-1").await.unwrap();
        match outbox.recv().await.unwrap() {
            SurfaceOutput::Navigate { generation: g, address } => {
                assert_eq!(g, generation);
                assert!(address.contains("__OUT_OF_BAND__"));
            }
            other => panic!("unexpected output: {:?}", other),
        }
        assert!(outbox.try_recv().is_err());

        let outcome = registry
            .message("inv-1", generation, SurfaceMessage::PreviewReady)
            .await
            .unwrap();
        assert_eq!(outcome, HandshakeOutcome::Delivered);
        match outbox.recv().await.unwrap() {
            SurfaceOutput::Message(BridgeMessage::InvitationData { data }) => {
                assert_eq!(data.headline, "large");
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_emission() {
        let registry = registry(8_000);
        registry.edit("inv-1", headline("mount")).await;

        let (_, mut outbox) = registry.attach("inv-1").await.unwrap();
        let _ = outbox.recv().await;
        registry.edit("inv-1", headline("pending")).await;
        assert!(registry.close("inv-1").await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        // The session task dropped the surface without publishing the pending edit.
        assert!(outbox.recv().await.is_none());
        assert!(matches!(
            registry.frame("inv-1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_session_closes_and_remounts() {
        let registry = registry(8_000);
        registry.edit("inv-1", headline("first")).await;
        registry.edit("inv-1", headline("second")).await;

        // The pending edit is flushed before the idle window can start counting.
        tokio::time::sleep(IDLE / 2).await;
        assert_eq!(registry.frame("inv-1").await.unwrap().emissions, 2);

        tokio::time::sleep(IDLE + Duration::from_secs(1)).await;
        assert!(matches!(
            registry.frame("inv-1").await,
            Err(AppError::NotFound(_))
        ));
        assert!(registry.sessions.read().await.is_empty());
        assert!(!registry.close("inv-1").await);

        registry.edit("inv-1", headline("back")).await;
        let frame = registry.frame("inv-1").await.unwrap();
        assert_eq!(frame.emissions, 1);
        assert_eq!(frame.snapshot.unwrap().headline, "back");
    }

    #[tokio::test(start_paused = true)]
    async fn test_attached_surface_keeps_session_alive() {
        let registry = registry(8_000);
        registry.edit("inv-1", headline("watched")).await;
        let (_, mut outbox) = registry.attach("inv-1").await.unwrap();
        let _ = outbox.recv().await;

        tokio::time::sleep(IDLE * 3).await;

        let frame = registry.frame("inv-1").await.unwrap();
        assert!(frame.surface_attached);

        drop(outbox);
        tokio::time::sleep(IDLE + Duration::from_secs(1)).await;
        assert!(registry.frame("inv-1").await.is_err());
    }
}
