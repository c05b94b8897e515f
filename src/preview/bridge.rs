//! Ready-then-deliver handshake with the isolated render surface.
//!
//! The surface lives behind a message channel. Each address pushed to it starts a
//! new generation (the surface reloads); a held snapshot is only ever sent after a
//! `PREVIEW_READY` for the current generation.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::channel::TransferPlan;
use crate::models::Snapshot;

/// Messages the render surface sends to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SurfaceMessage {
    #[serde(rename = "PREVIEW_READY")]
    PreviewReady,
}

/// Messages the bridge sends to the render surface over the message channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BridgeMessage {
    #[serde(rename = "INVITATION_DATA")]
    InvitationData { data: Snapshot },
}

/// Everything written to a surface's outbox.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOutput {
    /// Primary channel: load this address, starting `generation`.
    Navigate { generation: u64, address: String },
    /// Secondary channel.
    Message(BridgeMessage),
}

/// Result of handing a surface message to the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeOutcome {
    /// Ready acknowledged and the held snapshot was sent.
    Delivered,
    /// Ready acknowledged; nothing is held.
    NothingHeld,
    /// The message named an older generation and was ignored.
    Stale,
    /// No surface is attached.
    Detached,
}

struct Surface {
    generation: u64,
    ready: bool,
    outbox: mpsc::Sender<SurfaceOutput>,
}

/// Single owner of the current transfer plan and the attached surface.
#[derive(Default)]
pub struct PreviewBridge {
    current: Option<TransferPlan>,
    surface: Option<Surface>,
    generation: u64,
}

impl PreviewBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&TransferPlan> {
        self.current.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a surface is attached and still listening.
    pub fn is_attached(&self) -> bool {
        self.surface
            .as_ref()
            .is_some_and(|surface| !surface.outbox.is_closed())
    }

    /// Replace the current plan wholesale and point the surface at the new address.
    pub fn publish(&mut self, plan: TransferPlan) {
        self.current = Some(plan);
        if self.surface.is_some() {
            self.navigate();
        }
    }

    /// Attach a new surface, replacing any previous one. Returns its generation.
    pub fn attach(&mut self, outbox: mpsc::Sender<SurfaceOutput>) -> u64 {
        self.generation += 1;
        self.surface = Some(Surface {
            generation: self.generation,
            ready: false,
            outbox,
        });
        if self.current.is_some() {
            self.send_navigate();
        }
        tracing::debug!(generation = self.generation, "Render surface attached");
        self.generation
    }

    /// Resolves once the attached surface stops listening. Never resolves when detached.
    pub async fn surface_closed(&self) {
        match self.surface.as_ref() {
            Some(surface) => surface.outbox.closed().await,
            None => std::future::pending().await,
        }
    }

    pub fn detach(&mut self) {
        if self.surface.take().is_some() {
            tracing::debug!(generation = self.generation, "Render surface detached");
        }
    }

    /// Handle a message from the surface lifetime `generation`.
    ///
    /// A message is only honoured for the generation it names; a ready from a surface
    /// that has since been sent elsewhere must not release the next payload.
    pub fn on_message(&mut self, generation: u64, message: SurfaceMessage) -> HandshakeOutcome {
        let Some(surface) = self.surface.as_mut() else {
            return HandshakeOutcome::Detached;
        };
        if generation != surface.generation {
            tracing::debug!(
                generation,
                current = surface.generation,
                "Ignoring message from stale surface generation"
            );
            return HandshakeOutcome::Stale;
        }

        match message {
            SurfaceMessage::PreviewReady => {
                // A repeated ready in one generation means the surface reloaded on its
                // own; it gets the current payload again.
                if std::mem::replace(&mut surface.ready, true) {
                    tracing::debug!(generation, "Surface reported ready again");
                }
                let Some(held) = self.current.as_ref().and_then(|plan| plan.held.clone()) else {
                    return HandshakeOutcome::NothingHeld;
                };
                self.send(SurfaceOutput::Message(BridgeMessage::InvitationData { data: held }));
                HandshakeOutcome::Delivered
            }
        }
    }

    fn navigate(&mut self) {
        self.generation += 1;
        if let Some(surface) = self.surface.as_mut() {
            surface.generation = self.generation;
            surface.ready = false;
        }
        self.send_navigate();
    }

    fn send_navigate(&mut self) {
        let Some(address) = self.current.as_ref().map(|plan| plan.address.clone()) else {
            return;
        };
        self.send(SurfaceOutput::Navigate {
            generation: self.generation,
            address,
        });
    }

    fn send(&mut self, output: SurfaceOutput) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        match surface.outbox.try_send(output) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                // The next publish supersedes whatever was dropped.
                tracing::warn!(generation = surface.generation, "Surface outbox full, dropping output");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.detach();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EditorFields;
    use crate::preview::build_snapshot;

    fn plan(headline: &str, held: bool) -> TransferPlan {
        let snapshot = build_snapshot(
            "inv-1",
            &EditorFields {
                headline: Some(headline.to_string()),
                ..Default::default()
            },
        );
        TransferPlan {
            address: format!("http://preview.test/preview/inv-1?data={}", headline),
            held: held.then_some(snapshot),
            serialized_len: 0,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<SurfaceOutput>) -> Vec<SurfaceOutput> {
        let mut out = Vec::new();
        while let Ok(output) = rx.try_recv() {
            out.push(output);
        }
        out
    }

    fn delivered_headline(output: &SurfaceOutput) -> Option<&str> {
        match output {
            SurfaceOutput::Message(BridgeMessage::InvitationData { data }) => Some(&data.headline),
            _ => None,
        }
    }

    #[test]
    fn test_nothing_delivered_before_ready() {
        let mut bridge = PreviewBridge::new();
        let (tx, mut rx) = mpsc::channel(16);

        bridge.publish(plan("big", true));
        let generation = bridge.attach(tx);

        let outputs = drain(&mut rx);
        assert_eq!(outputs.len(), 1);
        assert!(matches!(outputs[0], SurfaceOutput::Navigate { generation: g, .. } if g == generation));

        assert_eq!(
            bridge.on_message(generation, SurfaceMessage::PreviewReady),
            HandshakeOutcome::Delivered
        );
        let outputs = drain(&mut rx);
        assert_eq!(outputs.len(), 1);
        assert_eq!(delivered_headline(&outputs[0]), Some("big"));
    }

    #[test]
    fn test_inline_plan_holds_nothing() {
        let mut bridge = PreviewBridge::new();
        let (tx, mut rx) = mpsc::channel(16);
        let generation = bridge.attach(tx);

        bridge.publish(plan("small", false));
        assert_eq!(
            bridge.on_message(bridge.generation(), SurfaceMessage::PreviewReady),
            HandshakeOutcome::NothingHeld
        );
        assert!(drain(&mut rx)
            .iter()
            .all(|o| matches!(o, SurfaceOutput::Navigate { generation: g, .. } if *g > generation)));
    }

    #[test]
    fn test_publish_starts_new_generation_and_stale_ready_is_ignored() {
        let mut bridge = PreviewBridge::new();
        let (tx, mut rx) = mpsc::channel(16);

        bridge.publish(plan("first", true));
        let first = bridge.attach(tx);
        bridge.publish(plan("second", true));
        let second = bridge.generation();
        assert!(second > first);

        assert_eq!(
            bridge.on_message(first, SurfaceMessage::PreviewReady),
            HandshakeOutcome::Stale
        );
        assert_eq!(
            bridge.on_message(second, SurfaceMessage::PreviewReady),
            HandshakeOutcome::Delivered
        );

        let headlines: Vec<_> = drain(&mut rx)
            .iter()
            .filter_map(|o| delivered_headline(o).map(str::to_string))
            .collect();
        assert_eq!(headlines, vec!["second".to_string()]);
    }

    #[test]
    fn test_reload_redelivers_current_payload() {
        let mut bridge = PreviewBridge::new();
        let (tx, mut rx) = mpsc::channel(16);

        bridge.publish(plan("v1", true));
        let first = bridge.attach(tx);
        bridge.on_message(first, SurfaceMessage::PreviewReady);
        bridge.publish(plan("v2", true));
        let second = bridge.generation();
        bridge.on_message(second, SurfaceMessage::PreviewReady);
        bridge.on_message(second, SurfaceMessage::PreviewReady);

        let headlines: Vec<_> = drain(&mut rx)
            .iter()
            .filter_map(|o| delivered_headline(o).map(str::to_string))
            .collect();
        assert_eq!(headlines, vec!["v1", "v2", "v2"]);
    }

    #[test]
    fn test_handshake_ordering_per_generation() {
        let mut bridge = PreviewBridge::new();
        let (tx, mut rx) = mpsc::channel(64);

        bridge.attach(tx);
        for i in 0..5 {
            bridge.publish(plan(&format!("v{}", i), i % 2 == 0));
            if i % 2 == 0 {
                bridge.on_message(bridge.generation(), SurfaceMessage::PreviewReady);
            }
        }

        // Every data message is preceded by a navigate for the generation it belongs to,
        // and only one data message follows each navigate here.
        let mut current = None;
        let mut delivered_in_current = 0;
        for output in drain(&mut rx) {
            match output {
                SurfaceOutput::Navigate { generation, .. } => {
                    current = Some(generation);
                    delivered_in_current = 0;
                }
                SurfaceOutput::Message(_) => {
                    assert!(current.is_some());
                    delivered_in_current += 1;
                    assert_eq!(delivered_in_current, 1);
                }
            }
        }
    }

    #[test]
    fn test_detached_bridge_keeps_plan() {
        let mut bridge = PreviewBridge::new();
        let (tx, rx) = mpsc::channel(16);

        let generation = bridge.attach(tx);
        drop(rx);
        bridge.publish(plan("after-close", true));

        assert!(!bridge.is_attached());
        assert_eq!(bridge.current().map(|p| p.is_redacted()), Some(true));
        assert_eq!(
            bridge.on_message(generation, SurfaceMessage::PreviewReady),
            HandshakeOutcome::Detached
        );
    }

    #[test]
    fn test_ready_from_previous_generation_releases_nothing() {
        let mut bridge = PreviewBridge::new();
        let (tx, mut rx) = mpsc::channel(16);

        bridge.publish(plan("v1", true));
        let first = bridge.attach(tx);
        bridge.publish(plan("v2", true));

        // The first surface's ready lands after the surface was sent to a new address.
        assert_eq!(
            bridge.on_message(first, SurfaceMessage::PreviewReady),
            HandshakeOutcome::Stale
        );

        let outputs = drain(&mut rx);
        assert_eq!(outputs.len(), 2);
        assert!(outputs
            .iter()
            .all(|o| matches!(o, SurfaceOutput::Navigate { .. })));
    }
}
