//! Recognizer feed → aggregator → response gate.

use crate::aggregator::{AggregatorConfig, GestureAggregator, GestureDecision};
use crate::gate::{CandidateResponse, ResponseGate};
use crate::notifier::{GameEvent, OutboundNotifier};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Consumes raw recognizer frames and offers the debounced decision to the gate.
///
/// Runs independently of round timing: frames arriving while no round is
/// open only move the aggregator window, and the gate drops the offer.
#[derive(Debug)]
pub struct SensorPipeline {
    aggregator: GestureAggregator,
    gate: Arc<ResponseGate>,
    notifier: OutboundNotifier,
    decisions: watch::Sender<GestureDecision>,
}

impl SensorPipeline {
    /// Creates a pipeline feeding `gate`.
    #[instrument(skip(gate, notifier))]
    pub fn new(config: AggregatorConfig, gate: Arc<ResponseGate>, notifier: OutboundNotifier) -> Self {
        let (decisions, _) = watch::channel(GestureDecision::none());
        Self {
            aggregator: GestureAggregator::new(config),
            gate,
            notifier,
            decisions,
        }
    }

    /// Observes the reported gesture, e.g. for a "You: …" display.
    pub fn subscribe(&self) -> watch::Receiver<GestureDecision> {
        self.decisions.subscribe()
    }

    /// Runs the pipeline on its own task until the feed closes.
    pub fn spawn(self, frames: mpsc::Receiver<CandidateResponse>) -> JoinHandle<()> {
        tokio::spawn(self.run(frames))
    }

    /// Drains `frames` until the sender side hangs up.
    #[instrument(skip_all)]
    pub async fn run(mut self, mut frames: mpsc::Receiver<CandidateResponse>) {
        info!("Sensor pipeline started");
        while let Some(frame) = frames.recv().await {
            self.ingest(frame);
        }
        warn!("Sensor feed closed");
        self.notifier.publish(GameEvent::error("Sensor feed disconnected"));
    }

    /// Feeds one frame. Returns `true` when the offer decided a round.
    pub fn ingest(&mut self, frame: CandidateResponse) -> bool {
        if self.aggregator.observe(&frame.label, frame.observed_at) {
            self.decisions.send_replace(self.aggregator.decision());
        }

        let decision = self.aggregator.decision();
        if decision.is_none() || self.gate.open_round().is_none() {
            return false;
        }

        debug!(label = %decision.label, confidence = decision.confidence, "Offering gesture to gate");
        self.gate.try_accept(CandidateResponse::new(
            decision.label,
            decision.confidence,
            frame.observed_at,
        ))
    }
}
