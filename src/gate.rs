//! First-writer-wins arbitration of candidate responses.
//!
//! Every producer (sensor pipeline, network events, the self-play
//! responder, the engine's own deadline) races through the same slot.
//! Whoever writes the slot first decides the round; everyone after that is
//! dropped without an error.

use crate::games::GameKind;
use derive_new::new;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

/// A proposed response before arbitration.
#[derive(Debug, Clone, PartialEq, new)]
pub struct CandidateResponse {
    /// Raw recognizer label.
    pub label: String,
    /// Recognizer confidence in `[0, 1]`.
    pub confidence: f64,
    /// When the label was observed.
    pub observed_at: Instant,
}

impl CandidateResponse {
    /// A candidate observed right now.
    pub fn observed_now(label: impl Into<String>, confidence: f64) -> Self {
        Self::new(label.into(), confidence, Instant::now())
    }
}

/// What the gate settled on for a round.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A syntactically valid response within the window.
    Accepted {
        /// Response label.
        label: String,
        /// Recognizer confidence, clamped to `[0, 1]`.
        confidence: f64,
        /// Time from prompt to observation.
        elapsed: Duration,
    },
    /// A response that failed the game kind's syntax check. Final for the round.
    Invalid {
        /// Offending label.
        label: String,
        /// Time from prompt to observation.
        elapsed: Duration,
    },
    /// A response observed after the deadline.
    TooSlow {
        /// Late label.
        label: String,
    },
    /// Nothing arrived before the deadline.
    NoResponse,
}

#[derive(Debug, Clone)]
enum Slot {
    Closed,
    Open {
        round: u32,
        kind: GameKind,
        started: Instant,
        timeout: Duration,
    },
    Decided {
        round: u32,
        decision: Decision,
    },
}

/// The single synchronization point that keeps a round from scoring twice.
#[derive(Debug)]
pub struct ResponseGate {
    slot: Mutex<Slot>,
    decided: watch::Sender<Option<u32>>,
}

impl Default for ResponseGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseGate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        let (decided, _) = watch::channel(None);
        Self {
            slot: Mutex::new(Slot::Closed),
            decided,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the slot for `round`. Anything left from the previous round is discarded.
    #[instrument(skip(self))]
    pub fn open(&self, round: u32, kind: GameKind, started: Instant, timeout: Duration) {
        *self.lock() = Slot::Open {
            round,
            kind,
            started,
            timeout,
        };
        self.decided.send_replace(None);
        debug!("Gate opened");
    }

    /// Offers a candidate for the open round.
    ///
    /// Returns `true` for exactly one call per round: the call that decided
    /// it. A label failing the syntax check still decides the round (as
    /// [`Decision::Invalid`]). Calls while the gate is closed or already
    /// decided return `false`.
    pub fn try_accept(&self, candidate: CandidateResponse) -> bool {
        let mut slot = self.lock();
        let (round, decision) = match &*slot {
            Slot::Open {
                round,
                kind,
                started,
                timeout,
            } => {
                let elapsed = candidate.observed_at.saturating_duration_since(*started);
                let decision = if elapsed > *timeout {
                    Decision::TooSlow {
                        label: candidate.label,
                    }
                } else if kind.accepts_label(&candidate.label) {
                    Decision::Accepted {
                        label: candidate.label,
                        confidence: sanitize(candidate.confidence),
                        elapsed,
                    }
                } else {
                    Decision::Invalid {
                        label: candidate.label,
                        elapsed,
                    }
                };
                (*round, decision)
            }
            Slot::Decided { round, .. } => {
                debug!(round, label = %candidate.label, "Round already decided, dropping candidate");
                return false;
            }
            Slot::Closed => {
                debug!(label = %candidate.label, "Gate closed, dropping candidate");
                return false;
            }
        };

        info!(round, ?decision, "Round decided by candidate");
        *slot = Slot::Decided { round, decision };
        drop(slot);
        self.decided.send_replace(Some(round));
        true
    }

    /// Settles `round`: if nothing decided it yet, it becomes
    /// [`Decision::NoResponse`]. Returns the round's decision, or `None`
    /// when the gate no longer holds that round.
    #[instrument(skip(self))]
    pub fn resolve(&self, round: u32) -> Option<Decision> {
        let mut slot = self.lock();
        match &*slot {
            Slot::Open { round: open, .. } if *open == round => {}
            Slot::Decided {
                round: decided,
                decision,
            } if *decided == round => return Some(decision.clone()),
            _ => return None,
        }

        info!("Deadline reached without a response");
        *slot = Slot::Decided {
            round,
            decision: Decision::NoResponse,
        };
        drop(slot);
        self.decided.send_replace(Some(round));
        Some(Decision::NoResponse)
    }

    /// Closes the gate; late candidates are dropped until the next [`open`](Self::open).
    #[instrument(skip(self))]
    pub fn close(&self) {
        *self.lock() = Slot::Closed;
    }

    /// The round currently accepting candidates, if any.
    pub fn open_round(&self) -> Option<u32> {
        match &*self.lock() {
            Slot::Open { round, .. } => Some(*round),
            _ => None,
        }
    }

    /// Completes once `round` has been decided.
    pub async fn decided(&self, round: u32) {
        let mut rx = self.decided.subscribe();
        let closed = rx.wait_for(|decided| *decided == Some(round)).await.is_err();
        if closed {
            std::future::pending::<()>().await;
        }
    }
}

fn sanitize(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}
