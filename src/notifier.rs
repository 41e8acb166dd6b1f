//! Fire-and-forget event feed for the display and network layers.

use crate::games::{Prompt, RoundResult};
use crate::session::GameSummary;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Coarse event category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    /// A new prompt is on screen.
    Prompt,
    /// A round settled.
    Result,
    /// The running or final score changed.
    Score,
    /// A collaborator failed.
    Error,
}

/// Messages sent from the engine to whoever is listening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    /// A round started.
    Prompt {
        /// 1-based round number.
        round: u32,
        /// Rounds in the game.
        total_rounds: u32,
        /// The challenge.
        prompt: Prompt,
        /// Response window in seconds.
        timeout_secs: f64,
    },
    /// A round settled.
    Result(RoundResult),
    /// Running total after a round.
    Score {
        /// Round that changed the total.
        round: u32,
        /// Sum of round scores so far.
        cumulative_score: f64,
    },
    /// The game ended after its last round.
    GameOver(GameSummary),
    /// Something outside the engine failed.
    Error {
        /// Description.
        message: String,
    },
}

impl GameEvent {
    /// Category of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Prompt { .. } => EventKind::Prompt,
            Self::Result(_) => EventKind::Result,
            Self::Score { .. } | Self::GameOver(_) => EventKind::Score,
            Self::Error { .. } => EventKind::Error,
        }
    }

    /// Convenience constructor for error events.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Non-blocking, lossy publisher over a bounded mailbox.
#[derive(Debug, Clone)]
pub struct OutboundNotifier {
    tx: Option<mpsc::Sender<GameEvent>>,
}

impl OutboundNotifier {
    /// Creates a notifier and the mailbox a consumer drains.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GameEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier with no consumer; every event is dropped.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Publishes `event`. Returns `false` when it was dropped.
    pub fn publish(&self, event: GameEvent) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(kind = %event.kind(), "Event mailbox full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                debug!(kind = %event.kind(), "No event consumer, dropping event");
                false
            }
        }
    }
}
