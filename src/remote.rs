//! Boundary with the networked transport.
//!
//! The engine only needs two operations from a remote server: ask for a
//! prompt and report a result. Everything else the transport receives
//! (candidate responses, resets, game kind changes, errors) is pushed onto
//! a bounded [`RemoteEvent`] queue that the engine drains in its own loop.

use crate::games::{GameKind, Prompt};
use crate::gate::CandidateResponse;
use derive_more::{Display, Error};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Operations the engine calls on a remote game server.
#[async_trait::async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Waits for the server's next prompt. The caller bounds the wait.
    async fn request_prompt(&self, kind: GameKind) -> Result<Prompt, RemoteError>;

    /// Reports a settled round. Fire-and-forget.
    fn submit_result(&self, player_id: &str, result_text: &str, round_score: f64);
}

/// Inbound, server-initiated events.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// A candidate response arriving over the network.
    Candidate(CandidateResponse),
    /// The server reset the game.
    Reset,
    /// The server switched the game kind; applies from the next round.
    GameKindChanged(GameKind),
    /// The server reported an error.
    Error(String),
    /// The connection dropped.
    Disconnected,
}

/// A result as submitted to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedResult {
    /// Reporting player.
    pub player_id: String,
    /// Result text shown to the player.
    pub result_text: String,
    /// Round score.
    pub round_score: f64,
}

/// Transport-facing ends of a [`RemoteQueue`].
#[derive(Debug)]
pub struct TransportEnds {
    /// Push path for prompts received from the wire.
    pub prompts: mpsc::Sender<Prompt>,
    /// Results to encode and send to the server.
    pub results: mpsc::Receiver<SubmittedResult>,
}

/// [`RemoteChannel`] backed by queues that a wire transport fills and drains.
#[derive(Debug)]
pub struct RemoteQueue {
    prompts: tokio::sync::Mutex<mpsc::Receiver<Prompt>>,
    results: mpsc::Sender<SubmittedResult>,
}

impl RemoteQueue {
    /// Creates the queue pair with room for `capacity` items each way.
    #[instrument]
    pub fn new(capacity: usize) -> (Self, TransportEnds) {
        let (prompt_tx, prompt_rx) = mpsc::channel(capacity.max(1));
        let (result_tx, result_rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                prompts: tokio::sync::Mutex::new(prompt_rx),
                results: result_tx,
            },
            TransportEnds {
                prompts: prompt_tx,
                results: result_rx,
            },
        )
    }
}

#[async_trait::async_trait]
impl RemoteChannel for RemoteQueue {
    #[instrument(skip(self))]
    async fn request_prompt(&self, _kind: GameKind) -> Result<Prompt, RemoteError> {
        let mut prompts = self.prompts.lock().await;
        match prompts.recv().await {
            Some(prompt) => {
                debug!(%prompt, "Received prompt from transport");
                Ok(prompt)
            }
            None => Err(RemoteError::new("Prompt channel closed")),
        }
    }

    #[instrument(skip(self))]
    fn submit_result(&self, player_id: &str, result_text: &str, round_score: f64) {
        let result = SubmittedResult {
            player_id: player_id.to_string(),
            result_text: result_text.to_string(),
            round_score,
        };
        if let Err(e) = self.results.try_send(result) {
            warn!(error = %e, "Dropping result submission");
        }
    }
}

/// Scoreboard entry kept by [`LoopbackServer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    /// Sum of reported round scores.
    pub score: f64,
    /// Number of reported rounds.
    pub results: u32,
}

/// In-process stand-in for the remote game server.
///
/// Draws prompts server-side for the requested kind after an optional
/// latency, and keeps a per-player scoreboard of submitted results.
#[derive(Debug)]
pub struct LoopbackServer {
    rng: Mutex<StdRng>,
    latency: Duration,
    scoreboard: Mutex<HashMap<String, PlayerScore>>,
}

impl Default for LoopbackServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackServer {
    /// Creates a server that answers prompt requests immediately.
    #[instrument]
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a server with a reproducible prompt sequence.
    #[instrument]
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            latency: Duration::ZERO,
            scoreboard: Mutex::new(HashMap::new()),
        }
    }

    /// Delays every prompt by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Scoreboard entry for `player_id`.
    pub fn score_for(&self, player_id: &str) -> Option<PlayerScore> {
        self.scoreboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(player_id)
            .copied()
    }

    /// Copy of the whole scoreboard.
    pub fn scoreboard(&self) -> HashMap<String, PlayerScore> {
        self.scoreboard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl RemoteChannel for LoopbackServer {
    #[instrument(skip(self))]
    async fn request_prompt(&self, kind: GameKind) -> Result<Prompt, RemoteError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let prompt = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            kind.draw_prompt(&mut *rng)
        };
        info!(%prompt, "Loopback server issued prompt");
        Ok(prompt)
    }

    #[instrument(skip(self))]
    fn submit_result(&self, player_id: &str, result_text: &str, round_score: f64) {
        let mut scoreboard = self.scoreboard.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = scoreboard.entry(player_id.to_string()).or_default();
        entry.score += round_score.max(0.0);
        entry.results += 1;
        debug!(total = entry.score, "Loopback server recorded result");
    }
}

/// Remote channel error.
#[derive(Debug, Clone, Display, Error)]
#[display("Remote error: {} at {}:{}", message, file, line)]
pub struct RemoteError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RemoteError {
    /// Creates a new remote error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
