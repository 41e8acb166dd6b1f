//! Gesture Rounds library - timed, round-based gesture games
//!
//! A player answers a prompt with a hand gesture inside a response window.
//! The engine arbitrates competing responses, scores the round, and reports
//! results to a display or a remote game server.
//!
//! # Architecture
//!
//! - **Engine**: Round lifecycle state machine shared by every mode
//! - **Gate**: First-writer-wins arbitration of candidate responses
//! - **Aggregator**: Debounced majority vote over raw recognizer labels
//! - **Games**: Rock-paper-scissors and counting rules
//! - **Remote**: Boundary with a networked game server
//!
//! # Example
//!
//! ```no_run
//! use gesture_rounds::{GameKind, GameMode, OutboundNotifier, RoundEngine, SessionConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = SessionConfig::new(GameKind::Rps, GameMode::SelfPlay, 3);
//! let (notifier, mut events) = OutboundNotifier::channel(*config.event_buffer());
//! let (mut engine, handle) = RoundEngine::new(&config, None, notifier)?;
//!
//! tokio::spawn(async move {
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//! });
//!
//! let summary = engine.play().await;
//! println!("Final score: {:.1}", summary.cumulative_score);
//! # let _ = handle;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod aggregator;
mod config;
mod engine;
mod games;
mod gate;
mod notifier;
mod prompt;
mod remote;
mod score;
mod sensor;
mod session;

// Crate-level exports - Configuration
pub use config::{ConfigError, GameMode, SessionConfig};

// Crate-level exports - Game rules
pub use games::{
    COUNTING_MAX, COUNTING_MIN, GameKind, Gesture, Judgement, Outcome, Prompt, RoundResult,
};

// Crate-level exports - Scoring
pub use score::{ScoreModel, ScoreWeights};

// Crate-level exports - Response arbitration
pub use aggregator::{AggregatorConfig, GestureAggregator, GestureDecision, NO_GESTURE};
pub use gate::{CandidateResponse, Decision, ResponseGate};
pub use sensor::SensorPipeline;

// Crate-level exports - Session and engine
pub use engine::{EngineHandle, RoundEngine, RoundStrategy, SelfPlayResponder};
pub use session::{GameSession, GameSummary, OutcomeTally, RoundState};

// Crate-level exports - Collaborators
pub use notifier::{EventKind, GameEvent, OutboundNotifier};
pub use prompt::{LocalPrompts, PromptSource, RemotePrompts};
pub use remote::{
    LoopbackServer, PlayerScore, RemoteChannel, RemoteError, RemoteEvent, RemoteQueue,
    SubmittedResult, TransportEnds,
};
