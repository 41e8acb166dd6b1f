//! Game session state owned by the round engine.

use crate::config::{ConfigError, GameMode, SessionConfig};
use crate::games::{GameKind, Outcome, RoundResult};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Where the engine is in the round lifecycle.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum RoundState {
    /// No game running.
    #[default]
    Idle,
    /// Between rounds.
    Waiting,
    /// Prompt shown, response window open.
    Prompted,
    /// Round settled, result on display.
    Responded,
    /// All rounds played.
    GameOver,
}

/// Per-outcome round counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    /// Rock-paper-scissors wins.
    pub wins: u32,
    /// Rock-paper-scissors losses.
    pub losses: u32,
    /// Rock-paper-scissors ties.
    pub ties: u32,
    /// Counting rounds answered correctly.
    pub correct: u32,
    /// Counting rounds answered incorrectly.
    pub incorrect: u32,
    /// Rounds ended by an unparseable response.
    pub invalid: u32,
    /// Rounds ended by the deadline.
    pub timeouts: u32,
    /// Rounds skipped because no prompt arrived.
    pub skipped: u32,
}

impl OutcomeTally {
    /// Counts one settled round.
    pub fn record(&mut self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Win => &mut self.wins,
            Outcome::Lose => &mut self.losses,
            Outcome::Tie => &mut self.ties,
            Outcome::Correct => &mut self.correct,
            Outcome::Incorrect => &mut self.incorrect,
            Outcome::Invalid => &mut self.invalid,
            Outcome::Timeout => &mut self.timeouts,
        };
        *counter += 1;
    }

    /// Rounds that reached a result (everything but skips).
    pub fn settled(&self) -> u32 {
        self.wins
            + self.losses
            + self.ties
            + self.correct
            + self.incorrect
            + self.invalid
            + self.timeouts
    }
}

/// Final report of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Game kind at the end of the game.
    pub kind: GameKind,
    /// Operating mode.
    pub mode: GameMode,
    /// Rounds started (settled or skipped).
    pub rounds_played: u32,
    /// Rounds the game was started with.
    pub total_rounds: u32,
    /// Sum of all round scores.
    pub cumulative_score: f64,
    /// Per-outcome counters.
    pub tally: OutcomeTally,
    /// `false` when the game was stopped or reset before its last round.
    pub completed: bool,
}

/// Counters and settings of one game, mutated only by the round engine.
#[derive(Debug, Clone, Getters)]
pub struct GameSession {
    /// Active game kind.
    kind: GameKind,
    /// Operating mode.
    mode: GameMode,
    /// Player identifier reported to a remote server.
    player_id: String,
    /// Rounds started so far.
    current_round: u32,
    /// Rounds in this game.
    total_rounds: u32,
    /// Sum of round scores; never decreases within a game.
    cumulative_score: f64,
    /// Response window for the active kind.
    response_timeout: Duration,
    /// Per-outcome counters.
    tally: OutcomeTally,
    #[getter(skip)]
    timeout_override: Option<Duration>,
}

impl GameSession {
    /// Creates a session from a validated configuration.
    #[instrument(skip(config), fields(kind = %config.game_kind(), mode = %config.mode()))]
    pub fn new(config: &SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(total_rounds = config.total_rounds(), "Creating game session");
        Ok(Self {
            kind: *config.game_kind(),
            mode: *config.mode(),
            player_id: config.player_id().clone(),
            current_round: 0,
            total_rounds: *config.total_rounds(),
            cumulative_score: 0.0,
            response_timeout: config.response_timeout(),
            tally: OutcomeTally::default(),
            timeout_override: config.response_timeout_secs().map(Duration::from_secs_f64),
        })
    }

    /// Starts a new game of `total_rounds`, clearing the counters.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub fn restart(&mut self, total_rounds: u32) -> Result<(), ConfigError> {
        if total_rounds == 0 {
            return Err(ConfigError::new("total_rounds must be greater than 0"));
        }
        self.total_rounds = total_rounds;
        self.current_round = 0;
        self.cumulative_score = 0.0;
        self.tally = OutcomeTally::default();
        Ok(())
    }

    /// Zeroes the counters without starting a game.
    #[instrument(skip(self), fields(kind = %self.kind))]
    pub fn reset(&mut self) {
        self.current_round = 0;
        self.cumulative_score = 0.0;
        self.tally = OutcomeTally::default();
    }

    /// Advances to the next round and returns its number, or `None` when
    /// every round has been started.
    pub fn begin_round(&mut self) -> Option<u32> {
        if self.is_complete() {
            return None;
        }
        self.current_round += 1;
        debug!(round = self.current_round, total = self.total_rounds, "Round begins");
        Some(self.current_round)
    }

    /// Adds a settled round to the totals.
    #[instrument(skip(self, result), fields(round = result.round, outcome = %result.outcome))]
    pub fn record(&mut self, result: &RoundResult) {
        let score = if result.round_score.is_finite() {
            result.round_score.max(0.0)
        } else {
            warn!(score = result.round_score, "Ignoring non-finite round score");
            0.0
        };
        self.cumulative_score += score;
        self.tally.record(result.outcome);
    }

    /// Counts a round that never got a prompt.
    pub fn record_skip(&mut self) {
        self.tally.skipped += 1;
    }

    /// Switches the game kind; the response window follows unless configured explicitly.
    #[instrument(skip(self), fields(from = %self.kind))]
    pub fn set_kind(&mut self, kind: GameKind) {
        self.kind = kind;
        self.response_timeout = self.timeout_override.unwrap_or_else(|| kind.default_timeout());
    }

    /// Whether every round has been started.
    pub fn is_complete(&self) -> bool {
        self.current_round >= self.total_rounds
    }

    /// Snapshot for reporting.
    pub fn summary(&self, completed: bool) -> GameSummary {
        GameSummary {
            kind: self.kind,
            mode: self.mode,
            rounds_played: self.current_round,
            total_rounds: self.total_rounds,
            cumulative_score: self.cumulative_score,
            tally: self.tally,
            completed,
        }
    }
}
