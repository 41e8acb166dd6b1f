//! Session configuration, loaded from TOML or built in code.

use crate::aggregator::AggregatorConfig;
use crate::games::GameKind;
use crate::score::ScoreWeights;
use derive_getters::Getters;
use derive_more::{Display, Error};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Where prompts come from and who answers them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum GameMode {
    /// Prompts come from a remote server; results are reported back.
    Networked,
    /// Prompts are drawn locally; a live player answers.
    Local,
    /// The engine plays both sides.
    SelfPlay,
}

/// Configuration consumed when a game session is created.
#[derive(Debug, Clone, Getters, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Game kind (`rps` or `counting`).
    #[serde(default = "default_game_kind")]
    game_kind: GameKind,

    /// Operating mode (`networked`, `local`, `self-play`).
    #[serde(default = "default_mode")]
    mode: GameMode,

    /// Rounds per game.
    #[serde(default = "default_total_rounds")]
    total_rounds: u32,

    /// Response window in seconds; the game kind's default when unset.
    #[serde(default)]
    response_timeout_secs: Option<f64>,

    /// How long a result stays on screen after the response window.
    #[serde(default = "default_result_display_secs")]
    result_display_secs: f64,

    /// Identifier reported with results in networked mode.
    #[serde(default = "default_player_id")]
    player_id: String,

    /// Weight of recognizer confidence in the round score.
    #[serde(default = "default_confidence_weight")]
    confidence_weight: f64,

    /// Weight of the remaining response time in the round score.
    #[serde(default = "default_time_weight")]
    time_weight: f64,

    /// Trailing window of recognizer observations used for the majority vote.
    #[serde(default = "default_window_size")]
    window_size: usize,

    /// Minimum time between two changes of the reported gesture.
    #[serde(default = "default_debounce_secs")]
    debounce_secs: f64,

    /// Capacity of the outbound event mailbox.
    #[serde(default = "default_event_buffer")]
    event_buffer: usize,

    /// Capacity of the inbound remote event queue.
    #[serde(default = "default_remote_queue")]
    remote_queue: usize,

    /// Capacity of the raw recognizer frame feed into the sensor pipeline.
    #[serde(default = "default_frame_buffer")]
    frame_buffer: usize,
}

#[instrument]
fn default_game_kind() -> GameKind {
    GameKind::Rps
}

#[instrument]
fn default_mode() -> GameMode {
    GameMode::Local
}

#[instrument]
fn default_total_rounds() -> u32 {
    5
}

#[instrument]
fn default_result_display_secs() -> f64 {
    2.0
}

fn default_player_id() -> String {
    format!("player-{:08x}", rand::thread_rng().r#gen::<u32>())
}

fn default_confidence_weight() -> f64 {
    ScoreWeights::default().confidence_weight
}

fn default_time_weight() -> f64 {
    ScoreWeights::default().time_weight
}

#[instrument]
fn default_window_size() -> usize {
    5
}

#[instrument]
fn default_debounce_secs() -> f64 {
    1.0
}

fn default_event_buffer() -> usize {
    64
}

fn default_remote_queue() -> usize {
    16
}

fn default_frame_buffer() -> usize {
    32
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(default_game_kind(), default_mode(), default_total_rounds())
    }
}

impl SessionConfig {
    /// Creates a configuration with default timing, scoring and buffering.
    #[instrument]
    pub fn new(game_kind: GameKind, mode: GameMode, total_rounds: u32) -> Self {
        Self {
            game_kind,
            mode,
            total_rounds,
            response_timeout_secs: None,
            result_display_secs: default_result_display_secs(),
            player_id: default_player_id(),
            confidence_weight: default_confidence_weight(),
            time_weight: default_time_weight(),
            window_size: default_window_size(),
            debounce_secs: default_debounce_secs(),
            event_buffer: default_event_buffer(),
            remote_queue: default_remote_queue(),
            frame_buffer: default_frame_buffer(),
        }
    }

    /// Loads and validates configuration from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading session config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates configuration from TOML text.
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        info!(
            game_kind = %config.game_kind,
            mode = %config.mode,
            total_rounds = config.total_rounds,
            "Session config loaded"
        );
        Ok(config)
    }

    /// Overrides the game kind.
    pub fn with_game_kind(mut self, game_kind: GameKind) -> Self {
        self.game_kind = game_kind;
        self
    }

    /// Overrides the operating mode.
    pub fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Overrides the number of rounds.
    pub fn with_total_rounds(mut self, total_rounds: u32) -> Self {
        self.total_rounds = total_rounds;
        self
    }

    /// Overrides the response window.
    pub fn with_response_timeout_secs(mut self, secs: f64) -> Self {
        self.response_timeout_secs = Some(secs);
        self
    }

    /// Overrides how long results stay on screen after the response window.
    pub fn with_result_display_secs(mut self, secs: f64) -> Self {
        self.result_display_secs = secs;
        self
    }

    /// Overrides the player identifier.
    pub fn with_player_id(mut self, player_id: impl Into<String>) -> Self {
        self.player_id = player_id.into();
        self
    }

    /// Overrides the score weights.
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.confidence_weight = weights.confidence_weight;
        self.time_weight = weights.time_weight;
        self
    }

    /// Overrides the aggregator window and debounce interval.
    pub fn with_window(mut self, window_size: usize, debounce_secs: f64) -> Self {
        self.window_size = window_size;
        self.debounce_secs = debounce_secs;
        self
    }

    /// Checks every field; run before a session is created.
    #[instrument(skip(self), fields(game_kind = %self.game_kind, mode = %self.mode))]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_rounds == 0 {
            return Err(ConfigError::new("total_rounds must be greater than 0"));
        }
        if let Some(secs) = self.response_timeout_secs {
            if !(secs.is_finite() && secs > 0.0) {
                return Err(ConfigError::new(format!(
                    "response_timeout_secs must be positive, got {}",
                    secs
                )));
            }
        }
        if !(self.result_display_secs.is_finite() && self.result_display_secs >= 0.0) {
            return Err(ConfigError::new("result_display_secs must be non-negative"));
        }
        let weights = [self.confidence_weight, self.time_weight];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(ConfigError::new("score weights must lie in [0, 1]"));
        }
        if ((self.confidence_weight + self.time_weight) - 1.0).abs() > 1e-9 {
            return Err(ConfigError::new("score weights must sum to 1"));
        }
        if self.window_size == 0 {
            return Err(ConfigError::new("window_size must be greater than 0"));
        }
        if !(self.debounce_secs.is_finite() && self.debounce_secs >= 0.0) {
            return Err(ConfigError::new("debounce_secs must be non-negative"));
        }
        if self.event_buffer == 0 || self.remote_queue == 0 || self.frame_buffer == 0 {
            return Err(ConfigError::new("channel capacities must be greater than 0"));
        }
        Ok(())
    }

    /// Response window, falling back to the game kind's default.
    pub fn response_timeout(&self) -> Duration {
        self.timeout_for(self.game_kind)
    }

    /// Response window for `kind` under this configuration.
    pub fn timeout_for(&self, kind: GameKind) -> Duration {
        self.response_timeout_secs
            .map(Duration::from_secs_f64)
            .unwrap_or_else(|| kind.default_timeout())
    }

    /// Result display time that follows the response window.
    pub fn result_display(&self) -> Duration {
        Duration::from_secs_f64(self.result_display_secs)
    }

    /// Score weights as a value.
    pub fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            confidence_weight: self.confidence_weight,
            time_weight: self.time_weight,
        }
    }

    /// Aggregator settings as a value.
    pub fn aggregator(&self) -> AggregatorConfig {
        AggregatorConfig {
            window_size: self.window_size,
            debounce: Duration::from_secs_f64(self.debounce_secs),
        }
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
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
