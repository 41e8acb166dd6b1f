//! Round scoring: fuses response confidence with a linear time decay.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

/// Relative weights of the confidence and time components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Weight of the recognizer confidence, default 0.7.
    pub confidence_weight: f64,
    /// Weight of the remaining-time fraction, default 0.3.
    pub time_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            confidence_weight: 0.7,
            time_weight: 0.3,
        }
    }
}

/// Pure, kind-agnostic round scorer.
///
/// `score = (confidence * cw + timeComponent * tw) * baseScore`, where
/// the time component decays linearly from 1 at zero elapsed time to 0 at
/// the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScoreModel {
    weights: ScoreWeights,
}

impl ScoreModel {
    /// Creates a scorer with the given weights.
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    /// Returns the configured weights.
    pub fn weights(&self) -> ScoreWeights {
        self.weights
    }

    /// Fraction of the response window still left, in `[0, 1]`.
    #[instrument]
    pub fn time_component(elapsed: Duration, timeout: Duration) -> f64 {
        if timeout.is_zero() {
            return 0.0;
        }
        let timeout = timeout.as_secs_f64();
        ((timeout - elapsed.as_secs_f64()) / timeout).clamp(0.0, 1.0)
    }

    /// Scores one response.
    ///
    /// `base_score` comes from the game kind's outcome mapping; the result
    /// stays within `[0, base_score]` for confidences in `[0, 1]`.
    #[instrument(skip(self))]
    pub fn score(
        &self,
        base_score: f64,
        confidence: f64,
        elapsed: Duration,
        timeout: Duration,
    ) -> f64 {
        let base_score = base_score.max(0.0);
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        let time = Self::time_component(elapsed, timeout);

        let blended =
            confidence * self.weights.confidence_weight + time * self.weights.time_weight;
        (blended * base_score).clamp(0.0, base_score)
    }
}
