//! Game kinds, prompts, and the per-kind rules that judge a response.

mod counting;
mod rps;

pub use counting::{COUNTING_MAX, COUNTING_MIN};
pub use rps::Gesture;

use crate::gate::Decision;
use crate::score::ScoreModel;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::instrument;

/// Which game a session plays.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameKind {
    /// Rock-paper-scissors against a prompted gesture.
    Rps,
    /// Show the prompted number of fingers.
    Counting,
}

impl GameKind {
    /// Response window used when the configuration does not set one.
    #[instrument]
    pub fn default_timeout(self) -> Duration {
        match self {
            Self::Rps => Duration::from_secs(3),
            Self::Counting => Duration::from_secs(5),
        }
    }

    /// Draws a fresh prompt for this kind.
    pub fn draw_prompt(self, rng: &mut impl Rng) -> Prompt {
        match self {
            Self::Rps => Prompt::Gesture(Gesture::random(rng)),
            Self::Counting => Prompt::Target(rng.gen_range(COUNTING_MIN..=COUNTING_MAX)),
        }
    }

    /// Draws a syntactically valid response label, as a simulated player would.
    pub fn random_label(self, rng: &mut impl Rng) -> String {
        match self {
            Self::Rps => Gesture::random(rng).to_string(),
            Self::Counting => rng.gen_range(COUNTING_MIN..=COUNTING_MAX).to_string(),
        }
    }

    /// Whether `label` satisfies this kind's syntactic constraint.
    ///
    /// Rock-paper-scissors labels must name a gesture; counting labels
    /// must parse as an integer.
    #[instrument]
    pub fn accepts_label(self, label: &str) -> bool {
        match self {
            Self::Rps => Gesture::parse(label).is_some(),
            Self::Counting => counting::parse(label).is_some(),
        }
    }
}

/// The challenge shown to the player for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    /// The system's gesture (rock-paper-scissors).
    Gesture(Gesture),
    /// The number of fingers to show (counting).
    Target(u8),
}

impl Prompt {
    /// The game kind this prompt belongs to.
    pub fn kind(&self) -> GameKind {
        match self {
            Self::Gesture(_) => GameKind::Rps,
            Self::Target(_) => GameKind::Counting,
        }
    }

    /// Judges a syntactically checked response label against this prompt.
    #[instrument]
    pub fn judge(&self, label: &str) -> Judgement {
        match *self {
            Self::Gesture(system) => rps::judge(system, label),
            Self::Target(target) => counting::judge(target, label),
        }
    }

    /// Text shown when the round ends without any response.
    pub fn no_response_text(&self) -> String {
        match self {
            Self::Gesture(_) => "No Response!".to_string(),
            Self::Target(target) => format!("No Response! Target was {}", target),
        }
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gesture(gesture) => write!(f, "{}", gesture),
            Self::Target(target) => write!(f, "{}", target),
        }
    }
}

/// How a round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
pub enum Outcome {
    /// Player's gesture beats the system's.
    Win,
    /// System's gesture beats the player's.
    Lose,
    /// Same gesture on both sides.
    Tie,
    /// Counting response matched the target.
    Correct,
    /// Counting response missed the target.
    Incorrect,
    /// Response did not parse for the active game kind.
    Invalid,
    /// No usable response before the deadline.
    Timeout,
}

/// Outcome of judging a label, before time and confidence are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Judgement {
    /// Outcome class.
    pub outcome: Outcome,
    /// Score awarded at full confidence and zero elapsed time.
    pub base_score: f64,
    /// Human-readable outcome text.
    pub text: String,
}

impl Judgement {
    pub(crate) fn new(outcome: Outcome, base_score: f64, text: impl Into<String>) -> Self {
        Self {
            outcome,
            base_score,
            text: text.into(),
        }
    }

    /// Judgement for a label that failed the syntactic check.
    pub fn invalid() -> Self {
        Self::new(Outcome::Invalid, 0.0, "Invalid input!")
    }
}

/// The immutable result of one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// 1-based round number.
    pub round: u32,
    /// Prompt the round was played against.
    pub prompt: Prompt,
    /// The accepted response label, if any.
    pub response: Option<String>,
    /// How the round ended.
    pub outcome: Outcome,
    /// Score added to the session total.
    pub round_score: f64,
    /// Text for the display layer.
    pub result_text: String,
}

impl RoundResult {
    /// Derives the round result from the prompt and the gate's decision.
    ///
    /// Scoring happens here and only here: timeouts, late and invalid
    /// responses never reach the score model.
    #[instrument(skip(model))]
    pub fn settle(
        round: u32,
        prompt: &Prompt,
        decision: &Decision,
        model: &ScoreModel,
        timeout: Duration,
    ) -> Self {
        let (response, outcome, round_score, result_text) = match decision {
            Decision::Accepted {
                label,
                confidence,
                elapsed,
            } => {
                let judgement = prompt.judge(label);
                let score = model.score(judgement.base_score, *confidence, *elapsed, timeout);
                let text = if judgement.base_score > 0.0 {
                    format!("{} | Score: {:.1}", judgement.text, score)
                } else {
                    judgement.text
                };
                (Some(label.clone()), judgement.outcome, score, text)
            }
            Decision::Invalid { label, .. } => {
                let judgement = Judgement::invalid();
                (Some(label.clone()), judgement.outcome, 0.0, judgement.text)
            }
            Decision::TooSlow { label } => (
                Some(label.clone()),
                Outcome::Timeout,
                0.0,
                "Too Slow!".to_string(),
            ),
            Decision::NoResponse => (None, Outcome::Timeout, 0.0, prompt.no_response_text()),
        };

        Self {
            round,
            prompt: *prompt,
            response,
            outcome,
            round_score,
            result_text,
        }
    }
}
