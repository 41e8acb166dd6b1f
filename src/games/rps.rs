//! Rock-paper-scissors rules.

use super::{Judgement, Outcome};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// One of the three hand gestures.
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
#[strum(ascii_case_insensitive)]
pub enum Gesture {
    /// Closed fist.
    Rock,
    /// Open hand.
    Paper,
    /// Index and middle finger extended.
    Scissors,
}

impl Gesture {
    /// All gestures in draw order.
    pub const ALL: [Gesture; 3] = [Gesture::Rock, Gesture::Paper, Gesture::Scissors];

    /// Parses a recognizer label, ignoring case and surrounding whitespace.
    pub fn parse(label: &str) -> Option<Self> {
        label.trim().parse().ok()
    }

    /// Whether this gesture beats `other`.
    pub fn beats(self, other: Gesture) -> bool {
        matches!(
            (self, other),
            (Gesture::Rock, Gesture::Scissors)
                | (Gesture::Paper, Gesture::Rock)
                | (Gesture::Scissors, Gesture::Paper)
        )
    }

    pub(crate) fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

/// Player's `label` against the system's gesture.
#[instrument]
pub(super) fn judge(system: Gesture, label: &str) -> Judgement {
    let Some(player) = Gesture::parse(label) else {
        return Judgement::invalid();
    };

    if player == system {
        Judgement::new(Outcome::Tie, 50.0, "Tie")
    } else if player.beats(system) {
        Judgement::new(Outcome::Win, 100.0, "You Win!")
    } else {
        Judgement::new(Outcome::Lose, 0.0, "You Lose!")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_gesture_beats_exactly_one() {
        for gesture in Gesture::ALL {
            let beaten = Gesture::ALL.iter().filter(|g| gesture.beats(**g)).count();
            assert_eq!(beaten, 1, "{gesture} should beat exactly one gesture");
            assert!(!gesture.beats(gesture));
        }
    }

    #[test]
    fn test_judge_scissors_against_rock_loses() {
        let judgement = judge(Gesture::Rock, "Scissors");
        assert_eq!(judgement.outcome, Outcome::Lose);
        assert_eq!(judgement.base_score, 0.0);
    }

    #[test]
    fn test_judge_tie_and_win_base_scores() {
        assert_eq!(judge(Gesture::Paper, "paper").base_score, 50.0);
        let win = judge(Gesture::Paper, "Scissors");
        assert_eq!(win.outcome, Outcome::Win);
        assert_eq!(win.base_score, 100.0);
    }

    #[test]
    fn test_judge_unknown_label_is_invalid() {
        assert_eq!(judge(Gesture::Rock, "Unknown").outcome, Outcome::Invalid);
    }
}
