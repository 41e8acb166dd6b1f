//! Finger-counting rules.

use super::{Judgement, Outcome};
use tracing::instrument;

/// Smallest target a counting prompt draws.
pub const COUNTING_MIN: u8 = 1;

/// Largest target a counting prompt draws.
pub const COUNTING_MAX: u8 = 5;

pub(super) fn parse(label: &str) -> Option<i64> {
    label.trim().parse().ok()
}

/// Player's `label` against the target number.
#[instrument]
pub(super) fn judge(target: u8, label: &str) -> Judgement {
    match parse(label) {
        None => Judgement::invalid(),
        Some(shown) if shown == i64::from(target) => {
            Judgement::new(Outcome::Correct, 100.0, "Correct!")
        }
        Some(_) => Judgement::new(
            Outcome::Incorrect,
            0.0,
            format!("Incorrect! Target was {}", target),
        ),
    }
}
