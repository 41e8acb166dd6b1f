//! Tests for the debounced majority vote.

use std::time::Duration;

use gesture_rounds::{AggregatorConfig, GestureAggregator, NO_GESTURE};
use tokio::time::Instant;

fn aggregator(window_size: usize, debounce_ms: u64) -> GestureAggregator {
    GestureAggregator::new(AggregatorConfig {
        window_size,
        debounce: Duration::from_millis(debounce_ms),
    })
}

#[test]
fn test_starts_with_no_gesture() {
    let agg = aggregator(5, 1000);
    let decision = agg.decision();
    assert!(decision.is_none());
    assert_eq!(decision.label, NO_GESTURE);
    assert_eq!(decision.confidence, 0.0);
    assert!(agg.is_empty());
}

#[test]
fn test_confidence_is_share_of_full_window() {
    let mut agg = aggregator(5, 0);
    let now = Instant::now();

    assert!(agg.observe("Rock", now));
    assert!(!agg.observe("Rock", now));
    assert!(!agg.observe("Rock", now));

    let decision = agg.decision();
    assert_eq!(decision.label, "Rock");
    assert!((decision.confidence - 0.6).abs() < 1e-9);
}

#[test]
fn test_window_evicts_oldest_observation() {
    let mut agg = aggregator(3, 0);
    let now = Instant::now();
    for label in ["Rock", "Rock", "Rock", "Paper", "Paper"] {
        agg.observe(label, now);
    }

    assert_eq!(agg.len(), 3);
    let decision = agg.decision();
    assert_eq!(decision.label, "Paper");
    assert!((decision.confidence - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_tie_goes_to_first_seen_label() {
    let mut agg = aggregator(2, 0);
    let now = Instant::now();
    agg.observe("Scissors", now);
    agg.observe("Paper", now);

    assert_eq!(agg.decision().label, "Scissors");
}

#[test]
fn test_change_waits_for_debounce_interval() {
    let mut agg = aggregator(5, 1000);
    let start = Instant::now();
    for _ in 0..5 {
        agg.observe("Rock", start);
    }
    assert_eq!(agg.decision().label, "Rock");

    let soon = start + Duration::from_millis(300);
    for _ in 0..5 {
        assert!(!agg.observe("Paper", soon));
    }
    let held = agg.decision();
    assert_eq!(held.label, "Rock");
    assert_eq!(held.confidence, 0.0);

    let later = start + Duration::from_millis(1000);
    assert!(agg.observe("Paper", later));
    let decision = agg.decision();
    assert_eq!(decision.label, "Paper");
    assert_eq!(decision.confidence, 1.0);
}

#[test]
fn test_flicker_does_not_change_reported_label() {
    let mut agg = aggregator(5, 0);
    let now = Instant::now();
    for label in ["Rock", "Rock", "Rock", "Paper", "Rock", "Scissors"] {
        agg.observe(label, now);
    }
    assert_eq!(agg.decision().label, "Rock");
}

#[test]
fn test_empty_label_counts_as_no_gesture() {
    let mut agg = aggregator(3, 0);
    let now = Instant::now();
    agg.observe("Rock", now);
    agg.observe("", now);
    agg.observe("  ", now);

    let decision = agg.decision();
    assert!(decision.is_none());
    assert_eq!(decision.confidence, 0.0);
}

#[test]
fn test_zero_window_is_treated_as_one() {
    let mut agg = aggregator(0, 0);
    let now = Instant::now();
    agg.observe("Rock", now);
    agg.observe("Paper", now);

    assert_eq!(agg.len(), 1);
    assert_eq!(agg.decision().label, "Paper");
    assert_eq!(agg.decision().confidence, 1.0);
}

#[test]
fn test_reset_forgets_everything() {
    let mut agg = aggregator(3, 1000);
    let now = Instant::now();
    agg.observe("Rock", now);
    agg.reset();

    assert!(agg.is_empty());
    assert!(agg.decision().is_none());
    assert!(agg.observe("Paper", now));
}

#[test]
fn test_none_label_matches_sentinel_in_any_case() {
    let mut agg = aggregator(3, 0);
    let now = Instant::now();
    agg.observe("Rock", now);
    agg.observe("none", now);
    agg.observe("NONE", now);

    let decision = agg.decision();
    assert!(decision.is_none());
    assert_eq!(decision.label, NO_GESTURE);
    assert_eq!(decision.confidence, 0.0);
}
