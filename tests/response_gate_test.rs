//! Tests for first-writer-wins response arbitration.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use gesture_rounds::{CandidateResponse, Decision, GameKind, ResponseGate};
use tokio::time::Instant;

fn candidate(label: &str, confidence: f64, observed_at: Instant) -> CandidateResponse {
    CandidateResponse::new(label.to_string(), confidence, observed_at)
}

#[test]
fn test_concurrent_offers_accept_exactly_one() {
    let gate = Arc::new(ResponseGate::new());
    let started = Instant::now();
    gate.open(1, GameKind::Rps, started, Duration::from_secs(60));

    let wins = Arc::new(AtomicUsize::new(0));
    let threads: Vec<_> = (0..16)
        .map(|i| {
            let gate = Arc::clone(&gate);
            let wins = Arc::clone(&wins);
            std::thread::spawn(move || {
                let label = ["Rock", "Paper", "Scissors"][i % 3];
                if gate.try_accept(candidate(label, 0.9, Instant::now())) {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().expect("Offer thread panicked");
    }

    assert_eq!(wins.load(Ordering::SeqCst), 1);
    assert!(matches!(gate.resolve(1), Some(Decision::Accepted { .. })));
}

#[test]
fn test_closed_gate_drops_candidates() {
    let gate = ResponseGate::new();
    assert!(!gate.try_accept(candidate("Rock", 1.0, Instant::now())));
    assert_eq!(gate.open_round(), None);
}

#[test]
fn test_invalid_label_consumes_the_round() {
    let gate = ResponseGate::new();
    let started = Instant::now();
    gate.open(1, GameKind::Counting, started, Duration::from_secs(5));

    assert!(gate.try_accept(candidate("Rock", 0.9, started)));
    assert!(!gate.try_accept(candidate("3", 0.9, started)));
    assert!(matches!(
        gate.resolve(1),
        Some(Decision::Invalid { ref label, .. }) if label == "Rock"
    ));
}

#[test]
fn test_late_observation_is_too_slow() {
    let gate = ResponseGate::new();
    let started = Instant::now();
    gate.open(1, GameKind::Rps, started, Duration::from_secs(3));

    let late = started + Duration::from_millis(3500);
    assert!(gate.try_accept(candidate("Paper", 1.0, late)));
    assert_eq!(
        gate.resolve(1),
        Some(Decision::TooSlow {
            label: "Paper".to_string()
        })
    );
}

#[test]
fn test_accepted_elapsed_is_measured_from_round_start() {
    let gate = ResponseGate::new();
    let started = Instant::now();
    gate.open(1, GameKind::Counting, started, Duration::from_secs(5));

    assert!(gate.try_accept(candidate("3", 1.7, started + Duration::from_secs(2))));
    assert_eq!(
        gate.resolve(1),
        Some(Decision::Accepted {
            label: "3".to_string(),
            confidence: 1.0,
            elapsed: Duration::from_secs(2),
        })
    );
}

#[test]
fn test_resolve_without_candidate_is_no_response() {
    let gate = ResponseGate::new();
    gate.open(4, GameKind::Rps, Instant::now(), Duration::from_secs(3));

    assert_eq!(gate.resolve(4), Some(Decision::NoResponse));
    assert!(!gate.try_accept(candidate("Rock", 1.0, Instant::now())));
    assert_eq!(gate.resolve(4), Some(Decision::NoResponse));
}

#[test]
fn test_resolve_ignores_other_rounds() {
    let gate = ResponseGate::new();
    gate.open(2, GameKind::Rps, Instant::now(), Duration::from_secs(3));
    assert_eq!(gate.resolve(1), None);
    assert_eq!(gate.open_round(), Some(2));
}

#[test]
fn test_reopen_discards_previous_decision() {
    let gate = ResponseGate::new();
    let started = Instant::now();
    gate.open(1, GameKind::Rps, started, Duration::from_secs(3));
    assert!(gate.try_accept(candidate("Rock", 1.0, started)));

    gate.open(2, GameKind::Rps, started, Duration::from_secs(3));
    assert_eq!(gate.open_round(), Some(2));
    assert!(gate.try_accept(candidate("Paper", 1.0, started)));
    assert_eq!(gate.resolve(1), None);
}

#[tokio::test]
async fn test_decided_completes_after_accept() {
    let gate = Arc::new(ResponseGate::new());
    let started = Instant::now();
    gate.open(1, GameKind::Rps, started, Duration::from_secs(3));

    let waiter = {
        let gate = Arc::clone(&gate);
        tokio::spawn(async move { gate.decided(1).await })
    };
    assert!(gate.try_accept(candidate("Scissors", 0.8, started)));

    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("decided() did not complete")
        .expect("Waiter task failed");
}
