//! Tests for the recognizer feed feeding the response gate.

use std::sync::Arc;
use std::time::Duration;

use gesture_rounds::{
    AggregatorConfig, CandidateResponse, Decision, GameEvent, GameKind, GameMode, Gesture,
    LocalPrompts, OutboundNotifier, Outcome, Prompt, ResponseGate, RoundEngine, RoundStrategy,
    SensorPipeline, SessionConfig,
};
use tokio::sync::mpsc;
use tokio::time::Instant;

fn pipeline(gate: Arc<ResponseGate>) -> SensorPipeline {
    SensorPipeline::new(
        AggregatorConfig {
            window_size: 3,
            debounce: Duration::from_millis(500),
        },
        gate,
        OutboundNotifier::detached(),
    )
}

#[test]
fn test_frames_without_open_round_are_not_offered() {
    let gate = Arc::new(ResponseGate::new());
    let mut sensor = pipeline(Arc::clone(&gate));

    assert!(!sensor.ingest(CandidateResponse::observed_now("Rock", 0.9)));
    let reported = sensor.subscribe().borrow().clone();
    assert_eq!(reported.label, "Rock");
    assert!((reported.confidence - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn test_stable_gesture_decides_open_round() {
    let gate = Arc::new(ResponseGate::new());
    let started = Instant::now();
    gate.open(1, GameKind::Rps, started, Duration::from_secs(3));
    let mut sensor = pipeline(Arc::clone(&gate));

    assert!(sensor.ingest(CandidateResponse::new("Paper".to_string(), 0.6, started)));
    assert!(!sensor.ingest(CandidateResponse::new("Paper".to_string(), 0.6, started)));

    match gate.resolve(1) {
        Some(Decision::Accepted { label, .. }) => assert_eq!(label, "Paper"),
        other => panic!("Unexpected decision: {:?}", other),
    }
}

#[test]
fn test_no_gesture_is_never_offered() {
    let gate = Arc::new(ResponseGate::new());
    let started = Instant::now();
    gate.open(1, GameKind::Counting, started, Duration::from_secs(5));
    let mut sensor = pipeline(Arc::clone(&gate));

    for label in ["", "none", "None", "NONE", " none "] {
        assert!(!sensor.ingest(CandidateResponse::new(label.to_string(), 0.0, started)));
    }
    assert_eq!(gate.open_round(), Some(1));
}

#[tokio::test]
async fn test_closed_feed_reports_error() {
    let gate = Arc::new(ResponseGate::new());
    let (notifier, mut events) = OutboundNotifier::channel(4);
    let sensor = SensorPipeline::new(AggregatorConfig::default(), gate, notifier);

    let (frames_tx, frames_rx) = mpsc::channel(4);
    let task = sensor.spawn(frames_rx);
    drop(frames_tx);
    task.await.expect("Sensor task failed");

    assert!(matches!(events.try_recv(), Ok(GameEvent::Error { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_recognizer_frames_win_local_round() {
    let config = SessionConfig::new(GameKind::Rps, GameMode::Local, 1).with_window(3, 0.2);
    let (notifier, mut events) = OutboundNotifier::channel(64);
    let strategy = RoundStrategy::local(Box::new(LocalPrompts::seeded(21)));
    let (mut engine, handle) = RoundEngine::with_strategy(&config, strategy, notifier.clone())
        .expect("Engine creation failed");

    let sensor = SensorPipeline::new(config.aggregator(), handle.gate(), notifier);
    let (frames_tx, frames_rx) = mpsc::channel(16);
    sensor.spawn(frames_rx);

    let camera = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                GameEvent::Prompt {
                    prompt: Prompt::Gesture(system),
                    ..
                } => {
                    let winner = Gesture::ALL
                        .into_iter()
                        .find(|gesture| gesture.beats(system))
                        .expect("Every gesture is beaten by another");
                    for _ in 0..3 {
                        let frame = CandidateResponse::observed_now(winner.to_string(), 0.95);
                        frames_tx.send(frame).await.expect("Sensor stopped");
                    }
                }
                GameEvent::Result(result) => return Some(result),
                _ => {}
            }
        }
        None
    });

    let summary = engine.play().await;
    let result = camera
        .await
        .expect("Camera task failed")
        .expect("No result published");

    assert!(summary.completed);
    assert_eq!(result.outcome, Outcome::Win);
    assert!(result.round_score > 0.0);
}
