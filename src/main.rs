//! Gesture Rounds - command-line player
//!
//! Runs one game in any mode and prints the event feed.

#![warn(missing_docs)]

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use gesture_rounds::{
    CandidateResponse, EngineHandle, GameEvent, GameMode, GameSummary, LoopbackServer,
    OutboundNotifier, RemoteChannel, RoundEngine, SensorPipeline, SessionConfig,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Play {
            kind,
            mode,
            rounds,
            timeout,
            config,
            json,
        } => {
            let config = load_config(config, kind, mode, rounds, timeout)?;
            run_game(config, json).await
        }
    }
}

/// Loads the session config and applies command-line overrides.
#[instrument(skip(kind, mode, rounds, timeout))]
fn load_config(
    path: Option<PathBuf>,
    kind: Option<gesture_rounds::GameKind>,
    mode: Option<GameMode>,
    rounds: Option<u32>,
    timeout: Option<f64>,
) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => SessionConfig::from_file(&path)?,
        None => {
            info!("No config file given, using defaults");
            SessionConfig::default()
        }
    };

    if let Some(kind) = kind {
        config = config.with_game_kind(kind);
    }
    if let Some(mode) = mode {
        config = config.with_mode(mode);
    }
    if let Some(rounds) = rounds {
        config = config.with_total_rounds(rounds);
    }
    if let Some(timeout) = timeout {
        config = config.with_response_timeout_secs(timeout);
    }

    config.validate()?;
    Ok(config)
}

#[instrument(skip_all, fields(kind = %config.game_kind(), mode = %config.mode()))]
async fn run_game(config: SessionConfig, json: bool) -> Result<()> {
    let (notifier, events) = OutboundNotifier::channel(*config.event_buffer());
    let printer = tokio::spawn(print_events(events, json));

    let remote: Option<Arc<dyn RemoteChannel>> = match config.mode() {
        GameMode::Networked => {
            info!("Using in-process loopback server");
            Some(Arc::new(LoopbackServer::new()))
        }
        _ => None,
    };

    let (mut engine, handle) = RoundEngine::new(&config, remote, notifier.clone())?;

    let sensor = match config.mode() {
        GameMode::Local => {
            let (frames_tx, frames_rx) = mpsc::channel(*config.frame_buffer());
            let pipeline = SensorPipeline::new(config.aggregator(), handle.gate(), notifier.clone());
            spawn_stdin_reader(frames_tx, handle.clone());
            eprintln!("Answer with `<label> [confidence]` lines; an empty line skips the result display.");
            Some(pipeline.spawn(frames_rx))
        }
        _ => None,
    };
    drop(notifier);

    let interrupt = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping game");
            interrupt.stop_game();
        }
    });

    let summary = engine.play().await;

    drop(engine);
    if let Some(sensor) = sensor {
        sensor.abort();
    }
    if tokio::time::timeout(Duration::from_millis(250), printer).await.is_err() {
        debug!("Event printer still draining at exit");
    }

    print_summary(&summary, json)?;
    Ok(())
}

/// Feeds stdin lines to the sensor pipeline from a dedicated thread.
///
/// Blocking reads stay off the runtime so shutdown never waits on input.
fn spawn_stdin_reader(frames: mpsc::Sender<CandidateResponse>, handle: EngineHandle) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let mut parts = line.split_whitespace();
            let Some(label) = parts.next() else {
                handle.acknowledge();
                continue;
            };
            let confidence = match parts.next().map(str::parse::<f64>) {
                Some(Ok(confidence)) => confidence,
                Some(Err(_)) => {
                    warn!(%line, "Unreadable confidence, assuming 1.0");
                    1.0
                }
                None => 1.0,
            };
            if frames
                .blocking_send(CandidateResponse::observed_now(label, confidence))
                .is_err()
            {
                break;
            }
        }
        debug!("Stdin reader finished");
    });
}

async fn print_events(mut events: mpsc::Receiver<GameEvent>, json: bool) {
    while let Some(event) = events.recv().await {
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Could not encode event"),
            }
            continue;
        }

        match event {
            GameEvent::Prompt {
                round,
                total_rounds,
                prompt,
                timeout_secs,
            } => println!(
                "Round {}/{}: {} ({:.1}s)",
                round, total_rounds, prompt, timeout_secs
            ),
            GameEvent::Result(result) => println!("  {}", result.result_text),
            GameEvent::Score {
                cumulative_score, ..
            } => println!("  Total: {:.1}", cumulative_score),
            GameEvent::GameOver(_) => {}
            GameEvent::Error { message } => eprintln!("  Error: {}", message),
        }
    }
}

fn print_summary(summary: &GameSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    let status = if summary.completed { "Game over" } else { "Game stopped" };
    println!(
        "{}: {:.1} points over {}/{} rounds",
        status, summary.cumulative_score, summary.rounds_played, summary.total_rounds
    );
    let tally = &summary.tally;
    println!(
        "Wins {}  Losses {}  Ties {}  Correct {}  Incorrect {}  Invalid {}  Timeouts {}  Skipped {}",
        tally.wins,
        tally.losses,
        tally.ties,
        tally.correct,
        tally.incorrect,
        tally.invalid,
        tally.timeouts,
        tally.skipped
    );
    Ok(())
}
