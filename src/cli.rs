//! Command-line interface for gesture_rounds.

use clap::{Parser, Subcommand};
use gesture_rounds::{GameKind, GameMode};

/// Gesture Rounds - timed gesture games against a prompt
#[derive(Parser, Debug)]
#[command(name = "gesture_rounds")]
#[command(about = "Round-based gesture games with debounced recognition", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play one game
    ///
    /// In local mode, responses are read from stdin as `label [confidence]`
    /// lines, one recognizer frame per line. An empty line acknowledges the
    /// result on display.
    Play {
        /// Game kind (rps, counting); overrides the config file
        #[arg(short, long)]
        kind: Option<GameKind>,

        /// Operating mode (networked, local, self-play); overrides the config file
        #[arg(short, long)]
        mode: Option<GameMode>,

        /// Number of rounds; overrides the config file
        #[arg(short, long)]
        rounds: Option<u32>,

        /// Response window in seconds; overrides the config file
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Path to a TOML session config
        #[arg(short, long)]
        config: Option<std::path::PathBuf>,

        /// Print events as JSON lines instead of text
        #[arg(long)]
        json: bool,
    },
}
