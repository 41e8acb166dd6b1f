//! Debounced majority vote over raw recognizer labels.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Sentinel label for "no hand in view".
pub const NO_GESTURE: &str = "None";

/// Window and debounce settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of trailing observations that vote.
    pub window_size: usize,
    /// Minimum time between two changes of the reported label.
    pub debounce: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            debounce: Duration::from_secs(1),
        }
    }
}

/// The externally visible gesture and how strongly the window agrees on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureDecision {
    /// Majority label, or [`NO_GESTURE`].
    pub label: String,
    /// Share of the window voting for `label`; 0 for [`NO_GESTURE`].
    pub confidence: f64,
}

impl GestureDecision {
    /// The "no hand in view" decision.
    pub fn none() -> Self {
        Self {
            label: NO_GESTURE.to_string(),
            confidence: 0.0,
        }
    }

    /// Whether this is the "no hand in view" decision.
    pub fn is_none(&self) -> bool {
        self.label == NO_GESTURE
    }
}

impl Default for GestureDecision {
    fn default() -> Self {
        Self::none()
    }
}

/// Turns a noisy label stream into one stable decision.
///
/// The reported label only changes when the window's majority differs from
/// it and the debounce interval has passed since the previous change.
#[derive(Debug, Clone)]
pub struct GestureAggregator {
    config: AggregatorConfig,
    window: VecDeque<String>,
    current: GestureDecision,
    last_change: Option<Instant>,
}

impl GestureAggregator {
    /// Creates an empty aggregator. A zero window size is treated as 1.
    #[instrument]
    pub fn new(config: AggregatorConfig) -> Self {
        let config = AggregatorConfig {
            window_size: config.window_size.max(1),
            ..config
        };
        Self {
            window: VecDeque::with_capacity(config.window_size),
            config,
            current: GestureDecision::none(),
            last_change: None,
        }
    }

    /// Feeds one raw label observed at `at`.
    ///
    /// Returns `true` when the reported label changed.
    pub fn observe(&mut self, label: &str, at: Instant) -> bool {
        let label = normalize(label);
        if self.window.len() == self.config.window_size {
            self.window.pop_front();
        }
        self.window.push_back(label);

        let (majority, count) = self.majority();
        if majority == self.current.label {
            self.current.confidence = self.confidence_for(&majority, count);
            return false;
        }

        let cooled = self
            .last_change
            .is_none_or(|t| at.saturating_duration_since(t) >= self.config.debounce);
        if !cooled {
            let held = self.count_of(&self.current.label);
            self.current.confidence = self.confidence_for(&self.current.label, held);
            debug!(suppressed = %majority, held = %self.current.label, "Debounced label change");
            return false;
        }

        debug!(from = %self.current.label, to = %majority, count, "Reported gesture changed");
        self.current = GestureDecision {
            confidence: self.confidence_for(&majority, count),
            label: majority,
        };
        self.last_change = Some(at);
        true
    }

    /// The currently reported gesture.
    pub fn decision(&self) -> GestureDecision {
        self.current.clone()
    }

    /// Number of observations currently in the window.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Forgets the window and the reported gesture.
    pub fn reset(&mut self) {
        self.window.clear();
        self.current = GestureDecision::none();
        self.last_change = None;
    }

    /// Most frequent label; ties go to the label that appeared first.
    fn majority(&self) -> (String, usize) {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for label in &self.window {
            let count = counts.entry(label.as_str()).or_insert(0);
            if *count == 0 {
                order.push(label.as_str());
            }
            *count += 1;
        }

        let mut best: Option<(&str, usize)> = None;
        for label in order {
            let count = counts[label];
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((label, count));
            }
        }

        best.map(|(label, count)| (label.to_string(), count))
            .unwrap_or_else(|| (NO_GESTURE.to_string(), 0))
    }

    fn count_of(&self, label: &str) -> usize {
        self.window.iter().filter(|l| l.as_str() == label).count()
    }

    fn confidence_for(&self, label: &str, count: usize) -> f64 {
        if label == NO_GESTURE {
            0.0
        } else {
            count as f64 / self.config.window_size as f64
        }
    }
}

fn normalize(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() || label.eq_ignore_ascii_case(NO_GESTURE) {
        NO_GESTURE.to_string()
    } else {
        label.to_string()
    }
}
