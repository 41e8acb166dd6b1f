//! Mode-dependent prompt sourcing.

use crate::games::{GameKind, Prompt};
use crate::remote::{RemoteChannel, RemoteError};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Produces the prompt for the next round.
#[async_trait::async_trait]
pub trait PromptSource: Send + Sync {
    /// Returns the next prompt for `kind`, waiting at most `wait`.
    ///
    /// An error means no prompt is available this round; the engine skips it.
    async fn next_prompt(&mut self, kind: GameKind, wait: Duration) -> Result<Prompt, RemoteError>;

    /// Returns the source's display name.
    fn name(&self) -> &str;
}

/// Draws prompts locally from a generator seeded once per source.
#[derive(Debug)]
pub struct LocalPrompts {
    rng: StdRng,
}

impl Default for LocalPrompts {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPrompts {
    /// Seeds from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for tests and replays.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

#[async_trait::async_trait]
impl PromptSource for LocalPrompts {
    #[instrument(skip(self, _wait))]
    async fn next_prompt(&mut self, kind: GameKind, _wait: Duration) -> Result<Prompt, RemoteError> {
        let prompt = kind.draw_prompt(&mut self.rng);
        debug!(%prompt, "Drew local prompt");
        Ok(prompt)
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Asks a remote server for each prompt, bounded by the caller's wait.
pub struct RemotePrompts {
    remote: Arc<dyn RemoteChannel>,
}

impl RemotePrompts {
    /// Wraps a remote channel.
    pub fn new(remote: Arc<dyn RemoteChannel>) -> Self {
        Self { remote }
    }
}

impl std::fmt::Debug for RemotePrompts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotePrompts").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl PromptSource for RemotePrompts {
    #[instrument(skip(self))]
    async fn next_prompt(&mut self, kind: GameKind, wait: Duration) -> Result<Prompt, RemoteError> {
        match tokio::time::timeout(wait, self.remote.request_prompt(kind)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(wait_secs = wait.as_secs_f64(), "No prompt from server in time");
                Err(RemoteError::new(format!(
                    "No prompt received within {:.1}s",
                    wait.as_secs_f64()
                )))
            }
        }
    }

    fn name(&self) -> &str {
        "remote"
    }
}
