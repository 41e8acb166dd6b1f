//! Round orchestration.
//!
//! One [`RoundEngine`] runs every mode. The mode only decides where prompts
//! come from, where results go, and whether the engine also plays the
//! player's side; see [`RoundStrategy`].

use crate::config::{ConfigError, GameMode, SessionConfig};
use crate::games::{GameKind, Prompt, RoundResult};
use crate::gate::{CandidateResponse, Decision, ResponseGate};
use crate::notifier::{GameEvent, OutboundNotifier};
use crate::prompt::{LocalPrompts, PromptSource, RemotePrompts};
use crate::remote::{RemoteChannel, RemoteEvent};
use crate::score::ScoreModel;
use crate::session::{GameSession, GameSummary, RoundState};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, instrument, warn};

/// Control signal shared between the engine and its handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Stop,
    Reset,
}

enum RoundFlow {
    Continue,
    Finished,
    Interrupted(Control),
}

/// Simulated player for self-play: answers every prompt with a random
/// valid label after a random think time inside the response window.
#[derive(Debug)]
pub struct SelfPlayResponder {
    rng: StdRng,
    confidence: f64,
}

impl Default for SelfPlayResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl SelfPlayResponder {
    /// Responder seeded from the operating system, answering with confidence 1.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            confidence: 1.0,
        }
    }

    /// Reproducible responder.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            confidence: 1.0,
        }
    }

    /// Answers the open round through `gate`.
    #[instrument(skip(self, gate))]
    pub fn respond(
        &mut self,
        gate: Arc<ResponseGate>,
        kind: GameKind,
        started: Instant,
        timeout: Duration,
    ) -> JoinHandle<bool> {
        let think = timeout.mul_f64(self.rng.gen_range(0.1..0.9));
        let label = kind.random_label(&mut self.rng);
        let confidence = self.confidence;
        debug!(%label, think_secs = think.as_secs_f64(), "Self-play will answer");

        tokio::spawn(async move {
            sleep_until(started + think).await;
            gate.try_accept(CandidateResponse::new(label, confidence, Instant::now()))
        })
    }
}

/// Mode-selected collaborators of the engine.
pub struct RoundStrategy {
    prompts: Box<dyn PromptSource>,
    remote: Option<Arc<dyn RemoteChannel>>,
    responder: Option<SelfPlayResponder>,
}

impl std::fmt::Debug for RoundStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoundStrategy")
            .field("prompts", &self.prompts.name())
            .field("remote", &self.remote.is_some())
            .field("responder", &self.responder)
            .finish()
    }
}

impl RoundStrategy {
    /// Builds the collaborators for `mode`.
    ///
    /// Networked mode needs `remote`; the other modes ignore it.
    #[instrument(skip(remote))]
    pub fn for_mode(
        mode: GameMode,
        remote: Option<Arc<dyn RemoteChannel>>,
    ) -> Result<Self, ConfigError> {
        match mode {
            GameMode::Networked => {
                let remote = remote.ok_or_else(|| {
                    ConfigError::new("Networked mode requires a remote channel")
                })?;
                Ok(Self::networked(remote))
            }
            GameMode::Local => Ok(Self::local(Box::new(LocalPrompts::new()))),
            GameMode::SelfPlay => Ok(Self::self_play(
                Box::new(LocalPrompts::new()),
                SelfPlayResponder::new(),
            )),
        }
    }

    /// Prompts from the server, results reported back.
    pub fn networked(remote: Arc<dyn RemoteChannel>) -> Self {
        Self {
            prompts: Box::new(RemotePrompts::new(Arc::clone(&remote))),
            remote: Some(remote),
            responder: None,
        }
    }

    /// Prompts from `prompts`, answered by external producers.
    pub fn local(prompts: Box<dyn PromptSource>) -> Self {
        Self {
            prompts,
            remote: None,
            responder: None,
        }
    }

    /// Prompts from `prompts`, answered by `responder`.
    pub fn self_play(prompts: Box<dyn PromptSource>, responder: SelfPlayResponder) -> Self {
        Self {
            prompts,
            remote: None,
            responder: Some(responder),
        }
    }
}

/// Cloneable remote control for a running engine.
///
/// Everything here is safe to call from any task or thread, at any time.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    control: Arc<watch::Sender<Control>>,
    state: watch::Receiver<RoundState>,
    ack: mpsc::Sender<()>,
    remote_events: mpsc::Sender<RemoteEvent>,
    gate: Arc<ResponseGate>,
}

impl EngineHandle {
    /// Stops the game in flight and returns the engine to `Idle`. Idempotent.
    #[instrument(skip(self))]
    pub fn stop_game(&self) {
        self.control.send_if_modified(|control| {
            if *control == Control::Run {
                *control = Control::Stop;
                true
            } else {
                false
            }
        });
    }

    /// Stops the game in flight and zeroes the session counters.
    #[instrument(skip(self))]
    pub fn reset_game(&self) {
        self.control.send_replace(Control::Reset);
    }

    /// Ends the current result display early.
    pub fn acknowledge(&self) {
        let _ = self.ack.try_send(());
    }

    /// Offers a candidate response for the open round.
    pub fn submit(&self, candidate: CandidateResponse) -> bool {
        self.gate.try_accept(candidate)
    }

    /// Queue for server-initiated events.
    pub fn remote_events(&self) -> mpsc::Sender<RemoteEvent> {
        self.remote_events.clone()
    }

    /// The gate shared by every response producer.
    pub fn gate(&self) -> Arc<ResponseGate> {
        Arc::clone(&self.gate)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RoundState {
        *self.state.borrow()
    }

    /// Watches lifecycle transitions.
    pub fn watch_state(&self) -> watch::Receiver<RoundState> {
        self.state.clone()
    }
}

/// The round lifecycle state machine.
#[derive(Debug)]
pub struct RoundEngine {
    session: GameSession,
    strategy: RoundStrategy,
    gate: Arc<ResponseGate>,
    notifier: OutboundNotifier,
    score_model: ScoreModel,
    result_display: Duration,
    state: watch::Sender<RoundState>,
    control: Arc<watch::Sender<Control>>,
    control_rx: watch::Receiver<Control>,
    ack_rx: mpsc::Receiver<()>,
    remote_rx: Option<mpsc::Receiver<RemoteEvent>>,
    pending_kind: Option<GameKind>,
    responder_task: Option<JoinHandle<bool>>,
}

impl RoundEngine {
    /// Creates an engine for `config.mode()`.
    ///
    /// Fails before any round runs when the configuration is invalid or the
    /// mode is missing a collaborator; the failure is also published as an
    /// error event.
    #[instrument(skip_all, fields(kind = %config.game_kind(), mode = %config.mode()))]
    pub fn new(
        config: &SessionConfig,
        remote: Option<Arc<dyn RemoteChannel>>,
        notifier: OutboundNotifier,
    ) -> Result<(Self, EngineHandle), ConfigError> {
        match RoundStrategy::for_mode(*config.mode(), remote) {
            Ok(strategy) => Self::with_strategy(config, strategy, notifier),
            Err(e) => {
                notifier.publish(GameEvent::error(e.message.clone()));
                Err(e)
            }
        }
    }

    /// Creates an engine with explicit collaborators.
    #[instrument(skip_all, fields(kind = %config.game_kind(), mode = %config.mode()))]
    pub fn with_strategy(
        config: &SessionConfig,
        strategy: RoundStrategy,
        notifier: OutboundNotifier,
    ) -> Result<(Self, EngineHandle), ConfigError> {
        let session = match GameSession::new(config) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "Refusing to create session");
                notifier.publish(GameEvent::error(e.message.clone()));
                return Err(e);
            }
        };

        let gate = Arc::new(ResponseGate::new());
        let (control, control_rx) = watch::channel(Control::Run);
        let control = Arc::new(control);
        let (state, state_rx) = watch::channel(RoundState::Idle);
        let (ack_tx, ack_rx) = mpsc::channel(1);
        let (remote_tx, remote_rx) = mpsc::channel(*config.remote_queue());

        let handle = EngineHandle {
            control: Arc::clone(&control),
            state: state_rx,
            ack: ack_tx,
            remote_events: remote_tx,
            gate: Arc::clone(&gate),
        };

        info!(strategy = ?strategy, "Round engine created");
        let engine = Self {
            session,
            strategy,
            gate,
            notifier,
            score_model: ScoreModel::new(config.score_weights()),
            result_display: config.result_display(),
            state,
            control,
            control_rx,
            ack_rx,
            remote_rx: Some(remote_rx),
            pending_kind: None,
            responder_task: None,
        };
        Ok((engine, handle))
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RoundState {
        *self.state.borrow()
    }

    /// The session counters.
    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// The gate shared by every response producer.
    pub fn gate(&self) -> Arc<ResponseGate> {
        Arc::clone(&self.gate)
    }

    /// Plays the configured number of rounds.
    pub async fn play(&mut self) -> GameSummary {
        let total_rounds = *self.session.total_rounds();
        self.start_game(total_rounds).await
    }

    /// Plays `total_rounds` rounds, or until stopped or reset.
    ///
    /// Never fails: collaborator problems skip rounds and surface as error
    /// events. The returned summary says whether the game ran to completion.
    #[instrument(skip(self), fields(kind = %self.session.kind(), mode = %self.session.mode()))]
    pub async fn start_game(&mut self, total_rounds: u32) -> GameSummary {
        self.control.send_replace(Control::Run);
        if let Err(e) = self.session.restart(total_rounds) {
            warn!(error = %e, "Refusing to start game");
            self.notifier.publish(GameEvent::error(e.message.clone()));
            return self.session.summary(false);
        }

        info!(total_rounds, "Game started");
        self.transition(RoundState::Waiting);

        loop {
            match self.run_round().await {
                RoundFlow::Continue => {}
                RoundFlow::Finished => break,
                RoundFlow::Interrupted(control) => return self.halt(control),
            }
        }

        self.transition(RoundState::GameOver);
        let summary = self.session.summary(true);
        info!(
            cumulative_score = summary.cumulative_score,
            rounds = summary.rounds_played,
            "Game over"
        );
        self.notifier.publish(GameEvent::GameOver(summary.clone()));
        summary
    }

    async fn run_round(&mut self) -> RoundFlow {
        if let Some(kind) = self.pending_kind.take() {
            info!(%kind, "Switching game kind");
            self.session.set_kind(kind);
        }
        let Some(round) = self.session.begin_round() else {
            return RoundFlow::Finished;
        };
        let kind = *self.session.kind();
        let timeout = *self.session.response_timeout();

        let fetched = {
            let next = self.strategy.prompts.next_prompt(kind, timeout);
            tokio::pin!(next);
            loop {
                tokio::select! {
                    biased;
                    control = interrupted(&mut self.control_rx) => return RoundFlow::Interrupted(control),
                    event = recv_remote(&mut self.remote_rx) => {
                        if let Some(control) = triage(event, &self.gate, &self.notifier, &mut self.pending_kind) {
                            return RoundFlow::Interrupted(control);
                        }
                    }
                    fetched = &mut next => break fetched,
                }
            }
        };

        let prompt = match fetched {
            Ok(prompt) if prompt.kind() == kind => prompt,
            Ok(prompt) => {
                warn!(round, %prompt, %kind, "Prompt does not match game kind, skipping round");
                self.notifier.publish(GameEvent::error(format!(
                    "Round {} skipped: prompt {} is not a {} prompt",
                    round, prompt, kind
                )));
                self.session.record_skip();
                return RoundFlow::Continue;
            }
            Err(e) => {
                warn!(round, error = %e, "No prompt available, skipping round");
                self.notifier.publish(GameEvent::error(format!(
                    "Round {} skipped: {}",
                    round, e.message
                )));
                self.session.record_skip();
                return RoundFlow::Continue;
            }
        };

        let started = Instant::now();
        match self.prompted(round, prompt, started, timeout).await {
            Ok(result) => self.responded(result, started + timeout).await,
            Err(control) => RoundFlow::Interrupted(control),
        }
    }

    /// `Waiting → Prompted → Responded`: opens the gate, waits for the first
    /// decision or the deadline, and settles the round exactly once.
    /// Returns the interrupting control when stopped or reset first.
    #[instrument(skip(self, started), fields(kind = %self.session.kind()))]
    async fn prompted(
        &mut self,
        round: u32,
        prompt: Prompt,
        started: Instant,
        timeout: Duration,
    ) -> Result<RoundResult, Control> {
        let kind = *self.session.kind();
        self.gate.open(round, kind, started, timeout);
        self.transition(RoundState::Prompted);
        self.notifier.publish(GameEvent::Prompt {
            round,
            total_rounds: *self.session.total_rounds(),
            prompt,
            timeout_secs: timeout.as_secs_f64(),
        });

        if let Some(responder) = self.strategy.responder.as_mut() {
            let gate = Arc::clone(&self.gate);
            self.responder_task = Some(responder.respond(gate, kind, started, timeout));
        }

        let deadline = started + timeout;
        loop {
            tokio::select! {
                biased;
                control = interrupted(&mut self.control_rx) => {
                    self.abort_responder();
                    return Err(control);
                }
                _ = self.gate.decided(round) => break,
                _ = sleep_until(deadline) => break,
                event = recv_remote(&mut self.remote_rx) => {
                    if let Some(control) = triage(event, &self.gate, &self.notifier, &mut self.pending_kind) {
                        self.abort_responder();
                        return Err(control);
                    }
                }
            }
        }
        self.abort_responder();

        let decision = self.gate.resolve(round).unwrap_or(Decision::NoResponse);
        let result = RoundResult::settle(round, &prompt, &decision, &self.score_model, timeout);
        self.session.record(&result);
        self.transition(RoundState::Responded);

        info!(
            outcome = %result.outcome,
            round_score = result.round_score,
            cumulative = *self.session.cumulative_score(),
            "Round settled"
        );
        Ok(result)
    }

    /// `Responded → Waiting`: reports the result, then holds it on display
    /// until the cooldown ends or the UI acknowledges it.
    async fn responded(&mut self, result: RoundResult, window_end: Instant) -> RoundFlow {
        let round = result.round;
        if let Some(remote) = &self.strategy.remote {
            remote.submit_result(self.session.player_id(), &result.result_text, result.round_score);
        }
        self.notifier.publish(GameEvent::Result(result));
        self.notifier.publish(GameEvent::Score {
            round,
            cumulative_score: *self.session.cumulative_score(),
        });

        while self.ack_rx.try_recv().is_ok() {}
        let cooldown_end = window_end + self.result_display;
        loop {
            tokio::select! {
                biased;
                control = interrupted(&mut self.control_rx) => return RoundFlow::Interrupted(control),
                _ = sleep_until(cooldown_end) => break,
                Some(()) = self.ack_rx.recv() => {
                    debug!(round, "Result acknowledged");
                    break;
                }
                event = recv_remote(&mut self.remote_rx) => {
                    if let Some(control) = triage(event, &self.gate, &self.notifier, &mut self.pending_kind) {
                        return RoundFlow::Interrupted(control);
                    }
                }
            }
        }

        self.transition(RoundState::Waiting);
        RoundFlow::Continue
    }

    fn halt(&mut self, control: Control) -> GameSummary {
        self.gate.close();
        self.abort_responder();
        let summary = self.session.summary(false);
        if control == Control::Reset {
            self.session.reset();
        }
        self.transition(RoundState::Idle);
        info!(?control, rounds = summary.rounds_played, "Game halted");
        summary
    }

    fn abort_responder(&mut self) {
        if let Some(task) = self.responder_task.take() {
            task.abort();
        }
    }

    fn transition(&self, next: RoundState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "State transition");
        }
    }
}

/// Completes when a stop or reset is requested.
async fn interrupted(rx: &mut watch::Receiver<Control>) -> Control {
    let control = rx
        .wait_for(|control| *control != Control::Run)
        .await
        .map(|control| *control);
    match control {
        Ok(control) => control,
        Err(_) => std::future::pending().await,
    }
}

async fn recv_remote(rx: &mut Option<mpsc::Receiver<RemoteEvent>>) -> Option<RemoteEvent> {
    if let Some(inner) = rx.as_mut() {
        let event = inner.recv().await;
        if event.is_none() {
            *rx = None;
        }
        return event;
    }
    std::future::pending().await
}

/// Applies one inbound remote event. Returns a control signal when the
/// event ends the game in flight.
fn triage(
    event: Option<RemoteEvent>,
    gate: &ResponseGate,
    notifier: &OutboundNotifier,
    pending_kind: &mut Option<GameKind>,
) -> Option<Control> {
    let Some(event) = event else {
        debug!("Remote event queue closed");
        return None;
    };

    match event {
        RemoteEvent::Candidate(candidate) => {
            let accepted = gate.try_accept(candidate);
            debug!(accepted, "Remote candidate offered");
            None
        }
        RemoteEvent::Reset => {
            info!("Server requested reset");
            Some(Control::Reset)
        }
        RemoteEvent::GameKindChanged(kind) => {
            info!(%kind, "Server changed game kind");
            *pending_kind = Some(kind);
            None
        }
        RemoteEvent::Error(message) => {
            warn!(%message, "Server reported error");
            notifier.publish(GameEvent::error(message));
            None
        }
        RemoteEvent::Disconnected => {
            warn!("Remote connection dropped");
            notifier.publish(GameEvent::error("Disconnected from server"));
            None
        }
    }
}
