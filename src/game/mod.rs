//! Calibrator gameplay core.
//!
//! A single signal travels from the left end of the track toward the right.
//! The player triggers while it is inside the central target zone; five hits
//! in a row win the session and queue one reward request. Everything here is
//! plain Rust so it runs under `cargo test` on the host; the browser glue in
//! `widget` only calls into [`RoundController`].
//!
//! Lifecycle: `start()` → `advance_frame()`/`trigger()` repeatedly → `reset()`
//! or `dispose()`. Every start/reset/dispose bumps the session epoch, and
//! reward results tagged with an older epoch are dropped.

pub mod clock;
pub mod zone;

use log::{debug, info};
use serde::Serialize;

use crate::config::GameTuning;
use clock::Motion;
use zone::{TargetZone, Verdict};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Traveling,
    Hit,
    Miss,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Playing,
    Won,
}

/// Flattened view of status + phase, the states a host draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Idle,
    Traveling,
    Hit,
    Miss,
    Won,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignalState {
    pub position: f64,
    pub phase: Phase,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoundState {
    pub score: u32,
    pub cooldown_remaining: f64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameSession {
    pub is_playing: bool,
    pub can_accept_input: bool,
    pub reward: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Not playing, input already consumed this round, or not traveling.
    Ignored,
    Hit { score: u32 },
    Miss,
    /// The hit that reached the win score.
    Won,
}

/// Handle for one reward request; only valid for the session that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardTicket {
    epoch: u64,
}

impl RewardTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Read-only HUD data, serialized for the JS side.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HudSnapshot {
    pub state: ControllerState,
    pub phase: Phase,
    pub score: u32,
    pub win_score: u32,
    pub position: f64,
    pub cooldown_remaining: f64,
    pub speed_multiplier: f64,
    pub is_playing: bool,
    pub reward: Option<String>,
    pub reward_pending: bool,
}

pub struct RoundController {
    tuning: GameTuning,
    zone: TargetZone,
    status: SessionStatus,
    signal: SignalState,
    round: RoundState,
    session: GameSession,
    epoch: u64,
    pending_reward: Option<RewardTicket>,
    awaiting_reward: bool,
    input_queued: bool,
}

impl Default for RoundController {
    fn default() -> Self {
        Self::new(GameTuning::default())
    }
}

impl RoundController {
    pub fn new(tuning: GameTuning) -> Self {
        let zone = TargetZone::new(tuning.target_zone_width);
        let start = tuning.track_start();
        Self {
            tuning,
            zone,
            status: SessionStatus::Idle,
            signal: SignalState {
                position: start,
                phase: Phase::Traveling,
            },
            round: RoundState {
                score: 0,
                cooldown_remaining: 0.0,
            },
            session: GameSession::default(),
            epoch: 0,
            pending_reward: None,
            awaiting_reward: false,
            input_queued: false,
        }
    }

    // --- Lifecycle ---------------------------------------------------------

    /// Begin a fresh session from any state.
    pub fn start(&mut self) {
        self.clear(SessionStatus::Playing);
        self.session.is_playing = true;
        self.session.can_accept_input = true;
        info!("calibration session {} started", self.epoch);
    }

    /// Back to idle; drops score, reward and any reward still in flight.
    pub fn reset(&mut self) {
        self.clear(SessionStatus::Idle);
        info!("calibration reset (epoch {})", self.epoch);
    }

    /// Host teardown. Same as `reset`, outstanding tickets become stale.
    pub fn dispose(&mut self) {
        self.clear(SessionStatus::Idle);
        debug!("calibration controller disposed (epoch {})", self.epoch);
    }

    fn clear(&mut self, status: SessionStatus) {
        self.epoch += 1;
        self.status = status;
        self.signal = SignalState {
            position: self.tuning.track_start(),
            phase: Phase::Traveling,
        };
        self.round = RoundState {
            score: 0,
            cooldown_remaining: 0.0,
        };
        self.session = GameSession::default();
        self.pending_reward = None;
        self.awaiting_reward = false;
        self.input_queued = false;
    }

    fn begin_round(&mut self) {
        self.signal = SignalState {
            position: self.tuning.track_start(),
            phase: Phase::Traveling,
        };
        self.round.cooldown_remaining = 0.0;
        self.session.can_accept_input = true;
    }

    // --- Frame & input -----------------------------------------------------

    /// One rendered frame. Queued input is evaluated before the signal moves.
    pub fn advance_frame(&mut self, delta_secs: f64) {
        if self.status != SessionStatus::Playing {
            self.input_queued = false;
            return;
        }
        if self.input_queued {
            self.input_queued = false;
            if self.trigger() != TriggerOutcome::Ignored {
                return;
            }
        }

        match self.signal.phase {
            Phase::Traveling => {
                match clock::advance(&self.tuning, self.signal.position, self.round.score, delta_secs) {
                    Motion::Moved(p) => self.signal.position = p,
                    Motion::Overrun => {
                        // Position stays at its last on-track value for feedback.
                        self.signal.phase = Phase::Miss;
                        self.round.cooldown_remaining = self.tuning.cooldown_secs;
                        debug!("signal overran the track at score {}", self.round.score);
                    }
                }
            }
            Phase::Hit | Phase::Miss => {
                if self.round.cooldown_remaining > 0.0 {
                    self.round.cooldown_remaining =
                        clock::tick_cooldown(self.round.cooldown_remaining, delta_secs);
                } else {
                    self.begin_round();
                }
            }
        }
    }

    /// Record a trigger to be evaluated at the start of the next frame.
    pub fn queue_trigger(&mut self) {
        if self.status == SessionStatus::Playing {
            self.input_queued = true;
        }
    }

    /// Evaluate the signal position now. At most one evaluation per round.
    pub fn trigger(&mut self) -> TriggerOutcome {
        if self.status != SessionStatus::Playing
            || !self.session.can_accept_input
            || self.signal.phase != Phase::Traveling
        {
            return TriggerOutcome::Ignored;
        }
        self.session.can_accept_input = false;
        self.round.cooldown_remaining = self.tuning.cooldown_secs;

        match self.zone.classify(self.signal.position) {
            Verdict::Hit => {
                self.signal.phase = Phase::Hit;
                self.round.score += 1;
                if self.round.score >= self.tuning.win_score {
                    self.status = SessionStatus::Won;
                    self.session.is_playing = false;
                    self.pending_reward = Some(RewardTicket { epoch: self.epoch });
                    self.awaiting_reward = true;
                    info!("calibration complete, score {}", self.round.score);
                    TriggerOutcome::Won
                } else {
                    TriggerOutcome::Hit {
                        score: self.round.score,
                    }
                }
            }
            Verdict::Miss => {
                self.signal.phase = Phase::Miss;
                self.round.score = 0;
                TriggerOutcome::Miss
            }
        }
    }

    // --- Reward plumbing ---------------------------------------------------

    /// The reward request queued by a win; yields it exactly once.
    pub fn take_reward_request(&mut self) -> Option<RewardTicket> {
        self.pending_reward.take()
    }

    /// Apply a finished reward. Returns false when the ticket is stale.
    pub fn apply_reward(&mut self, ticket: RewardTicket, text: String) -> bool {
        if ticket.epoch != self.epoch || self.status != SessionStatus::Won || !self.awaiting_reward {
            debug!(
                "discarding reward for epoch {} (current epoch {})",
                ticket.epoch, self.epoch
            );
            return false;
        }
        self.session.reward = Some(text);
        self.awaiting_reward = false;
        true
    }

    // --- Read-only accessors -------------------------------------------------

    pub fn tuning(&self) -> &GameTuning {
        &self.tuning
    }

    pub fn zone(&self) -> &TargetZone {
        &self.zone
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn state(&self) -> ControllerState {
        match self.status {
            SessionStatus::Idle => ControllerState::Idle,
            SessionStatus::Won => ControllerState::Won,
            SessionStatus::Playing => match self.signal.phase {
                Phase::Traveling => ControllerState::Traveling,
                Phase::Hit => ControllerState::Hit,
                Phase::Miss => ControllerState::Miss,
            },
        }
    }

    pub fn signal(&self) -> SignalState {
        self.signal
    }

    pub fn round(&self) -> RoundState {
        self.round
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.signal.phase
    }

    pub fn position(&self) -> f64 {
        self.signal.position
    }

    pub fn score(&self) -> u32 {
        self.round.score
    }

    pub fn cooldown_remaining(&self) -> f64 {
        self.round.cooldown_remaining
    }

    pub fn speed_multiplier(&self) -> f64 {
        clock::speed_multiplier(&self.tuning, self.round.score)
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing
    }

    pub fn can_accept_input(&self) -> bool {
        self.session.can_accept_input
    }

    pub fn reward(&self) -> Option<&str> {
        self.session.reward.as_deref()
    }

    pub fn is_awaiting_reward(&self) -> bool {
        self.awaiting_reward
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn snapshot(&self) -> HudSnapshot {
        HudSnapshot {
            state: self.state(),
            phase: self.signal.phase,
            score: self.round.score,
            win_score: self.tuning.win_score,
            position: self.signal.position,
            cooldown_remaining: self.round.cooldown_remaining,
            speed_multiplier: self.speed_multiplier(),
            is_playing: self.session.is_playing,
            reward: self.session.reward.clone(),
            reward_pending: self.awaiting_reward,
        }
    }
}
