//! Timed trial controller.
//!
//! The controller is a virtual-clock state machine. It does not spawn
//! threads or read the wall clock: every command takes the caller's current
//! monotonic time in milliseconds, and the caller calls `tick()` at (or
//! after) [`TrialController::next_deadline_ms`] to let pending transitions
//! fire.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Armed -> Go -> Result -> (Armed | Finished)
//!           \______________^
//!            early input
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut trial = TrialController::new(ExerciseProfile::reaction_test())?;
//! trial.start(now_ms());
//! // In a loop:
//! trial.tick(now_ms());  // fires due transitions
//! trial.input(now_ms()); // on tap
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::profile::{ExerciseKind, ExerciseProfile, InputPolicy, Stage, StageKind};
use super::scheduler::{FiredTimer, PhaseScheduler, TimerHandle, Transition};
use super::score::{MissReason, RoundOutcome, ScoreAccumulator};
use crate::error::ValidationError;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    /// Waiting out an armed stage; input now is too early.
    Armed,
    /// Response window is open.
    Go,
    /// Round feedback is showing.
    Result,
    Finished,
}

/// Terminal payload of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: ExerciseKind,
    pub score: u32,
    pub total_rounds: u32,
    pub average_reaction_ms: u64,
    pub best_reaction_ms: Option<u64>,
    pub early_count: u32,
    pub too_slow_count: u32,
    pub duration_ms: u64,
    pub outcomes: Vec<RoundOutcome>,
}

/// Drives one exercise session from start to completion.
#[derive(Debug, Clone)]
pub struct TrialController {
    profile: ExerciseProfile,
    phase: Phase,
    stage_index: usize,
    /// When the current stage ends if nothing interrupts it.
    stage_ends_at_ms: Option<u64>,
    go_started_ms: Option<u64>,
    session_started_ms: Option<u64>,
    scores: ScoreAccumulator,
    scheduler: PhaseScheduler,
    last_outcome: Option<RoundOutcome>,
    completion: Option<SessionSummary>,
    completion_taken: bool,
}

impl TrialController {
    /// Create a controller with an entropy-seeded delay source.
    pub fn new(profile: ExerciseProfile) -> Result<Self, ValidationError> {
        Self::with_seed(profile, None)
    }

    /// Create a controller whose randomized delays are reproducible for a
    /// given seed.
    pub fn with_seed(profile: ExerciseProfile, seed: Option<u64>) -> Result<Self, ValidationError> {
        profile.validate()?;
        Ok(Self {
            profile,
            phase: Phase::Idle,
            stage_index: 0,
            stage_ends_at_ms: None,
            go_started_ms: None,
            session_started_ms: None,
            scores: ScoreAccumulator::new(),
            scheduler: PhaseScheduler::new(seed),
            last_outcome: None,
            completion: None,
            completion_taken: false,
        })
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn profile(&self) -> &ExerciseProfile {
        &self.profile
    }

    pub fn exercise(&self) -> ExerciseKind {
        self.profile.kind
    }

    /// Completed rounds.
    pub fn round(&self) -> u32 {
        self.scores.round()
    }

    pub fn score(&self) -> u32 {
        self.scores.score()
    }

    pub fn total_rounds(&self) -> u32 {
        self.profile.total_rounds
    }

    pub fn scores(&self) -> &ScoreAccumulator {
        &self.scores
    }

    pub fn last_outcome(&self) -> Option<RoundOutcome> {
        self.last_outcome
    }

    /// The active stage while armed or in the go window.
    pub fn current_stage(&self) -> Option<&Stage> {
        match self.phase {
            Phase::Armed | Phase::Go => self.profile.stages.get(self.stage_index),
            _ => None,
        }
    }

    pub fn go_started_ms(&self) -> Option<u64> {
        self.go_started_ms
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.scheduler.pending()
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.scheduler.next_deadline_ms()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Armed | Phase::Go | Phase::Result)
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// The completion payload, once the session has finished.
    pub fn completion(&self) -> Option<&SessionSummary> {
        self.completion.as_ref()
    }

    /// Hand out the completion payload. Returns `Some` exactly once per
    /// finished session.
    pub fn take_completion(&mut self) -> Option<SessionSummary> {
        if self.completion_taken {
            return None;
        }
        let summary = self.completion.clone()?;
        self.completion_taken = true;
        Some(summary)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now_ms: u64) -> Event {
        Event::StateSnapshot {
            exercise: self.profile.kind,
            phase: self.phase,
            round: self.scores.round(),
            score: self.scores.score(),
            total_rounds: self.profile.total_rounds,
            stage_label: self.current_stage().map(|s| s.label.clone()),
            remaining_ms: self.next_deadline_ms().map(|d| d.saturating_sub(now_ms)),
            last_outcome: self.last_outcome,
            average_reaction_ms: self.scores.average_reaction_ms(),
            at_ms: now_ms,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session. Ignored unless idle or finished.
    pub fn start(&mut self, now_ms: u64) -> Vec<Event> {
        match self.phase {
            Phase::Idle | Phase::Finished => {
                self.scheduler.clear();
                self.scores.reset();
                self.last_outcome = None;
                self.completion = None;
                self.completion_taken = false;
                self.session_started_ms = Some(now_ms);
                debug!(exercise = %self.profile.kind, rounds = self.profile.total_rounds, "session started");

                let mut events = vec![Event::SessionStarted {
                    exercise: self.profile.kind,
                    total_rounds: self.profile.total_rounds,
                    at_ms: now_ms,
                }];
                events.push(self.enter_stage(0, now_ms));
                events
            }
            _ => {
                debug!(phase = ?self.phase, "start ignored while running");
                Vec::new()
            }
        }
    }

    /// User input (a tap). Due timers fire first, so input that arrives at or
    /// after the go deadline counts as too slow.
    pub fn input(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = self.tick(now_ms);
        match self.phase {
            Phase::Armed => {
                let policy = self.current_stage().map(|s| s.input);
                if policy == Some(InputPolicy::Penalize) {
                    events.push(self.resolve_round(now_ms, None));
                } else {
                    debug!("input ignored during armed stage");
                }
            }
            Phase::Go => {
                let reaction_ms = now_ms.saturating_sub(self.go_started_ms.unwrap_or(now_ms));
                events.push(self.resolve_round(now_ms, Some(reaction_ms)));
            }
            Phase::Idle | Phase::Result | Phase::Finished => {
                debug!(phase = ?self.phase, "input ignored");
            }
        }
        events
    }

    /// Fire every transition due at `now_ms`, oldest first. Follow-up timers
    /// are scheduled relative to the due time of the timer that fired.
    pub fn tick(&mut self, now_ms: u64) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(fired) = self.scheduler.pop_due(now_ms) {
            events.extend(self.apply(fired));
        }
        events
    }

    /// Fire a specific timer on behalf of a host timer facility. Stale
    /// handles (cancelled, replaced or already fired) are ignored.
    pub fn fire(&mut self, handle: TimerHandle) -> Vec<Event> {
        match self.scheduler.take_if_current(handle) {
            Some(fired) => self.apply(fired),
            None => {
                warn!(?handle, "ignoring stale timer");
                Vec::new()
            }
        }
    }

    /// Exit the exercise early. Cancels the pending timer; nothing fires
    /// afterwards and no completion is produced.
    pub fn abort(&mut self, now_ms: u64) -> Option<Event> {
        if !self.is_running() {
            return None;
        }
        self.scheduler.clear();
        self.phase = Phase::Idle;
        self.stage_ends_at_ms = None;
        self.go_started_ms = None;
        debug!(round = self.scores.round(), "session aborted");
        Some(Event::SessionAborted {
            round: self.scores.round(),
            score: self.scores.score(),
            at_ms: now_ms,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply(&mut self, fired: FiredTimer) -> Vec<Event> {
        let at = fired.due_ms;
        match (self.phase, fired.transition) {
            (Phase::Armed, Transition::CountdownTick) => vec![self.countdown_tick(at)],
            (Phase::Armed, Transition::StageElapsed) => {
                vec![self.enter_stage(self.stage_index + 1, at)]
            }
            (Phase::Go, Transition::GoTimeout) => vec![self.resolve_round(at, None)],
            (Phase::Result, Transition::FeedbackElapsed) => {
                if self.scores.round() >= self.profile.total_rounds {
                    vec![self.finish(at)]
                } else {
                    vec![self.enter_stage(0, at)]
                }
            }
            (phase, transition) => {
                warn!(?phase, ?transition, "timer does not match phase");
                Vec::new()
            }
        }
    }

    fn enter_stage(&mut self, index: usize, now_ms: u64) -> Event {
        let stage = &self.profile.stages[index];
        let duration_ms = self.scheduler.sample_delay(stage);
        let label = stage.label.clone();
        self.stage_index = index;
        self.stage_ends_at_ms = Some(now_ms.saturating_add(duration_ms));

        match stage.kind {
            StageKind::Go => {
                self.phase = Phase::Go;
                self.go_started_ms = Some(now_ms);
                self.scheduler.schedule(now_ms, duration_ms, Transition::GoTimeout);
            }
            StageKind::Armed => {
                self.phase = Phase::Armed;
                self.go_started_ms = None;
                match stage.tick_ms {
                    Some(tick) if tick < duration_ms => {
                        self.scheduler.schedule(now_ms, tick, Transition::CountdownTick);
                    }
                    _ => {
                        self.scheduler.schedule(now_ms, duration_ms, Transition::StageElapsed);
                    }
                }
            }
        }

        debug!(round = self.scores.round() + 1, stage = %label, duration_ms, "stage entered");
        Event::StageEntered {
            round: self.scores.round() + 1,
            stage_index: index,
            label,
            phase: self.phase,
            duration_ms,
            at_ms: now_ms,
        }
    }

    fn countdown_tick(&mut self, now_ms: u64) -> Event {
        let remaining_ms = self
            .stage_ends_at_ms
            .map(|end| end.saturating_sub(now_ms))
            .unwrap_or(0);
        let tick = self
            .current_stage()
            .and_then(|s| s.tick_ms)
            .unwrap_or(remaining_ms);

        if tick > 0 && remaining_ms > tick {
            self.scheduler.schedule(now_ms, tick, Transition::CountdownTick);
        } else {
            self.scheduler.schedule(now_ms, remaining_ms, Transition::StageElapsed);
        }

        Event::CountdownTick {
            round: self.scores.round() + 1,
            remaining_ms,
            remaining_secs: remaining_ms.div_ceil(1000),
            at_ms: now_ms,
        }
    }

    /// `Some(reaction)` records a hit; `None` records a miss whose reason
    /// follows from the phase.
    fn resolve_round(&mut self, now_ms: u64, reaction_ms: Option<u64>) -> Event {
        if let Some(handle) = self.scheduler.pending() {
            self.scheduler.cancel(handle);
        }

        let outcome = match (reaction_ms, self.phase) {
            (Some(ms), _) => self.scores.record_success(ms),
            (None, Phase::Armed) => self.scores.record_failure(MissReason::Early),
            (None, _) => self.scores.record_failure(MissReason::TooSlow),
        };

        self.phase = Phase::Result;
        self.go_started_ms = None;
        self.stage_ends_at_ms = None;
        self.last_outcome = Some(outcome);
        self.scheduler
            .schedule(now_ms, self.profile.feedback_ms, Transition::FeedbackElapsed);

        debug!(round = self.scores.round(), ?outcome, score = self.scores.score(), "round resolved");
        Event::RoundResolved {
            round: self.scores.round(),
            outcome,
            score: self.scores.score(),
            total_rounds: self.profile.total_rounds,
            at_ms: now_ms,
        }
    }

    fn finish(&mut self, now_ms: u64) -> Event {
        self.scheduler.clear();
        self.phase = Phase::Finished;
        self.stage_ends_at_ms = None;

        let started = self.session_started_ms.unwrap_or(now_ms);
        let summary = SessionSummary {
            exercise: self.profile.kind,
            score: self.scores.score(),
            total_rounds: self.profile.total_rounds,
            average_reaction_ms: self.scores.average_reaction_ms(),
            best_reaction_ms: self.scores.best_reaction_ms(),
            early_count: self.scores.count(MissReason::Early),
            too_slow_count: self.scores.count(MissReason::TooSlow),
            duration_ms: now_ms.saturating_sub(started),
            outcomes: self.scores.outcomes().to_vec(),
        };
        info!(
            exercise = %summary.exercise,
            score = summary.score,
            total = summary.total_rounds,
            "session completed"
        );
        self.completion = Some(summary.clone());
        Event::SessionCompleted {
            summary,
            at_ms: now_ms,
        }
    }
}
