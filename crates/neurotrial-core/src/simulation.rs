//! Deterministic simulation harness for trial sessions.
//!
//! Plays a profile on a virtual clock against a scripted responder. Used
//! for regression tests and by `neurotrial simulate` to preview how an
//! exercise plays out without a human at the keyboard.

use rand::prelude::*;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::events::Event;
use crate::trial::{
    ExerciseKind, ExerciseProfile, InputPolicy, Phase, SessionSummary, TrialController,
};

/// How the simulated player responds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ResponseStrategy {
    /// Respond `reaction_ms` after every go signal.
    Perfect { reaction_ms: u64 },
    /// Respond as soon as every round is armed.
    AlwaysEarly,
    /// Never respond; every go window times out.
    NeverRespond,
    /// Respond on the listed 1-based rounds, time out on the others.
    HitRounds { rounds: Vec<u32>, reaction_ms: u64 },
    /// Seeded mix of early taps, hits and timeouts.
    Random {
        hit_probability: f64,
        early_probability: f64,
    },
}

impl Default for ResponseStrategy {
    fn default() -> Self {
        ResponseStrategy::Perfect { reaction_ms: 300 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Early,
    Hit(u64),
    Miss,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub exercise: ExerciseKind,
    pub seed: Option<u64>,
    pub strategy: ResponseStrategy,
    pub summary: SessionSummary,
    pub events: Vec<Event>,
}

pub struct Simulator {
    seed: Option<u64>,
    rng: Mcg128Xsl64,
}

impl Simulator {
    /// `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed.wrapping_add(1)),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self { seed, rng }
    }

    pub fn run(
        &mut self,
        profile: ExerciseProfile,
        strategy: &ResponseStrategy,
    ) -> Result<SimulationResult, ValidationError> {
        validate_strategy(strategy)?;
        let exercise = profile.kind;
        let mut trial = TrialController::with_seed(profile, self.seed)?;
        let mut decisions: Vec<Decision> = Vec::new();

        let mut now = 0u64;
        let mut events = trial.start(now);

        while !trial.is_finished() {
            let round = trial.round() + 1;
            while decisions.len() < round as usize {
                let next = decisions.len() as u32 + 1;
                decisions.push(self.decide(strategy, next));
            }
            let planned = planned_input(&trial, decisions[round as usize - 1], now);

            match (planned, trial.next_deadline_ms()) {
                (Some(at), Some(deadline)) if at < deadline => {
                    now = at;
                    events.extend(trial.input(now));
                }
                (Some(at), None) => {
                    now = at;
                    events.extend(trial.input(now));
                }
                (_, Some(deadline)) => {
                    now = deadline;
                    events.extend(trial.tick(now));
                }
                (None, None) => break,
            }
        }

        let summary = trial.take_completion().ok_or_else(|| ValidationError::InvalidValue {
            field: "profile".into(),
            message: "simulation stalled before the session finished".into(),
        })?;

        Ok(SimulationResult {
            exercise,
            seed: self.seed,
            strategy: strategy.clone(),
            summary,
            events,
        })
    }

    fn decide(&mut self, strategy: &ResponseStrategy, round: u32) -> Decision {
        match strategy {
            ResponseStrategy::Perfect { reaction_ms } => Decision::Hit(*reaction_ms),
            ResponseStrategy::AlwaysEarly => Decision::Early,
            ResponseStrategy::NeverRespond => Decision::Miss,
            ResponseStrategy::HitRounds { rounds, reaction_ms } => {
                if rounds.contains(&round) {
                    Decision::Hit(*reaction_ms)
                } else {
                    Decision::Miss
                }
            }
            ResponseStrategy::Random {
                hit_probability,
                early_probability,
            } => {
                if self.rng.gen_bool(*early_probability) {
                    Decision::Early
                } else if self.rng.gen_bool(*hit_probability) {
                    Decision::Hit(self.rng.gen_range(150..=600))
                } else {
                    Decision::Miss
                }
            }
        }
    }
}

/// When the simulated player acts next in the current phase, if at all.
/// Early taps wait for an armed stage that penalizes input.
fn planned_input(trial: &TrialController, decision: Decision, now: u64) -> Option<u64> {
    match (trial.phase(), decision) {
        (Phase::Armed, Decision::Early) => trial
            .current_stage()
            .filter(|stage| stage.input == InputPolicy::Penalize)
            .map(|_| now),
        (Phase::Go, Decision::Hit(reaction_ms)) => trial
            .go_started_ms()
            .map(|go| go.saturating_add(reaction_ms)),
        _ => None,
    }
}

fn validate_strategy(strategy: &ResponseStrategy) -> Result<(), ValidationError> {
    if let ResponseStrategy::Random {
        hit_probability,
        early_probability,
    } = strategy
    {
        for (field, p) in [
            ("hit_probability", hit_probability),
            ("early_probability", early_probability),
        ] {
            if !(0.0..=1.0).contains(p) {
                return Err(ValidationError::InvalidValue {
                    field: field.into(),
                    message: format!("{p} is not a probability"),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_player_scores_every_round() {
        let result = Simulator::new(Some(1))
            .run(ExerciseProfile::reaction_test(), &ResponseStrategy::default())
            .unwrap();
        assert_eq!((result.summary.score, result.summary.total_rounds), (10, 10));
        assert_eq!(result.summary.average_reaction_ms, 300);
    }

    #[test]
    fn reaction_slower_than_window_times_out() {
        let strategy = ResponseStrategy::Perfect { reaction_ms: 2500 };
        let result = Simulator::new(Some(1))
            .run(ExerciseProfile::reaction_test(), &strategy)
            .unwrap();
        assert_eq!(result.summary.score, 0);
        assert_eq!(result.summary.too_slow_count, 10);
    }

    #[test]
    fn same_seed_same_trace() {
        let strategy = ResponseStrategy::Random {
            hit_probability: 0.7,
            early_probability: 0.2,
        };
        let a = Simulator::new(Some(99))
            .run(ExerciseProfile::stop_light(), &strategy)
            .unwrap();
        let b = Simulator::new(Some(99))
            .run(ExerciseProfile::stop_light(), &strategy)
            .unwrap();
        assert_eq!(a.summary, b.summary);
        assert_eq!(a.events, b.events);
    }

    #[test]
    fn early_player_skips_stages_that_ignore_input() {
        let mut profile = ExerciseProfile::stop_light().with_total_rounds(2);
        profile.stages[0].input = InputPolicy::Ignore;
        profile.validate().unwrap();

        let result = Simulator::new(Some(1))
            .run(profile, &ResponseStrategy::AlwaysEarly)
            .unwrap();
        assert_eq!((result.summary.score, result.summary.total_rounds), (0, 2));
        assert_eq!(result.summary.early_count, 2);
        let early_stages: Vec<_> = result
            .events
            .iter()
            .filter_map(|e| match e {
                Event::StageEntered { stage_index, .. } => Some(*stage_index),
                _ => None,
            })
            .collect();
        // Red is waited out, the tap lands on yellow.
        assert_eq!(early_stages, vec![0, 1, 0, 1]);
    }

    #[test]
    fn early_player_times_out_when_no_stage_penalizes() {
        let mut profile = ExerciseProfile::reaction_test().with_total_rounds(3);
        profile.stages[0].input = InputPolicy::Ignore;

        let result = Simulator::new(Some(4))
            .run(profile, &ResponseStrategy::AlwaysEarly)
            .unwrap();
        assert_eq!(result.summary.score, 0);
        assert_eq!(result.summary.too_slow_count, 3);
    }

    #[test]
    fn rejects_bad_probability() {
        let strategy = ResponseStrategy::Random {
            hit_probability: 1.5,
            early_probability: 0.0,
        };
        assert!(Simulator::new(Some(1))
            .run(ExerciseProfile::reaction_test(), &strategy)
            .is_err());
    }

    #[test]
    fn strategy_serializes_with_tag() {
        let json = serde_json::to_value(ResponseStrategy::AlwaysEarly).unwrap();
        assert_eq!(json["strategy"], "always_early");
    }
}
