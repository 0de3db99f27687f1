use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const DEFAULT_TOTAL_ROUNDS: u32 = 10;

/// The timed-trial exercises in the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExerciseKind {
    ReactionTest,
    StopLight,
    WaitForIt,
}

impl ExerciseKind {
    pub const ALL: [ExerciseKind; 3] = [
        ExerciseKind::ReactionTest,
        ExerciseKind::StopLight,
        ExerciseKind::WaitForIt,
    ];

    /// Stable identifier, used in storage and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            ExerciseKind::ReactionTest => "reaction-test",
            ExerciseKind::StopLight => "stop-light",
            ExerciseKind::WaitForIt => "wait-for-it",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ExerciseKind::ReactionTest => "Reaction Test",
            ExerciseKind::StopLight => "Stop Light",
            ExerciseKind::WaitForIt => "Wait For It",
        }
    }

    /// Skill category recorded alongside each completion.
    pub fn category(&self) -> &'static str {
        match self {
            ExerciseKind::ReactionTest => "attention",
            ExerciseKind::StopLight => "impulse-control",
            ExerciseKind::WaitForIt => "delay-tolerance",
        }
    }

    pub fn profile(&self) -> ExerciseProfile {
        match self {
            ExerciseKind::ReactionTest => ExerciseProfile::reaction_test(),
            ExerciseKind::StopLight => ExerciseProfile::stop_light(),
            ExerciseKind::WaitForIt => ExerciseProfile::wait_for_it(),
        }
    }
}

impl fmt::Display for ExerciseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ExerciseKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        ExerciseKind::ALL
            .into_iter()
            .find(|k| k.id() == normalized)
            .ok_or_else(|| ValidationError::UnknownExercise(s.to_string()))
    }
}

/// Which half of a round a stage belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// "Do not act yet" window.
    Armed,
    /// Response window.
    Go,
}

/// What an input means while a stage is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputPolicy {
    /// Input ends the round as an early miss.
    Penalize,
    /// Input ends the round as a hit.
    Score,
    /// Input is dropped.
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    pub kind: StageKind,
    pub label: String,
    /// Inclusive lower bound of the stage duration in milliseconds.
    pub min_delay_ms: u64,
    /// Inclusive upper bound of the stage duration in milliseconds.
    pub max_delay_ms: u64,
    pub input: InputPolicy,
    /// Emit a countdown tick at this interval while the stage runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tick_ms: Option<u64>,
}

impl Stage {
    pub fn armed(label: impl Into<String>, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            kind: StageKind::Armed,
            label: label.into(),
            min_delay_ms,
            max_delay_ms,
            input: InputPolicy::Penalize,
            tick_ms: None,
        }
    }

    pub fn go(label: impl Into<String>, min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            kind: StageKind::Go,
            label: label.into(),
            min_delay_ms,
            max_delay_ms,
            input: InputPolicy::Score,
            tick_ms: None,
        }
    }

    pub fn with_tick(mut self, tick_ms: u64) -> Self {
        self.tick_ms = Some(tick_ms);
        self
    }

    pub fn with_input(mut self, input: InputPolicy) -> Self {
        self.input = input;
        self
    }

    pub fn is_fixed(&self) -> bool {
        self.min_delay_ms == self.max_delay_ms
    }

    /// Draw a duration uniformly from `[min_delay_ms, max_delay_ms]`.
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        if self.is_fixed() {
            return self.min_delay_ms;
        }
        rng.gen_range(self.min_delay_ms..=self.max_delay_ms)
    }
}

/// Phase-sequence descriptor for one exercise.
///
/// A round walks the `Armed` stages in order and ends with the single `Go`
/// stage, which must be last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub kind: ExerciseKind,
    pub total_rounds: u32,
    /// How long round feedback stays up before the next round (or the end).
    pub feedback_ms: u64,
    pub stages: Vec<Stage>,
}

impl ExerciseProfile {
    pub fn reaction_test() -> Self {
        Self {
            kind: ExerciseKind::ReactionTest,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            feedback_ms: 1500,
            stages: vec![Stage::armed("Wait", 1000, 4000), Stage::go("Tap!", 2000, 2000)],
        }
    }

    pub fn stop_light() -> Self {
        Self {
            kind: ExerciseKind::StopLight,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            feedback_ms: 1000,
            stages: vec![
                Stage::armed("Red", 500, 500),
                Stage::armed("Yellow", 2000, 4000),
                Stage::go("Green", 1000, 2000),
            ],
        }
    }

    pub fn wait_for_it() -> Self {
        Self {
            kind: ExerciseKind::WaitForIt,
            total_rounds: DEFAULT_TOTAL_ROUNDS,
            feedback_ms: 1000,
            stages: vec![
                Stage::armed("Wait for it...", 3000, 7000).with_tick(1000),
                Stage::go("Now!", 2000, 2000),
            ],
        }
    }

    pub fn with_total_rounds(mut self, total_rounds: u32) -> Self {
        self.total_rounds = total_rounds;
        self
    }

    pub fn with_feedback_ms(mut self, feedback_ms: u64) -> Self {
        self.feedback_ms = feedback_ms;
        self
    }

    /// Replace the go window with a fixed duration.
    pub fn with_go_window_ms(mut self, window_ms: u64) -> Self {
        if let Some(go) = self.stages.iter_mut().find(|s| s.kind == StageKind::Go) {
            go.min_delay_ms = window_ms;
            go.max_delay_ms = window_ms;
        }
        self
    }

    pub fn go_stage(&self) -> Option<&Stage> {
        self.stages.last().filter(|s| s.kind == StageKind::Go)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_rounds == 0 {
            return Err(ValidationError::InvalidValue {
                field: "total_rounds".into(),
                message: "must be at least 1".into(),
            });
        }
        if self.stages.is_empty() {
            return Err(ValidationError::EmptyCollection("stages".into()));
        }

        let last = self.stages.len() - 1;
        for (i, stage) in self.stages.iter().enumerate() {
            let field = format!("stages[{i}]");
            if stage.min_delay_ms > stage.max_delay_ms {
                return Err(ValidationError::InvalidRange {
                    field,
                    min: stage.min_delay_ms,
                    max: stage.max_delay_ms,
                });
            }
            if stage.tick_ms == Some(0) {
                return Err(ValidationError::InvalidValue {
                    field,
                    message: "tick interval must be positive".into(),
                });
            }
            match (stage.kind, i == last) {
                (StageKind::Go, true) => {
                    if stage.min_delay_ms == 0 {
                        return Err(ValidationError::InvalidValue {
                            field,
                            message: "go window must be positive".into(),
                        });
                    }
                    if stage.input != InputPolicy::Score {
                        return Err(ValidationError::InvalidValue {
                            field,
                            message: "go stage must score input".into(),
                        });
                    }
                }
                (StageKind::Go, false) => {
                    return Err(ValidationError::InvalidValue {
                        field,
                        message: "go stage must be the last stage".into(),
                    });
                }
                (StageKind::Armed, true) => {
                    return Err(ValidationError::InvalidValue {
                        field,
                        message: "last stage must be a go stage".into(),
                    });
                }
                (StageKind::Armed, false) => {
                    if stage.input == InputPolicy::Score {
                        return Err(ValidationError::InvalidValue {
                            field,
                            message: "armed stages cannot score input".into(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for ExerciseProfile {
    fn default() -> Self {
        Self::reaction_test()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    #[test]
    fn builtin_profiles_are_valid() {
        for kind in ExerciseKind::ALL {
            let profile = kind.profile();
            assert_eq!(profile.kind, kind);
            assert_eq!(profile.total_rounds, DEFAULT_TOTAL_ROUNDS);
            profile.validate().unwrap();
        }
    }

    #[test]
    fn stop_light_has_staged_armed_window() {
        let p = ExerciseProfile::stop_light();
        let labels: Vec<_> = p.stages.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["Red", "Yellow", "Green"]);
        assert!(p.stages[0].is_fixed());
        assert_eq!(p.go_stage().unwrap().max_delay_ms, 2000);
    }

    #[test]
    fn parse_exercise_ids() {
        assert_eq!("stop-light".parse::<ExerciseKind>().unwrap(), ExerciseKind::StopLight);
        assert_eq!("WAIT_FOR_IT".parse::<ExerciseKind>().unwrap(), ExerciseKind::WaitForIt);
        assert!(matches!(
            "color-match".parse::<ExerciseKind>(),
            Err(ValidationError::UnknownExercise(_))
        ));
    }

    #[test]
    fn sample_delay_stays_in_range() {
        let stage = Stage::armed("Wait", 1000, 4000);
        let mut rng = Mcg128Xsl64::seed_from_u64(7);
        for _ in 0..200 {
            let d = stage.sample_delay(&mut rng);
            assert!((1000..=4000).contains(&d));
        }
    }

    #[test]
    fn rejects_go_stage_not_last() {
        let mut p = ExerciseProfile::reaction_test();
        p.stages.reverse();
        assert!(p.validate().is_err());
    }

    #[test]
    fn rejects_inverted_range() {
        let mut p = ExerciseProfile::reaction_test();
        p.stages[0].min_delay_ms = 5000;
        assert!(matches!(p.validate(), Err(ValidationError::InvalidRange { .. })));
    }

    #[test]
    fn rejects_zero_rounds_and_zero_window() {
        assert!(ExerciseProfile::reaction_test().with_total_rounds(0).validate().is_err());
        assert!(ExerciseProfile::reaction_test().with_go_window_ms(0).validate().is_err());
    }

    #[test]
    fn go_window_override_is_fixed() {
        let p = ExerciseProfile::stop_light().with_go_window_ms(800);
        let go = p.go_stage().unwrap();
        assert_eq!((go.min_delay_ms, go.max_delay_ms), (800, 800));
    }
}
