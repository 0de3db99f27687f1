mod controller;
mod profile;
mod scheduler;
mod score;

pub use controller::{Phase, SessionSummary, TrialController};
pub use profile::{ExerciseKind, ExerciseProfile, InputPolicy, Stage, StageKind, DEFAULT_TOTAL_ROUNDS};
pub use scheduler::{FiredTimer, PhaseScheduler, TimerHandle, Transition};
pub use score::{MissReason, RoundOutcome, ScoreAccumulator};
