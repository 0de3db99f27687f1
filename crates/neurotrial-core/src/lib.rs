//! # neurotrial Core Library
//!
//! This library provides the engine behind short timed-trial exercises
//! (reaction test, stop light, wait for it) used for attention and impulse
//! control practice. All operations are available through the standalone
//! `neurotrial` CLI; any GUI would be a thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Trial Controller**: A virtual-clock state machine parameterized by an
//!   exercise profile; the caller supplies timestamps and calls `tick()`
//! - **Phase Scheduler**: Single-slot timer with generation-checked handles
//! - **Score Accumulator**: Per-round outcomes, score and reaction times
//! - **Session Driver**: tokio loop that runs a controller in real time
//! - **Storage**: SQLite completion records and TOML configuration
//!
//! ## Key Components
//!
//! - [`TrialController`]: Core trial state machine
//! - [`ExerciseProfile`]: Stage descriptor for one exercise
//! - [`Simulator`]: Deterministic scripted runs
//! - [`Database`]: Completion persistence and statistics
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod report;
pub mod session;
pub mod simulation;
pub mod storage;
pub mod trial;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use report::{
    accuracy_percentage, submit_completion, CompletionReport, CompletionSink,
    ExerciseCompletionRecord,
};
pub use session::{run_session, Input, SessionEnd};
pub use simulation::{ResponseStrategy, SimulationResult, Simulator};
pub use storage::{CompletionStats, Config, Database};
pub use trial::{
    ExerciseKind, ExerciseProfile, Phase, RoundOutcome, ScoreAccumulator, SessionSummary, Stage,
    TrialController,
};
