pub mod config;
pub mod exercise;
pub mod history;
pub mod play;
pub mod simulate;

use neurotrial_core::ExerciseKind;

/// clap value parser for exercise ids.
pub fn parse_exercise(s: &str) -> Result<ExerciseKind, String> {
    s.parse::<ExerciseKind>().map_err(|e| e.to_string())
}
