mod config;
pub mod database;

pub use config::{Config, ExerciseOverride, ExercisesConfig, SessionConfig};
pub use database::{CompletionStats, Database};

use std::path::PathBuf;

/// Directory holding `config.toml` and `neurotrial.db`, created on first use.
///
/// `NEUROTRIAL_ENV=dev` switches to `neurotrial-dev` so local experiments
/// keep their results apart from real sessions.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let name = match std::env::var("NEUROTRIAL_ENV").as_deref() {
        Ok("dev") => "neurotrial-dev",
        _ => "neurotrial",
    };
    let dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(name);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
