//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Session defaults (round count, delay seed, section id, saving)
//! - Per-exercise timing overrides
//!
//! Configuration is stored at `~/.config/neurotrial/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::trial::{ExerciseKind, ExerciseProfile, DEFAULT_TOTAL_ROUNDS};

/// Session-wide defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_total_rounds")]
    pub total_rounds: u32,
    /// Fixed seed for phase delays; unset draws from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Section the results are filed under.
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default = "default_true")]
    pub save_results: bool,
}

/// Timing overrides for one exercise. Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExerciseOverride {
    #[serde(default)]
    pub feedback_ms: Option<u64>,
    #[serde(default)]
    pub go_window_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExercisesConfig {
    #[serde(default)]
    pub reaction_test: ExerciseOverride,
    #[serde(default)]
    pub stop_light: ExerciseOverride,
    #[serde(default)]
    pub wait_for_it: ExerciseOverride,
}

impl ExercisesConfig {
    pub fn get(&self, kind: ExerciseKind) -> &ExerciseOverride {
        match kind {
            ExerciseKind::ReactionTest => &self.reaction_test,
            ExerciseKind::StopLight => &self.stop_light,
            ExerciseKind::WaitForIt => &self.wait_for_it,
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/neurotrial/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub exercises: ExercisesConfig,
}

fn default_total_rounds() -> u32 {
    DEFAULT_TOTAL_ROUNDS
}
fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            total_rounds: default_total_rounds(),
            seed: None,
            section_id: None,
            save_results: true,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
        text_only: bool,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = parse_toml_integer(value).ok_or_else(|| {
                            invalid(format!("'{value}' is not an integer in 0..={}", i64::MAX))
                        })?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        return Err(invalid("cannot set a whole section".into()));
                    }
                    // Optional fields: "none" clears, numbers stay numbers.
                    serde_json::Value::Null => {
                        if value.eq_ignore_ascii_case("none") {
                            serde_json::Value::Null
                        } else if text_only {
                            serde_json::Value::String(value.into())
                        } else if let Some(n) = parse_toml_integer(value) {
                            serde_json::Value::Number(n.into())
                        } else {
                            serde_json::Value::String(value.into())
                        }
                    }
                    serde_json::Value::String(_) => {
                        if value.eq_ignore_ascii_case("none") {
                            serde_json::Value::Null
                        } else {
                            serde_json::Value::String(value.into())
                        }
                    }
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/neurotrial"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Like [`Config::load`], against an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not fit the field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let updated = match self.with_value(key, value, false) {
            Ok(updated) => updated,
            // An unset optional text field given a numeric value.
            Err(ConfigError::InvalidValue { .. }) if value.parse::<u64>().is_ok() => {
                self.with_value(key, value, true)?
            }
            Err(e) => return Err(e),
        };
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    fn with_value(&self, key: &str, value: &str, text_only: bool) -> Result<Config, ConfigError> {
        let mut json =
            serde_json::to_value(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value, text_only)?;
        serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ExerciseKind::ALL {
            self.profile(kind)
                .validate()
                .map_err(|e| ConfigError::InvalidValue {
                    key: format!("exercises.{}", kind.id().replace('-', "_")),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Built-in profile for `kind` with this configuration applied.
    pub fn profile(&self, kind: ExerciseKind) -> ExerciseProfile {
        let overrides = self.exercises.get(kind);
        let mut profile = kind.profile().with_total_rounds(self.session.total_rounds);
        if let Some(feedback_ms) = overrides.feedback_ms {
            profile = profile.with_feedback_ms(feedback_ms);
        }
        if let Some(window_ms) = overrides.go_window_ms {
            profile = profile.with_go_window_ms(window_ms);
        }
        profile
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
    }
}

/// TOML integers are signed 64-bit; larger values cannot be saved.
fn parse_toml_integer(value: &str) -> Option<u64> {
    value.parse::<i64>().ok().filter(|n| *n >= 0).map(|n| n as u64)
}
