//! Completion reporting boundary.
//!
//! A finished session is turned into a flat [`CompletionReport`] and handed
//! to a [`CompletionSink`]. Saving is fire-and-forget from the game's point
//! of view: a failed save is logged and never touches session state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::trial::SessionSummary;

/// What the game hands to persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub exercise_id: String,
    pub exercise_type: String,
    pub section_id: Option<String>,
    pub score: u32,
    pub total_questions: u32,
    pub duration_seconds: u64,
    pub notes: Option<String>,
}

impl CompletionReport {
    pub fn from_summary(summary: &SessionSummary, section_id: Option<String>) -> Self {
        let notes = summary.best_reaction_ms.map(|best| {
            format!(
                "avg {} ms, best {} ms, early {}, too slow {}",
                summary.average_reaction_ms, best, summary.early_count, summary.too_slow_count
            )
        });
        Self {
            exercise_id: summary.exercise.id().to_string(),
            exercise_type: summary.exercise.category().to_string(),
            section_id,
            score: summary.score,
            total_questions: summary.total_rounds,
            duration_seconds: summary.duration_ms.div_ceil(1000),
            notes,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A stored completion. Created once per finished session and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseCompletionRecord {
    pub id: i64,
    pub exercise_id: String,
    pub exercise_type: String,
    pub section_id: Option<String>,
    pub score: u32,
    pub total_questions: u32,
    pub duration_seconds: u64,
    pub accuracy_percentage: f64,
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// `score / total * 100`, or 0 for an empty session.
pub fn accuracy_percentage(score: u32, total_questions: u32) -> f64 {
    if total_questions == 0 {
        return 0.0;
    }
    score as f64 / total_questions as f64 * 100.0
}

/// Persistence collaborator for finished sessions.
pub trait CompletionSink {
    fn save_completion(&self, report: &CompletionReport) -> Result<ExerciseCompletionRecord, CoreError>;
}

/// Hand `report` to `sink`, logging instead of propagating failure.
pub fn submit_completion(
    sink: &dyn CompletionSink,
    report: &CompletionReport,
) -> Option<ExerciseCompletionRecord> {
    match sink.save_completion(report) {
        Ok(record) => {
            tracing::info!(id = record.id, exercise = %record.exercise_id, "completion saved");
            Some(record)
        }
        Err(e) => {
            tracing::warn!(exercise = %report.exercise_id, error = %e, "failed to save completion");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DatabaseError;
    use crate::trial::{ExerciseKind, RoundOutcome};

    struct FailingSink;

    impl CompletionSink for FailingSink {
        fn save_completion(&self, _: &CompletionReport) -> Result<ExerciseCompletionRecord, CoreError> {
            Err(CoreError::Database(DatabaseError::Locked))
        }
    }

    fn summary() -> SessionSummary {
        SessionSummary {
            exercise: ExerciseKind::StopLight,
            score: 7,
            total_rounds: 10,
            average_reaction_ms: 410,
            best_reaction_ms: Some(290),
            early_count: 2,
            too_slow_count: 1,
            duration_ms: 48_200,
            outcomes: vec![RoundOutcome::Early],
        }
    }

    #[test]
    fn report_from_summary() {
        let report = CompletionReport::from_summary(&summary(), Some("focus".into()));
        assert_eq!(report.exercise_id, "stop-light");
        assert_eq!(report.exercise_type, "impulse-control");
        assert_eq!(report.total_questions, 10);
        assert_eq!(report.duration_seconds, 49);
        assert!(report.notes.unwrap().contains("best 290 ms"));
    }

    #[test]
    fn accuracy_handles_zero_total() {
        assert_eq!(accuracy_percentage(0, 0), 0.0);
        assert_eq!(accuracy_percentage(5, 10), 50.0);
    }

    #[test]
    fn failed_submit_is_swallowed() {
        let report = CompletionReport::from_summary(&summary(), None);
        assert!(submit_completion(&FailingSink, &report).is_none());
    }
}
