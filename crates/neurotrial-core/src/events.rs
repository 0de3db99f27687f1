use serde::{Deserialize, Serialize};

use crate::trial::{ExerciseKind, Phase, RoundOutcome, SessionSummary};

/// Every state change of a trial session produces an Event.
/// Hosts render them; the CLI prints them as JSON lines.
///
/// Timestamps are the controller's monotonic milliseconds, not wall-clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        exercise: ExerciseKind,
        total_rounds: u32,
        at_ms: u64,
    },
    StageEntered {
        /// 1-based round the stage belongs to.
        round: u32,
        stage_index: usize,
        label: String,
        phase: Phase,
        duration_ms: u64,
        at_ms: u64,
    },
    /// Once per tick interval during a countdown stage.
    CountdownTick {
        round: u32,
        remaining_ms: u64,
        remaining_secs: u64,
        at_ms: u64,
    },
    RoundResolved {
        /// Rounds completed, including this one.
        round: u32,
        outcome: RoundOutcome,
        score: u32,
        total_rounds: u32,
        at_ms: u64,
    },
    SessionCompleted {
        summary: SessionSummary,
        at_ms: u64,
    },
    SessionAborted {
        round: u32,
        score: u32,
        at_ms: u64,
    },
    StateSnapshot {
        exercise: ExerciseKind,
        phase: Phase,
        round: u32,
        score: u32,
        total_rounds: u32,
        stage_label: Option<String>,
        remaining_ms: Option<u64>,
        last_outcome: Option<RoundOutcome>,
        average_reaction_ms: u64,
        at_ms: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_by_type() {
        let event = Event::RoundResolved {
            round: 3,
            outcome: RoundOutcome::TooSlow,
            score: 2,
            total_rounds: 10,
            at_ms: 9_000,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RoundResolved");
        assert_eq!(json["outcome"]["result"], "too_slow");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
