use serde::{Deserialize, Serialize};

/// How a single round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum RoundOutcome {
    Hit { reaction_ms: u64 },
    /// Input arrived during an armed stage.
    Early,
    /// The go window closed without input.
    TooSlow,
}

impl RoundOutcome {
    /// Short feedback line for display.
    pub fn feedback(&self) -> String {
        match self {
            RoundOutcome::Hit { reaction_ms } => format!("Nice! {reaction_ms} ms"),
            RoundOutcome::Early => "Too early!".to_string(),
            RoundOutcome::TooSlow => "Too slow!".to_string(),
        }
    }
}

/// Reason passed to [`ScoreAccumulator::record_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    Early,
    TooSlow,
}

impl From<MissReason> for RoundOutcome {
    fn from(reason: MissReason) -> Self {
        match reason {
            MissReason::Early => RoundOutcome::Early,
            MissReason::TooSlow => RoundOutcome::TooSlow,
        }
    }
}

/// Running tally for one session.
///
/// Every recorded outcome completes exactly one round; only hits add to
/// the score, so `score <= round` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreAccumulator {
    round: u32,
    score: u32,
    reaction_samples: Vec<u64>,
    outcomes: Vec<RoundOutcome>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, reaction_ms: u64) -> RoundOutcome {
        let outcome = RoundOutcome::Hit { reaction_ms };
        self.round += 1;
        self.score += 1;
        self.reaction_samples.push(reaction_ms);
        self.outcomes.push(outcome);
        outcome
    }

    pub fn record_failure(&mut self, reason: MissReason) -> RoundOutcome {
        let outcome = RoundOutcome::from(reason);
        self.round += 1;
        self.outcomes.push(outcome);
        outcome
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn reaction_samples(&self) -> &[u64] {
        &self.reaction_samples
    }

    pub fn outcomes(&self) -> &[RoundOutcome] {
        &self.outcomes
    }

    /// Mean reaction time in whole milliseconds; 0 when nothing was hit.
    pub fn average_reaction_ms(&self) -> u64 {
        if self.reaction_samples.is_empty() {
            return 0;
        }
        let sum: u64 = self.reaction_samples.iter().sum();
        let n = self.reaction_samples.len() as u64;
        (sum + n / 2) / n
    }

    pub fn best_reaction_ms(&self) -> Option<u64> {
        self.reaction_samples.iter().copied().min()
    }

    pub fn count(&self, reason: MissReason) -> u32 {
        let wanted = RoundOutcome::from(reason);
        self.outcomes.iter().filter(|o| **o == wanted).count() as u32
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
