use clap::{Args, ValueEnum};
use neurotrial_core::{Config, ExerciseKind, ResponseStrategy, Simulator};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    /// Respond after every go signal
    Perfect,
    /// Respond before every go signal
    Early,
    /// Never respond
    Timeout,
    /// Respond on odd rounds only
    Alternate,
    /// Seeded random mix
    Random,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Exercise id (reaction-test, stop-light, wait-for-it)
    #[arg(value_parser = super::parse_exercise)]
    exercise: ExerciseKind,
    #[arg(long, value_enum, default_value = "perfect")]
    strategy: StrategyArg,
    /// Number of rounds (defaults to session.total_rounds)
    #[arg(long)]
    rounds: Option<u32>,
    /// Seed for phase delays and random responses
    #[arg(long)]
    seed: Option<u64>,
    /// Simulated reaction time for hits
    #[arg(long, default_value = "300")]
    reaction_ms: u64,
    /// Include the full event trace in the output
    #[arg(long)]
    trace: bool,
}

impl StrategyArg {
    fn to_strategy(self, total_rounds: u32, reaction_ms: u64) -> ResponseStrategy {
        match self {
            StrategyArg::Perfect => ResponseStrategy::Perfect { reaction_ms },
            StrategyArg::Early => ResponseStrategy::AlwaysEarly,
            StrategyArg::Timeout => ResponseStrategy::NeverRespond,
            StrategyArg::Alternate => ResponseStrategy::HitRounds {
                rounds: (1..=total_rounds).step_by(2).collect(),
                reaction_ms,
            },
            StrategyArg::Random => ResponseStrategy::Random {
                hit_probability: 0.6,
                early_probability: 0.2,
            },
        }
    }
}

pub fn run(args: SimulateArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut profile = config.profile(args.exercise);
    if let Some(rounds) = args.rounds {
        profile = profile.with_total_rounds(rounds);
    }
    let strategy = args.strategy.to_strategy(profile.total_rounds, args.reaction_ms);
    let seed = args.seed.or(config.session.seed);

    let mut result = Simulator::new(seed).run(profile, &strategy)?;
    tracing::info!(
        exercise = %result.exercise,
        score = result.summary.score,
        total = result.summary.total_rounds,
        "simulation finished"
    );
    if !args.trace {
        result.events.clear();
    }
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alternate_hits_odd_rounds() {
        let strategy = StrategyArg::Alternate.to_strategy(5, 250);
        assert_eq!(
            strategy,
            ResponseStrategy::HitRounds {
                rounds: vec![1, 3, 5],
                reaction_ms: 250
            }
        );
    }
}
