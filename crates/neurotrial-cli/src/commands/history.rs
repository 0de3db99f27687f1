use clap::Subcommand;
use neurotrial_core::{Database, ExerciseKind};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded results, newest first
    List {
        #[arg(long, value_parser = super::parse_exercise)]
        exercise: Option<ExerciseKind>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Aggregate statistics
    Stats {
        #[arg(long, value_parser = super::parse_exercise)]
        exercise: Option<ExerciseKind>,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        HistoryAction::List { exercise, limit } => {
            let records = db.list_completions(exercise, limit)?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        HistoryAction::Stats { exercise } => {
            let stats = db.stats(exercise)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
