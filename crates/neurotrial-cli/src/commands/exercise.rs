use clap::Subcommand;
use neurotrial_core::{Config, ExerciseKind};
use serde_json::json;

#[derive(Subcommand)]
pub enum ExerciseAction {
    /// List available exercises
    List,
    /// Show the stage layout of one exercise, with configuration applied
    Show {
        #[arg(value_parser = super::parse_exercise)]
        exercise: ExerciseKind,
    },
}

pub fn run(action: ExerciseAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ExerciseAction::List => {
            let list: Vec<_> = ExerciseKind::ALL
                .iter()
                .map(|kind| {
                    json!({
                        "id": kind.id(),
                        "name": kind.display_name(),
                        "category": kind.category(),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        ExerciseAction::Show { exercise } => {
            let profile = Config::load_or_default().profile(exercise);
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    Ok(())
}
