use std::io::BufRead;

use clap::Args;
use neurotrial_core::{
    run_session, submit_completion, CompletionReport, Config, Database, Event, ExerciseKind,
    ExerciseCompletionRecord, Input, SessionEnd, TrialController,
};
use tokio::sync::mpsc;

#[derive(Args)]
pub struct PlayArgs {
    /// Exercise id (reaction-test, stop-light, wait-for-it)
    #[arg(value_parser = super::parse_exercise)]
    exercise: ExerciseKind,
    /// Number of rounds (defaults to session.total_rounds)
    #[arg(long)]
    rounds: Option<u32>,
    /// Seed for phase delays
    #[arg(long)]
    seed: Option<u64>,
    /// Do not record the result
    #[arg(long)]
    no_save: bool,
}

pub fn run(args: PlayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let mut profile = config.profile(args.exercise);
    if let Some(rounds) = args.rounds {
        profile = profile.with_total_rounds(rounds);
    }
    let seed = args.seed.or(config.session.seed);
    let trial = TrialController::with_seed(profile, seed)?;

    eprintln!(
        "{}: press Enter on the go signal, q + Enter to quit",
        args.exercise.display_name()
    );

    let runtime = tokio::runtime::Runtime::new()?;
    let end = runtime.block_on(async move {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Blocking stdin reader; dropping the sender on EOF ends the session.
        std::thread::spawn(move || read_keys(input_tx));
        let printer = tokio::spawn(print_events(event_rx));

        let end = run_session(trial, input_rx, event_tx).await;
        if let Err(e) = printer.await {
            tracing::warn!(error = %e, "event printer stopped");
        }
        end
    });

    match end {
        SessionEnd::Completed(summary) => {
            if !args.no_save && config.session.save_results {
                let report =
                    CompletionReport::from_summary(&summary, config.session.section_id.clone());
                if save_result(&report).is_none() {
                    eprintln!("warning: result was not saved");
                }
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        SessionEnd::Aborted { round, score } => {
            eprintln!("exited after {round} rounds (score {score})");
        }
    }
    Ok(())
}

/// Saving never fails the command; the summary is printed either way.
fn save_result(report: &CompletionReport) -> Option<ExerciseCompletionRecord> {
    let db = match Database::open() {
        Ok(db) => db,
        Err(e) => {
            tracing::warn!(error = %e, "could not open results database");
            return None;
        }
    };
    submit_completion(&db, report)
}

fn read_keys(tx: mpsc::UnboundedSender<Input>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let input = if line.trim().eq_ignore_ascii_case("q") {
            Input::Exit
        } else {
            Input::Tap
        };
        if tx.send(input).is_err() || input == Input::Exit {
            break;
        }
    }
}

async fn print_events(mut rx: mpsc::UnboundedReceiver<Event>) {
    while let Some(event) = rx.recv().await {
        if let Event::RoundResolved {
            round,
            outcome,
            score,
            total_rounds,
            ..
        } = &event
        {
            eprintln!("[{round}/{total_rounds}] {} (score {score})", outcome.feedback());
        }
        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to encode event"),
        }
    }
}
