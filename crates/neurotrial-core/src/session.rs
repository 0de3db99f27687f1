//! Real-time session driver on tokio.
//!
//! Maps tokio's monotonic clock onto the controller's millisecond timeline,
//! sleeps until the next pending deadline and forwards inputs as they
//! arrive. The session resolves to a [`SessionEnd`] instead of calling back
//! into the host.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use crate::events::Event;
use crate::trial::{SessionSummary, TrialController};

/// Signals a host can send into a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Tap,
    /// Leave the exercise. Closing the input channel means the same.
    Exit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEnd {
    Completed(SessionSummary),
    Aborted { round: u32, score: u32 },
}

impl SessionEnd {
    pub fn summary(&self) -> Option<&SessionSummary> {
        match self {
            SessionEnd::Completed(summary) => Some(summary),
            SessionEnd::Aborted { .. } => None,
        }
    }
}

/// Run `trial` from start to completion or exit.
///
/// Events go to `events`; a closed event receiver is not an error. The
/// pending timer is cancelled before an aborted session returns.
pub async fn run_session(
    mut trial: TrialController,
    mut inputs: mpsc::UnboundedReceiver<Input>,
    events: mpsc::UnboundedSender<Event>,
) -> SessionEnd {
    let origin = Instant::now();
    let now_ms = || origin.elapsed().as_millis() as u64;

    publish(&events, trial.start(now_ms()));

    loop {
        if let Some(summary) = trial.take_completion() {
            return SessionEnd::Completed(summary);
        }

        let wake = sleep_until_deadline(origin, trial.next_deadline_ms());
        tokio::select! {
            _ = wake => {
                publish(&events, trial.tick(now_ms()));
            }
            input = inputs.recv() => match input {
                Some(Input::Tap) => publish(&events, trial.input(now_ms())),
                Some(Input::Exit) | None => {
                    let (round, score) = (trial.round(), trial.score());
                    if let Some(event) = trial.abort(now_ms()) {
                        publish(&events, vec![event]);
                    }
                    tracing::debug!(round, score, "session exited by host");
                    return SessionEnd::Aborted { round, score };
                }
            }
        }
    }
}

fn sleep_until_deadline(
    origin: Instant,
    deadline_ms: Option<u64>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    match deadline_ms {
        Some(ms) => Box::pin(tokio::time::sleep_until(origin + Duration::from_millis(ms))),
        None => Box::pin(std::future::pending()),
    }
}

fn publish(events: &mpsc::UnboundedSender<Event>, batch: Vec<Event>) {
    for event in batch {
        let _ = events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::{ExerciseProfile, Phase};

    /// Taps `reaction_ms` after every go signal.
    async fn responder(
        mut events: mpsc::UnboundedReceiver<Event>,
        inputs: mpsc::UnboundedSender<Input>,
        reaction_ms: u64,
    ) -> Vec<Event> {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            if let Event::StageEntered { phase: Phase::Go, .. } = event {
                tokio::time::sleep(Duration::from_millis(reaction_ms)).await;
                let _ = inputs.send(Input::Tap);
            }
            seen.push(event);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn perfect_session_completes() {
        let trial =
            TrialController::with_seed(ExerciseProfile::reaction_test().with_total_rounds(3), Some(5))
                .unwrap();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let player = tokio::spawn(responder(event_rx, input_tx.clone(), 250));
        let end = run_session(trial, input_rx, event_tx).await;

        let summary = end.summary().expect("completed");
        assert_eq!((summary.score, summary.total_rounds), (3, 3));
        assert!(summary.average_reaction_ms >= 250);

        drop(input_tx);
        let seen = player.await.unwrap();
        let completed = seen
            .iter()
            .filter(|e| matches!(e, Event::SessionCompleted { .. }))
            .count();
        assert_eq!(completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_session_times_out_every_round() {
        let trial =
            TrialController::with_seed(ExerciseProfile::stop_light().with_total_rounds(2), Some(5))
                .unwrap();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();

        let end = run_session(trial, input_rx, event_tx).await;
        drop(input_tx);
        let summary = end.summary().unwrap();
        assert_eq!(summary.score, 0);
        assert_eq!(summary.too_slow_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_aborts_session() {
        let trial = TrialController::with_seed(ExerciseProfile::wait_for_it(), Some(5)).unwrap();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        input_tx.send(Input::Exit).unwrap();
        let end = run_session(trial, input_rx, event_tx).await;
        assert_eq!(end, SessionEnd::Aborted { round: 0, score: 0 });

        let mut last = None;
        while let Ok(event) = event_rx.try_recv() {
            last = Some(event);
        }
        assert!(matches!(last, Some(Event::SessionAborted { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_input_channel_aborts() {
        let trial = TrialController::with_seed(ExerciseProfile::reaction_test(), Some(5)).unwrap();
        let (input_tx, input_rx) = mpsc::unbounded_channel::<Input>();
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        drop(input_tx);
        let end = run_session(trial, input_rx, event_tx).await;
        assert!(end.summary().is_none());
    }
}
