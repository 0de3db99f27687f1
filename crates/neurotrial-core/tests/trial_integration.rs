//! Integration tests for full trial sessions.

use neurotrial_core::{
    Event, ExerciseKind, ExerciseProfile, Phase, ResponseStrategy, RoundOutcome, Simulator,
    TrialController,
};
use proptest::prelude::*;

fn run(kind: ExerciseKind, strategy: ResponseStrategy, seed: u64) -> (u32, u32) {
    let result = Simulator::new(Some(seed))
        .run(kind.profile(), &strategy)
        .unwrap();
    let completed = result
        .events
        .iter()
        .filter(|e| matches!(e, Event::SessionCompleted { .. }))
        .count();
    assert_eq!(completed, 1, "{kind}: expected exactly one completion");
    (result.summary.score, result.summary.total_rounds)
}

#[test]
fn always_correct_scores_ten_of_ten() {
    for kind in ExerciseKind::ALL {
        let strategy = ResponseStrategy::Perfect { reaction_ms: 280 };
        assert_eq!(run(kind, strategy, 11), (10, 10), "{kind}");
    }
}

#[test]
fn always_early_scores_zero_of_ten() {
    for kind in ExerciseKind::ALL {
        assert_eq!(run(kind, ResponseStrategy::AlwaysEarly, 12), (0, 10), "{kind}");
    }
}

#[test]
fn odd_rounds_correct_scores_five_of_ten() {
    for kind in ExerciseKind::ALL {
        let strategy = ResponseStrategy::HitRounds {
            rounds: vec![1, 3, 5, 7, 9],
            reaction_ms: 350,
        };
        assert_eq!(run(kind, strategy, 13), (5, 10), "{kind}");
    }
}

#[test]
fn odd_rounds_outcomes_alternate() {
    let strategy = ResponseStrategy::HitRounds {
        rounds: vec![1, 3, 5, 7, 9],
        reaction_ms: 350,
    };
    let result = Simulator::new(Some(3))
        .run(ExerciseProfile::reaction_test(), &strategy)
        .unwrap();
    for (i, outcome) in result.summary.outcomes.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(*outcome, RoundOutcome::Hit { reaction_ms: 350 });
        } else {
            assert_eq!(*outcome, RoundOutcome::TooSlow);
        }
    }
    assert_eq!(result.summary.average_reaction_ms, 350);
}

#[test]
fn never_responding_still_finishes() {
    let result = Simulator::new(Some(4))
        .run(ExerciseProfile::wait_for_it(), &ResponseStrategy::NeverRespond)
        .unwrap();
    assert_eq!(result.summary.score, 0);
    assert_eq!(result.summary.too_slow_count, 10);
    assert_eq!(result.summary.average_reaction_ms, 0);
    let ticks = result
        .events
        .iter()
        .filter(|e| matches!(e, Event::CountdownTick { .. }))
        .count();
    assert!(ticks >= 20, "wait-for-it should tick at least twice per round");
}

#[test]
fn manual_session_with_custom_round_count() {
    let profile = ExerciseProfile::stop_light().with_total_rounds(4);
    let mut trial = TrialController::with_seed(profile, Some(21)).unwrap();
    trial.start(0);

    let mut now = 0;
    while !trial.is_finished() {
        if trial.phase() == Phase::Go {
            now = trial.go_started_ms().unwrap() + 400;
            trial.input(now);
        } else {
            now = trial.next_deadline_ms().unwrap();
            trial.tick(now);
        }
    }

    let summary = trial.take_completion().unwrap();
    assert_eq!((summary.score, summary.total_rounds), (4, 4));
    assert_eq!(summary.best_reaction_ms, Some(400));
    assert_eq!(summary.duration_ms, now);
}

fn resolved_rounds(events: &[Event]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::RoundResolved { round, .. } => Some(*round),
            _ => None,
        })
        .collect()
}

proptest! {
    #[test]
    fn invariants_hold_for_any_input_script(
        seed in any::<u64>(),
        kind in 0usize..3,
        rounds in 1u32..12,
        script in prop::collection::vec((any::<bool>(), 0u64..5_000), 0..120),
    ) {
        let profile = ExerciseKind::ALL[kind].profile().with_total_rounds(rounds);
        let mut trial = TrialController::with_seed(profile, Some(seed)).unwrap();
        let mut now = 0;
        let mut events = trial.start(now);
        let mut last_round = 0;

        for (tap, delta) in script {
            now += delta;
            let batch = if tap { trial.input(now) } else { trial.tick(now) };
            events.extend(batch);
            prop_assert!(trial.score() <= trial.round());
            prop_assert!(trial.round() <= trial.total_rounds());
            prop_assert!(trial.round() >= last_round);
            last_round = trial.round();
        }

        while !trial.is_finished() {
            now = trial.next_deadline_ms().unwrap().max(now);
            events.extend(trial.tick(now));
            prop_assert!(trial.score() <= trial.round());
            prop_assert!(trial.round() >= last_round);
            last_round = trial.round();
        }

        prop_assert_eq!(resolved_rounds(&events), (1..=rounds).collect::<Vec<_>>());
        let completions: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                Event::SessionCompleted { summary, .. } => Some(summary.clone()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(completions.len(), 1);
        prop_assert_eq!(completions[0].total_rounds, rounds);
        prop_assert!(completions[0].score <= rounds);
        prop_assert!(trial.next_deadline_ms().is_none());
    }

    #[test]
    fn early_tap_is_always_penalized(seed in any::<u64>(), kind in 0usize..3, frac in 0.0f64..1.0) {
        let profile = ExerciseKind::ALL[kind].profile();
        let feedback_ms = profile.feedback_ms;
        let mut trial = TrialController::with_seed(profile, Some(seed)).unwrap();
        trial.start(0);
        let first_deadline = trial.next_deadline_ms().unwrap();
        let tap_at = (first_deadline as f64 * frac) as u64;

        let events = trial.input(tap_at);
        prop_assert_eq!(trial.last_outcome(), Some(RoundOutcome::Early));
        prop_assert_eq!(trial.score(), 0);
        prop_assert_eq!(trial.round(), 1);
        prop_assert_eq!(trial.phase(), Phase::Result);
        prop_assert_eq!(trial.next_deadline_ms(), Some(tap_at + feedback_ms));
        prop_assert_eq!(resolved_rounds(&events), vec![1]);
    }

    #[test]
    fn silent_go_window_times_out(seed in any::<u64>(), kind in 0usize..3) {
        let mut trial = TrialController::with_seed(ExerciseKind::ALL[kind].profile(), Some(seed)).unwrap();
        trial.start(0);
        while trial.phase() != Phase::Go {
            let d = trial.next_deadline_ms().unwrap();
            trial.tick(d);
        }
        let timeout = trial.next_deadline_ms().unwrap();
        trial.tick(timeout);
        prop_assert_eq!(trial.last_outcome(), Some(RoundOutcome::TooSlow));
        prop_assert_eq!(trial.round(), 1);
        let next = trial.next_deadline_ms().unwrap();
        trial.tick(next);
        prop_assert_eq!(trial.phase(), Phase::Armed);
    }
}
