//! Single-slot phase timer.
//!
//! The scheduler holds at most one pending transition. Scheduling a new one
//! replaces (cancels) the previous timer, and every handle carries a fresh
//! id, so a handle that was cancelled or already fired can never fire again.
//!
//! Time is virtual: the caller passes monotonic millisecond timestamps and
//! collects due timers with [`PhaseScheduler::pop_due`].

use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use serde::{Deserialize, Serialize};

use super::profile::Stage;

/// Opaque identifier of a scheduled transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

/// What should happen when a timer fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// The current armed stage ran its full duration.
    StageElapsed,
    /// One countdown interval of the current armed stage passed.
    CountdownTick,
    /// The go window closed without input.
    GoTimeout,
    /// Round feedback has been shown long enough.
    FeedbackElapsed,
}

/// A timer taken out of the slot because it fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub handle: TimerHandle,
    pub due_ms: u64,
    pub transition: Transition,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    handle: TimerHandle,
    due_ms: u64,
    transition: Transition,
}

#[derive(Debug, Clone)]
pub struct PhaseScheduler {
    next_id: u64,
    pending: Option<PendingTimer>,
    rng: Mcg128Xsl64,
}

impl PhaseScheduler {
    /// `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self {
            next_id: 1,
            pending: None,
            rng,
        }
    }

    pub fn sample_delay(&mut self, stage: &Stage) -> u64 {
        stage.sample_delay(&mut self.rng)
    }

    /// Schedule `transition` to fire `delay_ms` after `now_ms`.
    ///
    /// Any pending timer is cancelled first.
    pub fn schedule(&mut self, now_ms: u64, delay_ms: u64, transition: Transition) -> TimerHandle {
        if let Some(previous) = self.pending.take() {
            tracing::trace!(handle = ?previous.handle, "replacing pending timer");
        }
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(PendingTimer {
            handle,
            due_ms: now_ms.saturating_add(delay_ms),
            transition,
        });
        handle
    }

    /// Cancel `handle` if it is still pending. Returns whether anything was
    /// cancelled; unknown, fired and already-cancelled handles are a no-op.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending {
            Some(p) if p.handle == handle => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Drop whatever is pending.
    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending.map(|p| p.handle)
    }

    pub fn next_deadline_ms(&self) -> Option<u64> {
        self.pending.map(|p| p.due_ms)
    }

    /// Take the pending timer if it is due at `now_ms`.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<FiredTimer> {
        match self.pending {
            Some(p) if p.due_ms <= now_ms => {
                self.pending = None;
                Some(FiredTimer {
                    handle: p.handle,
                    due_ms: p.due_ms,
                    transition: p.transition,
                })
            }
            _ => None,
        }
    }

    /// Take the pending timer if `handle` is still the current one, regardless
    /// of its deadline. Used when a host timer facility fires a handle itself.
    pub fn take_if_current(&mut self, handle: TimerHandle) -> Option<FiredTimer> {
        match self.pending {
            Some(p) if p.handle == handle => {
                self.pending = None;
                Some(FiredTimer {
                    handle: p.handle,
                    due_ms: p.due_ms,
                    transition: p.transition,
                })
            }
            _ => None,
        }
    }
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_replaces_pending_timer() {
        let mut s = PhaseScheduler::new(Some(1));
        let first = s.schedule(0, 1000, Transition::StageElapsed);
        let second = s.schedule(10, 500, Transition::GoTimeout);
        assert_ne!(first, second);
        assert_eq!(s.pending(), Some(second));
        assert_eq!(s.next_deadline_ms(), Some(510));
        assert!(!s.cancel(first));
        assert_eq!(s.pending(), Some(second));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut s = PhaseScheduler::new(Some(1));
        let h = s.schedule(0, 100, Transition::GoTimeout);
        assert!(s.cancel(h));
        assert!(!s.cancel(h));
        assert!(s.pop_due(1_000).is_none());
        assert!(s.take_if_current(h).is_none());
    }

    #[test]
    fn cancel_after_fire_is_noop() {
        let mut s = PhaseScheduler::new(Some(1));
        let h = s.schedule(0, 100, Transition::FeedbackElapsed);
        assert!(s.pop_due(99).is_none());
        let fired = s.pop_due(100).unwrap();
        assert_eq!(fired.handle, h);
        assert_eq!(fired.due_ms, 100);
        assert!(!s.cancel(h));
        assert!(s.pop_due(10_000).is_none());
    }

    #[test]
    fn take_if_current_fires_once() {
        let mut s = PhaseScheduler::new(Some(1));
        let h = s.schedule(0, 5_000, Transition::StageElapsed);
        assert_eq!(s.take_if_current(h).map(|f| f.transition), Some(Transition::StageElapsed));
        assert!(s.take_if_current(h).is_none());
    }

    #[test]
    fn seeded_schedulers_agree() {
        let stage = Stage::armed("Yellow", 2000, 4000);
        let mut a = PhaseScheduler::new(Some(42));
        let mut b = PhaseScheduler::new(Some(42));
        for _ in 0..20 {
            assert_eq!(a.sample_delay(&stage), b.sample_delay(&stage));
        }
    }
}
