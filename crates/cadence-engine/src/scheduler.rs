//! Deterministic per-period task scheduler.
//!
//! [`TaskScheduler`] buckets tasks by target period and hands each
//! bucket back in the canonical dispatch order: ascending period, then
//! ascending `(issuer, insertion_seq)` within a period. Every node in
//! a lockstep session that inserts the same tasks observes the same
//! dispatch order, which is the whole determinism contract.
//!
//! Two insertion paths exist with different lateness policies:
//!
//! - [`schedule`](TaskScheduler::schedule) is the local-injection path.
//!   A target period that has already been dispatched is clamped
//!   forward to the next undispatched period, with a warning. Local
//!   callers race the clock, so lateness here is expected.
//! - [`insert_recorded`](TaskScheduler::insert_recorded) is the
//!   replay/remote path. Lateness there means the recorded stream and
//!   the clock disagree about time, which is unrecoverable, so it
//!   fails with a [`DesyncError`].

use std::collections::BTreeMap;

use cadence_core::{DesyncError, LockstepPeriod, ScheduledTask, Task};

// ── TaskScheduler ──────────────────────────────────────────────────

/// Buckets pending tasks by target period.
///
/// Owned exclusively by the clock's run loop. `next_dispatch` is the
/// earliest period that has not yet been dispatched; no task may land
/// before it.
#[derive(Debug)]
pub struct TaskScheduler {
    buckets: BTreeMap<LockstepPeriod, Vec<ScheduledTask>>,
    next_dispatch: LockstepPeriod,
    next_seq: u64,
}

impl TaskScheduler {
    /// Create a scheduler whose first dispatchable period is
    /// `start_period`.
    pub fn new(start_period: LockstepPeriod) -> Self {
        Self {
            buckets: BTreeMap::new(),
            next_dispatch: start_period,
            next_seq: 0,
        }
    }

    /// The earliest period that has not yet been dispatched.
    pub fn next_dispatch(&self) -> LockstepPeriod {
        self.next_dispatch
    }

    /// Number of pending tasks across all periods.
    pub fn pending(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// True when no tasks are pending.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Insert a locally injected task, returning the period it was
    /// actually scheduled for.
    ///
    /// A target period earlier than the next dispatchable period is
    /// clamped forward to it. The caller lost a race against the
    /// clock; dropping the task would diverge the session, dispatching
    /// it in the past is impossible, so the earliest future slot is
    /// the only safe landing point.
    pub fn schedule(&mut self, task: Task) -> LockstepPeriod {
        let mut task = task;
        if task.target_period < self.next_dispatch {
            tracing::warn!(
                target = task.target_period.0,
                clamped_to = self.next_dispatch.0,
                issuer = task.issuer.0,
                "task targets an already dispatched period, clamping forward"
            );
            task.target_period = self.next_dispatch;
        }
        let period = task.target_period;
        self.insert(task);
        period
    }

    /// Insert a task from a recorded or remote stream.
    ///
    /// Unlike [`schedule`](Self::schedule), a target period earlier
    /// than the next dispatchable period is a hard error: the stream
    /// claims a dispatch order this clock can no longer honour.
    pub fn insert_recorded(&mut self, task: Task) -> Result<(), DesyncError> {
        if task.target_period < self.next_dispatch {
            return Err(DesyncError {
                period: task.target_period,
                last_dispatched: LockstepPeriod(self.next_dispatch.0.saturating_sub(1)),
                detail: format!(
                    "recorded task from issuer {} targets period {} behind the clock",
                    task.issuer.0, task.target_period.0,
                ),
            });
        }
        self.insert(task);
        Ok(())
    }

    fn insert(&mut self, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.buckets
            .entry(task.target_period)
            .or_default()
            .push(ScheduledTask {
                task,
                insertion_seq: seq,
            });
    }

    /// Remove and return all tasks due at `period`, in dispatch order.
    ///
    /// Marks `period` as dispatched; subsequent insertions targeting
    /// it or anything earlier are late.
    pub fn take_due(&mut self, period: LockstepPeriod) -> Vec<ScheduledTask> {
        debug_assert!(period >= self.next_dispatch, "periods dispatched out of order");
        self.next_dispatch = period.next();
        let mut due = self.buckets.remove(&period).unwrap_or_default();
        due.sort_by_key(ScheduledTask::dispatch_key);
        due
    }

    /// Drain every pending task, in dispatch order across all periods.
    ///
    /// Used when exporting unfinished state to a savegame. The
    /// scheduler is empty afterwards.
    pub fn drain_remaining(&mut self) -> Vec<ScheduledTask> {
        let buckets = std::mem::take(&mut self.buckets);
        let mut remaining: Vec<ScheduledTask> = buckets.into_values().flatten().collect();
        remaining.sort_by_key(ScheduledTask::dispatch_key);
        remaining
    }

    /// Every pending task in dispatch order, without removing them.
    pub fn remaining_tasks(&self) -> Vec<ScheduledTask> {
        let mut remaining: Vec<ScheduledTask> =
            self.buckets.values().flatten().cloned().collect();
        remaining.sort_by_key(ScheduledTask::dispatch_key);
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{PlayerId, TaskPayload};

    fn task(period: u64, issuer: u8) -> Task {
        Task {
            target_period: LockstepPeriod(period),
            issuer: PlayerId(issuer),
            payload: TaskPayload::Custom {
                kind: 7,
                data: vec![],
            },
        }
    }

    #[test]
    fn take_due_returns_only_matching_period() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        sched.schedule(task(1, 1));
        sched.schedule(task(2, 1));
        sched.schedule(task(1, 2));

        let due = sched.take_due(LockstepPeriod(0));
        assert!(due.is_empty());
        let due = sched.take_due(LockstepPeriod(1));
        assert_eq!(due.len(), 2);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn within_period_order_is_issuer_then_insertion() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        sched.schedule(task(3, 5));
        sched.schedule(task(3, 2));
        sched.schedule(task(3, 2));
        sched.schedule(task(3, 1));

        let due = sched.take_due(LockstepPeriod(3));
        let issuers: Vec<u8> = due.iter().map(|t| t.task.issuer.0).collect();
        assert_eq!(issuers, vec![1, 2, 2, 5]);
        // Same issuer keeps insertion order.
        assert!(due[1].insertion_seq < due[2].insertion_seq);
    }

    #[test]
    fn late_schedule_clamps_to_next_dispatch() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        let _ = sched.take_due(LockstepPeriod(0));
        let _ = sched.take_due(LockstepPeriod(1));

        let effective = sched.schedule(task(0, 3));
        assert_eq!(effective, LockstepPeriod(2));
        let due = sched.take_due(LockstepPeriod(2));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].task.target_period, LockstepPeriod(2));
    }

    #[test]
    fn late_recorded_insert_is_a_desync() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        let _ = sched.take_due(LockstepPeriod(0));
        let _ = sched.take_due(LockstepPeriod(1));

        let err = sched.insert_recorded(task(1, 3)).unwrap_err();
        assert_eq!(err.period, LockstepPeriod(1));
        assert_eq!(err.last_dispatched, LockstepPeriod(1));
    }

    #[test]
    fn recorded_insert_at_next_dispatch_is_accepted() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        let _ = sched.take_due(LockstepPeriod(0));
        assert!(sched.insert_recorded(task(1, 3)).is_ok());
    }

    #[test]
    fn drain_remaining_is_globally_ordered_and_empties() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        sched.schedule(task(5, 1));
        sched.schedule(task(2, 9));
        sched.schedule(task(2, 3));

        let remaining = sched.drain_remaining();
        let keys: Vec<(u64, u8)> = remaining
            .iter()
            .map(|t| (t.task.target_period.0, t.task.issuer.0))
            .collect();
        assert_eq!(keys, vec![(2, 3), (2, 9), (5, 1)]);
        assert!(sched.is_empty());
    }

    #[test]
    fn remaining_tasks_does_not_remove() {
        let mut sched = TaskScheduler::new(LockstepPeriod(0));
        sched.schedule(task(4, 1));
        assert_eq!(sched.remaining_tasks().len(), 1);
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn start_period_gates_recorded_inserts() {
        let mut sched = TaskScheduler::new(LockstepPeriod(100));
        assert!(sched.insert_recorded(task(99, 1)).is_err());
        assert!(sched.insert_recorded(task(100, 1)).is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Interleaved schedules always drain in the canonical
            /// order regardless of insertion order.
            #[test]
            fn drain_order_is_canonical(
                inserts in proptest::collection::vec((0u64..20, 0u8..12), 0..64)
            ) {
                let mut sched = TaskScheduler::new(LockstepPeriod(0));
                for (period, issuer) in inserts {
                    sched.schedule(task(period, issuer));
                }
                let drained = sched.drain_remaining();
                for pair in drained.windows(2) {
                    prop_assert!(pair[0].dispatch_key() <= pair[1].dispatch_key());
                }
            }

            /// take_due over every period in order yields the same
            /// sequence as a single drain.
            #[test]
            fn take_due_agrees_with_drain(
                inserts in proptest::collection::vec((0u64..10, 0u8..12), 0..64)
            ) {
                let mut a = TaskScheduler::new(LockstepPeriod(0));
                let mut b = TaskScheduler::new(LockstepPeriod(0));
                for (period, issuer) in &inserts {
                    a.schedule(task(*period, *issuer));
                    b.schedule(task(*period, *issuer));
                }
                let drained = a.drain_remaining();
                let mut stepped = Vec::new();
                for p in 0..10 {
                    stepped.extend(b.take_due(LockstepPeriod(p)));
                }
                let key = |t: &ScheduledTask| (t.task.target_period, t.task.issuer);
                prop_assert_eq!(
                    drained.iter().map(key).collect::<Vec<_>>(),
                    stepped.iter().map(key).collect::<Vec<_>>()
                );
            }
        }
    }
}
