//! Task and payload types dispatched by the lockstep clock.

use crate::id::{LockstepPeriod, PlayerId};

/// An immutable, serializable unit describing one deterministic action.
///
/// Every task is tagged with the lockstep period it must execute in.
/// Tasks are never reordered by arrival wall-clock time: within a period
/// the dispatch order is `(issuer, insertion order)`, which is identical
/// for a live run and a replay of the same stream.
///
/// # Examples
///
/// ```
/// use cadence_core::{LockstepPeriod, PlayerId, Task, TaskPayload};
///
/// let order = Task {
///     target_period: LockstepPeriod(40),
///     issuer: PlayerId(3),
///     payload: TaskPayload::Custom { kind: 7, data: vec![1, 2] },
/// };
/// assert_eq!(order.target_period, LockstepPeriod(40));
///
/// let save = Task::quick_save(LockstepPeriod(40));
/// assert_eq!(save.issuer, PlayerId::SYSTEM);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    /// The lockstep period this task must execute in.
    pub target_period: LockstepPeriod,
    /// The player that issued the task; [`PlayerId::SYSTEM`] for
    /// system-scheduled meta-actions.
    pub issuer: PlayerId,
    /// The deterministic action to perform.
    pub payload: TaskPayload,
}

impl Task {
    /// A system-issued quick-save task targeting `period`.
    pub fn quick_save(period: LockstepPeriod) -> Self {
        Self {
            target_period: period,
            issuer: PlayerId::SYSTEM,
            payload: TaskPayload::QuickSave,
        }
    }
}

/// All task payloads.
///
/// The core interprets only `QuickSave`; everything else is opaque to
/// the clock and handed to the simulation unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskPayload {
    /// Persist a full savegame snapshot at the dispatching period.
    ///
    /// Dispatched to the simulation like any other task so a replayed
    /// run observes the identical task stream, but intercepted by the
    /// game host to write the snapshot through the savegame repository.
    QuickSave,
    /// An opaque deterministic player or GUI action.
    Custom {
        /// Caller-registered action kind.
        kind: u32,
        /// Opaque payload data.
        data: Vec<u8>,
    },
}

impl TaskPayload {
    /// Whether this payload is the system quick-save meta-action.
    pub fn is_quick_save(&self) -> bool {
        matches!(self, TaskPayload::QuickSave)
    }
}

/// A [`Task`] that has entered the scheduler, carrying the monotonic
/// insertion sequence number used as the final ordering tie-break.
///
/// The sequence number is assigned by the scheduler, overwriting
/// whatever the caller may have set, and is preserved through replay
/// export so a continuation run replays the identical order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledTask {
    /// The scheduled task.
    pub task: Task,
    /// Monotonic insertion sequence number, scoped to the run.
    pub insertion_seq: u64,
}

impl ScheduledTask {
    /// Composite ordering key: ascending period, then issuer, then
    /// insertion order. This total order is the determinism contract.
    pub fn dispatch_key(&self) -> (LockstepPeriod, PlayerId, u64) {
        (self.task.target_period, self.task.issuer, self.insertion_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(period: u64, issuer: u8, seq: u64) -> ScheduledTask {
        ScheduledTask {
            task: Task {
                target_period: LockstepPeriod(period),
                issuer: PlayerId(issuer),
                payload: TaskPayload::Custom { kind: 0, data: vec![] },
            },
            insertion_seq: seq,
        }
    }

    #[test]
    fn dispatch_key_orders_period_then_issuer_then_seq() {
        let mut tasks = vec![
            custom(2, 0, 0),
            custom(1, 3, 1),
            custom(1, 1, 5),
            custom(1, 1, 2),
        ];
        tasks.sort_by_key(|t| t.dispatch_key());
        let keys: Vec<_> = tasks
            .iter()
            .map(|t| (t.task.target_period.0, t.task.issuer.0, t.insertion_seq))
            .collect();
        assert_eq!(keys, vec![(1, 1, 2), (1, 1, 5), (1, 3, 1), (2, 0, 0)]);
    }

    #[test]
    fn quick_save_is_system_issued() {
        let task = Task::quick_save(LockstepPeriod(9));
        assert!(task.payload.is_quick_save());
        assert_eq!(task.issuer, PlayerId::SYSTEM);
    }
}
