//! Trait seams between the clock and the rest of the system.

use std::io;

use crate::error::SimulationError;
use crate::id::LockstepPeriod;
use crate::task::{ScheduledTask, Task};

/// The deterministic game logic driven by the lockstep clock.
///
/// The clock run loop owns the simulation exclusively: it dispatches
/// every due task for the current period in tie-break order via
/// [`execute_task`](Simulation::execute_task), then performs the
/// per-period work via [`advance_period`](Simulation::advance_period).
/// Determinism rests entirely on this contract — given the same
/// starting state and the same `(period, task)` sequence, two
/// simulations must arrive at identical [`state_hash`](Simulation::state_hash)
/// values at every period.
pub trait Simulation: Send + 'static {
    /// Execute one dispatched task. A returned error is fatal to the
    /// run; dispatched tasks are never rolled back.
    fn execute_task(&mut self, period: LockstepPeriod, task: &Task)
        -> Result<(), SimulationError>;

    /// Perform the per-period simulation work (movement, AI, economy)
    /// after all of the period's tasks have executed.
    fn advance_period(&mut self, period: LockstepPeriod);

    /// Deterministic hash of the full simulation state.
    fn state_hash(&self) -> u64;

    /// Write a full state snapshot, sufficient to continue the run.
    fn write_snapshot(&self, w: &mut dyn io::Write) -> io::Result<()>;
}

/// Receives the remaining-task export from the clock.
///
/// Implemented by the replay writer; tests use `Vec<ScheduledTask>`.
/// Tasks arrive in ascending `(period, issuer, insertion order)`.
pub trait TaskSink {
    /// Accept one not-yet-dispatched task.
    fn accept(&mut self, task: &ScheduledTask) -> io::Result<()>;
}

impl TaskSink for Vec<ScheduledTask> {
    fn accept(&mut self, task: &ScheduledTask) -> io::Result<()> {
        self.push(task.clone());
        Ok(())
    }
}
