//! Network-connector abstraction supplying command streams to the
//! Cadence clock.
//!
//! A connector owns the run's [`GameClock`](cadence_engine::GameClock)
//! and is the seam between "where tasks come from" and the lockstep
//! dispatch machinery. Two variants share the [`Connector`] contract:
//! an offline connector that replays a pre-recorded or locally
//! generated stream with no remote peers, and a live connector that
//! would gate each period on every peer's acknowledgement. Only the
//! offline variant lives in this crate; the contract is written so a
//! live implementation can slot in behind the same trait object.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod offline;

pub use offline::OfflineConnector;

use cadence_core::{ClockError, LockstepPeriod, Task};
use cadence_engine::GameClock;

/// Capability set shared by all connector variants: expose the clock,
/// accept locally issued tasks, and feed the recorded/remote stream.
pub trait Connector {
    /// The clock this connector drives. The clock is the sole
    /// authority for simulation time; callers must not keep a
    /// competing notion of elapsed time.
    fn clock(&self) -> &GameClock;

    /// Mutable access to the clock, required for `stop()`.
    fn clock_mut(&mut self) -> &mut GameClock;

    /// Inject a locally issued task, returning the period it was
    /// actually scheduled for. This is the only way external code
    /// (tooling, UI, AI) introduces new deterministic actions into a
    /// running simulation.
    fn schedule_task_at(&self, task: Task) -> Result<LockstepPeriod, ClockError>;

    /// Feed tasks from the connector's command source (a replay body
    /// or a remote peer). A task behind the dispatch horizon is a
    /// protocol violation fatal to the run.
    fn feed_source(&self, tasks: Vec<Task>) -> Result<(), ClockError>;
}
