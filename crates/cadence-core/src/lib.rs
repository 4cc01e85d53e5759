//! Core types and traits for the Cadence lockstep framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Cadence workspace:
//! the lockstep period and player identifiers, the deterministic task
//! types dispatched by the clock, player roster settings, error types,
//! and the [`Simulation`](traits::Simulation) seam implemented by the
//! game logic that the clock drives.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
pub mod id;
pub mod player;
pub mod task;
pub mod traits;

pub use error::{ClockError, DesyncError, RunError, ScheduleError, SimulationError};
pub use id::{LockstepPeriod, MapId, PlayerId};
pub use player::{roster_with_ai, AiDifficulty, PlayerSetting, PlayerSettings, MAX_PLAYERS};
pub use task::{ScheduledTask, Task, TaskPayload};
pub use traits::{Simulation, TaskSink};
