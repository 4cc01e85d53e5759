//! Cadence: a deterministic lockstep time base and command distribution
//! framework for multiplayer simulations.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Cadence sub-crates. For most users, adding `cadence` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//!
//! // A simulation that counts what the clock dispatches.
//! struct Counter {
//!     executed: u64,
//!     periods: u64,
//! }
//!
//! impl Simulation for Counter {
//!     fn execute_task(
//!         &mut self,
//!         _period: LockstepPeriod,
//!         _task: &Task,
//!     ) -> Result<(), SimulationError> {
//!         self.executed += 1;
//!         Ok(())
//!     }
//!     fn advance_period(&mut self, _period: LockstepPeriod) {
//!         self.periods += 1;
//!     }
//!     fn state_hash(&self) -> u64 {
//!         self.executed ^ self.periods
//!     }
//!     fn write_snapshot(&self, w: &mut dyn std::io::Write) -> std::io::Result<()> {
//!         w.write_all(&self.state_hash().to_le_bytes())
//!     }
//! }
//!
//! // Start paused, stage a command, then release 20 ms of simulation time.
//! let config = ClockConfig {
//!     period_duration_ms: 2,
//!     start_pausing: true,
//!     ..ClockConfig::default()
//! };
//! let sim = Counter { executed: 0, periods: 0 };
//! let mut clock = GameClock::start(config, Box::new(sim), None).unwrap();
//!
//! clock
//!     .schedule_task_at(Task {
//!         target_period: LockstepPeriod(5),
//!         issuer: PlayerId(1),
//!         payload: TaskPayload::Custom { kind: 0, data: vec![] },
//!     })
//!     .unwrap();
//! clock.set_pausing(false);
//! clock.fast_forward_to(10 * 2).unwrap();
//! clock.stop().unwrap();
//!
//! // Periods 0..=10 advanced, and the one staged command executed.
//! assert_eq!(clock.core().unwrap().state_hash(), 1 ^ 11);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | Periods, players, tasks, errors, the `Simulation` seam |
//! | [`engine`] | `cadence-engine` | The lockstep clock, scheduler, and dispatch metrics |
//! | [`net`] | `cadence-net` | Connector abstraction over command sources |
//! | [`replay`] | `cadence-replay` | Replay wire format, reader, and writer |
//! | [`game`] | `cadence-game` | Lifecycle, runner, savegames, and replay splitting |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`cadence-core`).
///
/// Periods, player and map identifiers, the task types dispatched by
/// the clock, error types, and the [`types::Simulation`] trait the
/// game logic implements.
pub use cadence_core as types;

/// The lockstep clock and scheduler (`cadence-engine`).
///
/// [`engine::GameClock`] is the sole authority for simulation time;
/// [`engine::TaskScheduler`] holds the deterministic dispatch order.
pub use cadence_engine as engine;

/// Connector abstraction over command sources (`cadence-net`).
///
/// The [`net::Connector`] trait is the seam between "where tasks come
/// from" and the dispatch machinery; [`net::OfflineConnector`] covers
/// single-player, AI-only, and replay runs.
pub use cadence_net as net;

/// Replay persistence (`cadence-replay`).
///
/// Write command streams with [`replay::ReplayWriter`] and load them
/// with [`replay::ReplayReader`].
pub use cadence_replay as replay;

/// Game lifecycle, savegames, and replay splitting (`cadence-game`).
///
/// [`game::GameRunner`] supervises a run end to end; the [`game::split`]
/// module turns a long replay into a savegame plus an equivalent
/// continuation replay.
pub use cadence_game as game;

/// Common imports for typical Cadence usage.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    // Periods, players, tasks
    pub use cadence_core::{
        AiDifficulty, LockstepPeriod, MapId, PlayerId, PlayerSetting, PlayerSettings,
        ScheduledTask, Task, TaskPayload,
    };

    // Traits
    pub use cadence_core::{Simulation, TaskSink};

    // Errors
    pub use cadence_core::{ClockError, DesyncError, RunError, SimulationError};

    // Clock
    pub use cadence_engine::{ClockConfig, GameClock, PeriodMetrics, SaveHook};

    // Connectors
    pub use cadence_net::{Connector, OfflineConnector};

    // Replay
    pub use cadence_replay::{ReplayError, ReplayHeader, ReplayReader, ReplayWriter};

    // Lifecycle, runner, savegames, splitting
    pub use cadence_game::{
        newest_savegame, play_to_target_and_save, write_continuation_replay, GameLifecycle,
        GameRunner, LifecycleEvent, LifecycleState, MemoryRepository, RunHandle, SavegameEntry,
        SavegameRepository,
    };
}
