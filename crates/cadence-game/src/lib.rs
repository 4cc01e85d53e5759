//! Game lifecycle, savegame persistence, and replay split tooling for
//! Cadence.
//!
//! This crate sits above the clock and the replay codec and owns the
//! run as a whole:
//!
//! - [`GameLifecycle`]: the monotonic Created/Starting/Started/
//!   Stopping/Stopped state machine, observable by polling, blocking,
//!   or listener.
//! - [`GameRunner`]: launches a clock from a replay header (or a full
//!   replay stream), supervises it, and drives the lifecycle, including
//!   forwarding run-fatal clock stops to listeners.
//! - [`SavegameRepository`]: storage for quick-save snapshots, with an
//!   in-memory implementation and the [`SavegameHost`] bridge that
//!   writes snapshots from the clock's save hook.
//! - [`split`]: the play-to-target, snapshot, export-remainder workflow
//!   that turns one long replay into a savegame plus an equivalent
//!   continuation replay.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod host;
pub mod lifecycle;
pub mod runner;
pub mod savegame;
pub mod split;

pub use host::SavegameHost;
pub use lifecycle::{GameLifecycle, LifecycleError, LifecycleEvent, LifecycleState, RunHandle};
pub use runner::{GameRunner, LaunchError, RunListener};
pub use savegame::{
    newest_savegame, MemoryRepository, SavegameEntry, SavegameMeta, SavegameRepository,
};
pub use split::{play_to_target_and_save, write_continuation_replay, SplitError};
