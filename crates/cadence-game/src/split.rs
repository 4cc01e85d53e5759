//! Replay splitting: play a run to a target time, snapshot there, and
//! export the rest as a continuation replay.
//!
//! Splitting turns one long replay into a savegame plus a shorter
//! replay that is exactly equivalent to the tail of the original:
//!
//! 1. inject a quick-save task at the period containing the target
//!    time, so the snapshot lands at a deterministic boundary;
//! 2. fast-forward the run to the target, which pauses the clock with
//!    the saving period fully dispatched;
//! 3. write a new replay whose header starts at the period after the
//!    snapshot and whose body is every task the run had not yet
//!    dispatched, in unchanged dispatch order.
//!
//! Loading the savegame and replaying the continuation reproduces the
//! original run bit for bit from the split point on.

use std::error::Error;
use std::fmt;
use std::io::Write;

use cadence_core::{ClockError, LockstepPeriod, Task};
use cadence_replay::{ReplayError, ReplayHeader, ReplayWriter};

use crate::runner::GameRunner;
use crate::savegame::{newest_savegame, SavegameEntry};

/// Errors from the split workflow.
#[derive(Debug)]
pub enum SplitError {
    /// A clock request failed.
    Clock(ClockError),
    /// The continuation replay could not be written.
    Replay(ReplayError),
    /// The runner was launched without a savegame repository, so the
    /// quick save had nowhere to land.
    NoRepository,
    /// The quick save produced no repository entry; its write failed
    /// on the clock thread (see the run's error log).
    NoSavegame,
    /// The newest savegame sits at a different period than the split
    /// asked for. The target was at or behind the clock, so the quick
    /// save could not dispatch there and a continuation written from
    /// the stale entry would drop the tasks between it and the
    /// dispatch horizon.
    StaleSavegame {
        /// Period the split scheduled the quick save at.
        expected: LockstepPeriod,
        /// Period of the newest savegame actually found.
        found: LockstepPeriod,
    },
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clock(e) => write!(f, "split failed: {e}"),
            Self::Replay(e) => write!(f, "split failed: {e}"),
            Self::NoRepository => write!(f, "split requires a savegame repository"),
            Self::NoSavegame => write!(f, "quick save produced no savegame"),
            Self::StaleSavegame { expected, found } => write!(
                f,
                "newest savegame is at period {} but the split asked for {}",
                found.0, expected.0
            ),
        }
    }
}

impl Error for SplitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Clock(e) => Some(e),
            Self::Replay(e) => Some(e),
            Self::NoRepository | Self::NoSavegame | Self::StaleSavegame { .. } => None,
        }
    }
}

impl From<ClockError> for SplitError {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

impl From<ReplayError> for SplitError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

/// Play the run forward to `target_ms` and return the savegame written
/// there.
///
/// The quick save targets the last period the fast-forward dispatches,
/// so the snapshot covers everything up to and including that period
/// and the remaining tasks are exactly the continuation body. The
/// clock is pausing when this returns.
pub fn play_to_target_and_save(
    runner: &GameRunner,
    target_ms: u64,
) -> Result<SavegameEntry, SplitError> {
    let repository = runner.repository().ok_or(SplitError::NoRepository)?;
    let save_period =
        LockstepPeriod::containing(target_ms, runner.clock().period_duration_ms());
    runner.schedule_task_at(Task::quick_save(save_period))?;
    runner.resume();
    runner.clock().fast_forward_to(target_ms)?;
    tracing::info!(
        target_ms,
        period = save_period.0,
        "run played to split target"
    );
    let entry = newest_savegame(repository.as_ref()).ok_or(SplitError::NoSavegame)?;
    if entry.period != save_period {
        return Err(SplitError::StaleSavegame {
            expected: save_period,
            found: entry.period,
        });
    }
    Ok(entry)
}

/// Write the continuation replay for `savegame` into `writer`,
/// returning the number of exported tasks.
///
/// The new header resumes at the period after the snapshot and carries
/// the source run's seed, roster, and local player unchanged; the body
/// is the run's remaining-task export. Requires the clock to be
/// pausing or stopped.
pub fn write_continuation_replay<W: Write>(
    runner: &GameRunner,
    savegame: &SavegameEntry,
    writer: W,
) -> Result<u64, SplitError> {
    let source = runner.header();
    let header = ReplayHeader {
        start_period: savegame.period.next(),
        random_seed: source.random_seed,
        map_name: savegame.map_name.clone(),
        map_id: savegame.map_id,
        local_player_id: source.local_player_id,
        player_settings: source.player_settings.clone(),
    };
    let mut writer = ReplayWriter::new(writer, &header)?;
    runner.clock().save_remaining_tasks(&mut writer)?;
    writer.flush()?;
    tracing::info!(
        start_period = header.start_period.0,
        tasks = writer.tasks_written(),
        "continuation replay written"
    );
    Ok(writer.tasks_written())
}
