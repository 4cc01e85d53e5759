//! Error types for the Cadence lockstep framework.
//!
//! Three severities, mirroring the dispatch model: rejections returned
//! to the caller ([`ScheduleError`], [`ClockError`]), run-fatal causes
//! that stop the run and ride the Stopped lifecycle notification
//! ([`RunError`] and its members), and load-time persistence errors
//! (defined in the replay crate, surfaced before a run exists).

use std::error::Error;
use std::fmt;

use crate::id::LockstepPeriod;

/// A peer or replay source supplied a task for a period that is already
/// behind the dispatch horizon.
///
/// Fatal to the run: there is no protocol for re-voting a missed
/// period, so the run transitions to Stopped with this as the cause.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesyncError {
    /// The period the offending task targeted.
    pub period: LockstepPeriod,
    /// The most recently dispatched period at the time of the violation.
    pub last_dispatched: LockstepPeriod,
    /// Human-readable description of the violation.
    pub detail: String,
}

impl fmt::Display for DesyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "desynchronization: task for period {} behind dispatch horizon {}: {}",
            self.period, self.last_dispatched, self.detail
        )
    }
}

impl Error for DesyncError {}

/// A task could not be accepted by the scheduler.
///
/// Non-fatal to the process; the caller must treat it as a logic bug
/// (e.g. scheduling into a run that has already stopped).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// The run has stopped; no further tasks are accepted.
    Stopped,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "run has stopped; task rejected"),
        }
    }
}

impl Error for ScheduleError {}

/// The simulation failed to execute a dispatched task.
///
/// Run-fatal: dispatched tasks cannot be rolled back, so divergence
/// from the recorded stream is unrecoverable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationError {
    /// The period during which the failure occurred.
    pub period: LockstepPeriod,
    /// Human-readable description of the failure.
    pub reason: String,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "simulation failed at period {}: {}", self.period, self.reason)
    }
}

impl Error for SimulationError {}

/// Errors from clock handle operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClockError {
    /// The clock thread has stopped.
    Stopped,
    /// `save_remaining_tasks` requires the clock to be pausing or
    /// stopped; exporting from a running clock would race dispatch.
    NotPaused,
    /// The clock thread did not stop within the join timeout.
    JoinTimeout,
    /// The clock thread panicked; its state could not be recovered.
    Panicked,
    /// The control channel is at capacity.
    ChannelFull,
    /// Writing through the task sink failed.
    SinkWrite {
        /// Description of the underlying write failure.
        detail: String,
    },
    /// A recorded/remote task violated the lockstep protocol.
    Desync(DesyncError),
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "clock has stopped"),
            Self::NotPaused => {
                write!(f, "remaining-task export requires a pausing or stopped clock")
            }
            Self::JoinTimeout => write!(f, "clock thread did not stop within the join timeout"),
            Self::Panicked => write!(f, "clock thread panicked; state not recovered"),
            Self::ChannelFull => write!(f, "clock control channel full"),
            Self::SinkWrite { detail } => write!(f, "task sink write failed: {detail}"),
            Self::Desync(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ClockError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Desync(e) => Some(e),
            _ => None,
        }
    }
}

/// Cause attached to a run that stopped abnormally.
///
/// Carried by the Stopped lifecycle notification instead of unwinding
/// out of the clock run loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunError {
    /// The command stream violated the lockstep protocol.
    Desync(DesyncError),
    /// The simulation failed while executing a dispatched task.
    Simulation(SimulationError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desync(e) => write!(f, "{e}"),
            Self::Simulation(e) => write!(f, "{e}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Desync(e) => Some(e),
            Self::Simulation(e) => Some(e),
        }
    }
}

impl From<DesyncError> for RunError {
    fn from(e: DesyncError) -> Self {
        Self::Desync(e)
    }
}

impl From<SimulationError> for RunError {
    fn from(e: SimulationError) -> Self {
        Self::Simulation(e)
    }
}
