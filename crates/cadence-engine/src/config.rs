//! Clock configuration, validation, and error types.
//!
//! [`ClockConfig`] is the builder-input for starting a lockstep clock.
//! [`validate()`](ClockConfig::validate) checks structural invariants
//! before the run-loop thread is spawned.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use cadence_core::LockstepPeriod;

// ── ClockConfig ────────────────────────────────────────────────────

/// Complete configuration for starting a lockstep clock.
///
/// Passed to [`GameClock::start`](crate::clock::GameClock::start).
/// `validate()` checks all structural invariants first.
#[derive(Clone, Debug)]
pub struct ClockConfig {
    /// Duration of one lockstep period in milliseconds. Default: 30.
    pub period_duration_ms: u64,
    /// Period at which the clock begins dispatching. Zero for a fresh
    /// game, the continuation point when resuming from a savegame.
    pub start_period: LockstepPeriod,
    /// Wall-clock budget for one period's dispatch work, in
    /// milliseconds. Dispatches exceeding it are counted as budget
    /// violations in the period metrics. `None` disables the check.
    pub period_budget_ms: Option<u64>,
    /// Whether the clock starts in the pausing state. Tooling that
    /// needs to schedule tasks before any time advances starts paused.
    pub start_pausing: bool,
    /// Maximum requests buffered in the control channel. Default: 256.
    pub ctl_capacity: usize,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period_duration_ms: 30,
            start_period: LockstepPeriod(0),
            period_budget_ms: None,
            start_pausing: false,
            ctl_capacity: 256,
        }
    }
}

impl ClockConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.period_duration_ms == 0 {
            return Err(ConfigError::ZeroPeriodDuration);
        }
        if self.ctl_capacity == 0 {
            return Err(ConfigError::CtlCapacityZero);
        }
        if let Some(budget) = self.period_budget_ms {
            if budget == 0 {
                return Err(ConfigError::ZeroPeriodBudget);
            }
        }
        Ok(())
    }

    /// The wall-clock duration of one period.
    pub fn period_duration(&self) -> Duration {
        Duration::from_millis(self.period_duration_ms)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`ClockConfig::validate()`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// period_duration_ms is zero.
    ZeroPeriodDuration,
    /// ctl_capacity is zero.
    CtlCapacityZero,
    /// period_budget_ms is present but zero.
    ZeroPeriodBudget,
    /// The run-loop thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of the spawn failure.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPeriodDuration => write!(f, "period_duration_ms must be at least 1"),
            Self::CtlCapacityZero => write!(f, "ctl_capacity must be at least 1"),
            Self::ZeroPeriodBudget => write!(f, "period_budget_ms must be at least 1 when set"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for ConfigError {}
