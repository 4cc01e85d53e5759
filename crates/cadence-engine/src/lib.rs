//! Lockstep clock and deterministic task scheduler for Cadence.
//!
//! The clock is the sole authority for simulation time. It advances in
//! fixed-duration periods on a dedicated run-loop thread that owns the
//! [`TaskScheduler`] and the attached [`Simulation`](cadence_core::Simulation)
//! exclusively; every other thread interacts through the [`GameClock`]
//! handle, which hands requests off via a bounded channel and observes
//! progress through a mutex/condvar shared view. No lock is held across
//! a period dispatch.
//!
//! # Architecture
//!
//! ```text
//! Caller Threads                      Clock Thread
//!     |                                   |
//!     |--schedule_task_at()-------------->| drain ctl channel
//!     |   [ctl_tx: bounded]               | scheduler.take_due(period)
//!     |--set_pausing()/stop()------------>| sim.execute_task() per task
//!     |   (shared view + unpark)          | sim.advance_period(period)
//!     |                                   | publish period, notify_all
//!     |--fast_forward_to(T)----waits----->| sleep to period budget
//!     |   on condvar until time >= T      |   (skipped while fast-forwarding)
//! ```

#![deny(missing_docs)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
mod run_loop;
pub mod scheduler;
pub mod stopwatch;

pub use clock::{ClockCore, GameClock, PauseSwitch, SaveHook, StopWatcher};
pub use config::{ClockConfig, ConfigError};
pub use scheduler::TaskScheduler;
pub use stopwatch::{PeriodMetrics, StatisticsStopWatch};
