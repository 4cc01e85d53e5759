//! Per-period dispatch timing statistics.
//!
//! The run loop wraps each period's dispatch work in a
//! [`StatisticsStopWatch`] measurement. The collected samples answer
//! two questions after a run: what the typical (median) dispatch cost
//! was, and what the worst case was. Both feed performance assertions
//! in scenario tests and the budget-violation counter that the clock
//! reports through [`PeriodMetrics`].

use std::fmt;
use std::time::{Duration, Instant};

// ── StatisticsStopWatch ────────────────────────────────────────────

/// Accumulates wall-clock samples of period dispatch work.
///
/// Samples are stored in insertion order; `median()` sorts a copy on
/// demand. Optionally checks each sample against a budget and counts
/// violations.
#[derive(Debug)]
pub struct StatisticsStopWatch {
    samples: Vec<Duration>,
    budget: Option<Duration>,
    budget_violations: u64,
    started: Option<Instant>,
}

impl StatisticsStopWatch {
    /// Create a stopwatch. `budget` is the per-sample ceiling; `None`
    /// disables violation counting.
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            samples: Vec::new(),
            budget,
            budget_violations: 0,
            started: None,
        }
    }

    /// Begin a measurement. Overwrites any unfinished measurement.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Finish the current measurement and record the sample.
    ///
    /// A no-op if `start()` was not called since the last `stop()`.
    pub fn stop(&mut self) {
        if let Some(started) = self.started.take() {
            self.record(started.elapsed());
        }
    }

    /// Record an externally measured sample. Samples over the budget
    /// are logged and counted, never fatal.
    pub fn record(&mut self, elapsed: Duration) {
        if let Some(budget) = self.budget {
            if elapsed > budget {
                self.budget_violations += 1;
                tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = budget.as_millis() as u64,
                    "period dispatch exceeded its budget"
                );
            }
        }
        self.samples.push(elapsed);
    }

    /// Number of recorded samples.
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Median of the recorded samples, or `None` when empty.
    ///
    /// For an even sample count this returns the lower of the two
    /// middle samples.
    pub fn median(&self) -> Option<Duration> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_unstable();
        Some(sorted[(sorted.len() - 1) / 2])
    }

    /// Largest recorded sample, or `None` when empty.
    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }

    /// Number of samples that exceeded the configured budget.
    pub fn budget_violations(&self) -> u64 {
        self.budget_violations
    }

    /// Snapshot of the current statistics.
    pub fn metrics(&self) -> PeriodMetrics {
        PeriodMetrics {
            dispatched_periods: self.samples.len() as u64,
            median: self.median(),
            max: self.max(),
            budget_violations: self.budget_violations,
        }
    }
}

// ── PeriodMetrics ──────────────────────────────────────────────────

/// Summary of dispatch timing over a clock's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PeriodMetrics {
    /// Total periods dispatched.
    pub dispatched_periods: u64,
    /// Median dispatch duration, `None` before the first dispatch.
    pub median: Option<Duration>,
    /// Maximum dispatch duration, `None` before the first dispatch.
    pub max: Option<Duration>,
    /// Dispatches that exceeded the configured period budget.
    pub budget_violations: u64,
}

impl fmt::Display for PeriodMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "periods={} median={:?} max={:?} budget_violations={}",
            self.dispatched_periods, self.median, self.max, self.budget_violations,
        )
    }
}
