//! User-facing [`GameClock`] handle and the run-loop-owned [`ClockCore`].
//!
//! `GameClock::start` moves a [`ClockCore`] (scheduler, simulation,
//! stopwatch) onto a dedicated clock thread. The handle talks to that
//! thread over a bounded control channel with per-request reply
//! channels, and observes time through a mutex/condvar shared view
//! that the clock thread publishes into after every dispatched period.
//!
//! On `stop()` the thread is joined and the core recovered, so the
//! remaining tasks and final simulation state stay reachable after the
//! run ends. That recovery is what makes the split flow work: stop at
//! the target period, then export the undispatched tail from the
//! recovered core.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cadence_core::{
    ClockError, DesyncError, LockstepPeriod, RunError, ScheduledTask, Simulation, Task, TaskSink,
};

use crate::config::{ClockConfig, ConfigError};
use crate::run_loop;
use crate::scheduler::TaskScheduler;
use crate::stopwatch::{PeriodMetrics, StatisticsStopWatch};

/// How long `stop()` waits for the clock thread before giving up.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
/// Poll interval for join and pause waits.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(10);

// ── Control messages ─────────────────────────────────────────────

/// A request handed to the clock thread, paired with a reply channel.
pub(crate) enum ClockCtl {
    /// Insert a locally injected task; replies with the effective period.
    Schedule {
        task: Task,
        reply: crossbeam_channel::Sender<LockstepPeriod>,
    },
    /// Insert tasks from a recorded or remote stream (strict lateness).
    FeedRecorded {
        tasks: Vec<Task>,
        reply: crossbeam_channel::Sender<Result<(), DesyncError>>,
    },
    /// Snapshot the undispatched tasks in dispatch order.
    RemainingTasks {
        reply: crossbeam_channel::Sender<Vec<ScheduledTask>>,
    },
    /// Snapshot the dispatch timing statistics.
    Metrics {
        reply: crossbeam_channel::Sender<PeriodMetrics>,
    },
}

// ── Shared view ──────────────────────────────────────────────────

/// State published by the clock thread, observed by handle callers.
#[derive(Debug)]
pub(crate) struct SharedState {
    /// Earliest period not yet dispatched.
    pub next_period: LockstepPeriod,
    /// While true the clock accepts tasks but does not advance.
    pub pausing: bool,
    /// Fast-forward target; cleared (and pausing set) once reached.
    pub fast_forward_target_ms: Option<u64>,
    /// The run loop has exited.
    pub stopped: bool,
    /// Cause when the run stopped abnormally.
    pub stop_cause: Option<RunError>,
}

pub(crate) struct SharedView {
    pub state: Mutex<SharedState>,
    pub advanced: Condvar,
}

/// Simulation time reported for a given next-undispatched period:
/// the start time of the most recently dispatched period, zero before
/// the first dispatch.
pub(crate) fn time_of(next_period: LockstepPeriod, period_duration_ms: u64) -> u64 {
    (next_period.0 * period_duration_ms).saturating_sub(period_duration_ms)
}

// ── ClockCore ────────────────────────────────────────────────────

/// Hook invoked when a quick-save task dispatches, with the clock
/// thread quiescent at the period boundary.
pub type SaveHook = Box<dyn FnMut(LockstepPeriod, &dyn Simulation) -> io::Result<()> + Send>;

/// Scheduler, simulation, and dispatch statistics.
///
/// Owned exclusively by the clock thread while running; returned to
/// the [`GameClock`] on `stop()` for post-run inspection and
/// remaining-task export.
pub struct ClockCore {
    scheduler: TaskScheduler,
    simulation: Box<dyn Simulation>,
    stopwatch: StatisticsStopWatch,
    save_hook: Option<SaveHook>,
}

impl ClockCore {
    pub(crate) fn new(
        config: &ClockConfig,
        simulation: Box<dyn Simulation>,
        save_hook: Option<SaveHook>,
    ) -> Self {
        Self {
            scheduler: TaskScheduler::new(config.start_period),
            simulation,
            stopwatch: StatisticsStopWatch::new(config.period_budget_ms.map(Duration::from_millis)),
            save_hook,
        }
    }

    /// Dispatch all tasks due at the next period, then advance the
    /// simulation. Returns the period that was dispatched.
    pub(crate) fn dispatch_next(&mut self) -> Result<LockstepPeriod, RunError> {
        let period = self.scheduler.next_dispatch();
        self.stopwatch.start();
        let due = self.scheduler.take_due(period);
        if !due.is_empty() {
            tracing::debug!(period = period.0, tasks = due.len(), "dispatching period");
        }
        let mut save_requested = false;
        for scheduled in &due {
            self.simulation.execute_task(period, &scheduled.task)?;
            save_requested |= scheduled.task.payload.is_quick_save();
        }
        self.simulation.advance_period(period);
        self.stopwatch.stop();
        // The snapshot captures state at the end of the period, so a
        // continuation resuming at the following period replays the
        // identical remainder. Save I/O is outside the period budget.
        if save_requested {
            self.run_save_hook(period);
        }
        Ok(period)
    }

    /// A failed save does not corrupt the task stream, so it is logged
    /// rather than stopping the run.
    fn run_save_hook(&mut self, period: LockstepPeriod) {
        if let Some(hook) = self.save_hook.as_mut() {
            if let Err(e) = hook(period, self.simulation.as_ref()) {
                tracing::error!(period = period.0, error = %e, "quick-save hook failed");
            }
        }
    }

    pub(crate) fn scheduler_mut(&mut self) -> &mut TaskScheduler {
        &mut self.scheduler
    }

    /// Every undispatched task, in dispatch order.
    pub fn remaining_tasks(&self) -> Vec<ScheduledTask> {
        self.scheduler.remaining_tasks()
    }

    /// The earliest period not yet dispatched.
    pub fn next_period(&self) -> LockstepPeriod {
        self.scheduler.next_dispatch()
    }

    /// Dispatch timing statistics for the run so far.
    pub fn metrics(&self) -> PeriodMetrics {
        self.stopwatch.metrics()
    }

    /// The simulation in its current state.
    pub fn simulation(&self) -> &dyn Simulation {
        self.simulation.as_ref()
    }

    /// Deterministic hash of the simulation state.
    pub fn state_hash(&self) -> u64 {
        self.simulation.state_hash()
    }
}

impl std::fmt::Debug for ClockCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockCore")
            .field("next_period", &self.scheduler.next_dispatch())
            .field("pending_tasks", &self.scheduler.pending())
            .field("metrics", &self.stopwatch.metrics())
            .finish()
    }
}

// ── GameClock ────────────────────────────────────────────────────

/// Handle to a running lockstep clock.
///
/// The sole authority for simulation time. All mutation of clock and
/// scheduler state happens on the clock thread; this handle only sends
/// requests and waits on the published view.
pub struct GameClock {
    ctl_tx: Option<crossbeam_channel::Sender<ClockCtl>>,
    shared: Arc<SharedView>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<JoinHandle<ClockCore>>,
    recovered: Option<ClockCore>,
    period_duration_ms: u64,
}

impl GameClock {
    /// Validate `config`, spawn the clock thread, and return the handle.
    ///
    /// `save_hook` runs on the clock thread whenever a quick-save task
    /// dispatches; the game host uses it to write savegames at a
    /// consistent period boundary.
    pub fn start(
        config: ClockConfig,
        simulation: Box<dyn Simulation>,
        save_hook: Option<SaveHook>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let core = ClockCore::new(&config, simulation, save_hook);
        let (ctl_tx, ctl_rx) = crossbeam_channel::bounded(config.ctl_capacity);
        let shared = Arc::new(SharedView {
            state: Mutex::new(SharedState {
                next_period: config.start_period,
                pausing: config.start_pausing,
                fast_forward_target_ms: None,
                stopped: false,
                stop_cause: None,
            }),
            advanced: Condvar::new(),
        });
        let stop_flag = Arc::new(AtomicBool::new(false));
        let period_duration_ms = config.period_duration_ms;

        let thread_shared = Arc::clone(&shared);
        let thread_stop = Arc::clone(&stop_flag);
        let thread = thread::Builder::new()
            .name("cadence-clock".into())
            .spawn(move || run_loop::run(core, ctl_rx, thread_shared, thread_stop, config))
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("clock thread: {e}"),
            })?;

        tracing::info!("lockstep clock started");
        Ok(Self {
            ctl_tx: Some(ctl_tx),
            shared,
            stop_flag,
            thread: Some(thread),
            recovered: None,
            period_duration_ms,
        })
    }

    /// Duration of one lockstep period in milliseconds.
    pub fn period_duration_ms(&self) -> u64 {
        self.period_duration_ms
    }

    /// The earliest period not yet dispatched.
    pub fn next_period(&self) -> LockstepPeriod {
        self.lock_state().next_period
    }

    /// Simulation time in milliseconds: the start time of the most
    /// recently dispatched period, zero before the first dispatch.
    pub fn current_time_ms(&self) -> u64 {
        time_of(self.lock_state().next_period, self.period_duration_ms)
    }

    /// Whether the clock is currently pausing.
    pub fn is_pausing(&self) -> bool {
        self.lock_state().pausing
    }

    /// Whether the run loop has exited.
    pub fn is_stopped(&self) -> bool {
        self.lock_state().stopped
    }

    /// Cause of an abnormal stop, if any.
    pub fn stop_cause(&self) -> Option<RunError> {
        self.lock_state().stop_cause.clone()
    }

    /// Enable or disable pausing. A pausing clock accepts tasks but
    /// does not advance time.
    pub fn set_pausing(&self, pausing: bool) {
        let mut state = self.lock_state();
        if state.pausing != pausing {
            tracing::info!(pausing, "clock pausing changed");
            state.pausing = pausing;
            self.shared.advanced.notify_all();
        }
    }

    /// Insert a locally injected task, returning the period it was
    /// actually scheduled for (clamped forward when late).
    ///
    /// Blocks until the clock thread has accepted the task, so a
    /// subsequent fast-forward is guaranteed to dispatch it.
    pub fn schedule_task_at(&self, task: Task) -> Result<LockstepPeriod, ClockError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send_ctl(ClockCtl::Schedule {
            task,
            reply: reply_tx,
        })?;
        reply_rx.recv().map_err(|_| ClockError::Stopped)
    }

    /// Insert tasks from a recorded or remote stream.
    ///
    /// A task behind the dispatch horizon is a protocol violation:
    /// the run stops with the desync as its cause and the error is
    /// returned here.
    pub fn feed_recorded(&self, tasks: Vec<Task>) -> Result<(), ClockError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send_ctl(ClockCtl::FeedRecorded {
            tasks,
            reply: reply_tx,
        })?;
        match reply_rx.recv() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(desync)) => Err(ClockError::Desync(desync)),
            Err(_) => Err(ClockError::Stopped),
        }
    }

    /// Block the calling thread until simulation time reaches
    /// `target_ms` or the run stops, whichever comes first.
    ///
    /// The clock thread advances without realtime pacing until the
    /// target, then enters the pausing state so time does not
    /// overshoot the period boundary containing the target. While the
    /// clock is pausing when this is called, the wait does not advance
    /// time; another thread must resume the clock first.
    pub fn fast_forward_to(&self, target_ms: u64) -> Result<(), ClockError> {
        let mut state = self.lock_state();
        if state.stopped {
            return Err(ClockError::Stopped);
        }
        if time_of(state.next_period, self.period_duration_ms) >= target_ms {
            return Ok(());
        }
        tracing::info!(target_ms, "fast-forwarding");
        state.fast_forward_target_ms = Some(target_ms);
        loop {
            if time_of(state.next_period, self.period_duration_ms) >= target_ms {
                return Ok(());
            }
            if state.stopped {
                return Err(ClockError::Stopped);
            }
            state = match self.shared.advanced.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Block the calling thread until the run loop has exited,
    /// returning the abnormal stop cause if there was one.
    pub fn await_stopped(&self) -> Option<RunError> {
        let mut state = self.lock_state();
        while !state.stopped {
            state = match self.shared.advanced.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        state.stop_cause.clone()
    }

    /// Export every undispatched task to `sink` in dispatch order.
    ///
    /// Only valid while the clock is pausing or after it stopped;
    /// exporting from a running clock would race dispatch and split
    /// the stream nondeterministically.
    pub fn save_remaining_tasks(&self, sink: &mut dyn TaskSink) -> Result<usize, ClockError> {
        let remaining = if let Some(core) = self.recovered.as_ref() {
            core.remaining_tasks()
        } else {
            if !self.is_pausing() {
                return Err(ClockError::NotPaused);
            }
            let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
            self.send_ctl(ClockCtl::RemainingTasks { reply: reply_tx })?;
            reply_rx.recv().map_err(|_| ClockError::Stopped)?
        };
        for task in &remaining {
            sink.accept(task).map_err(|e| ClockError::SinkWrite {
                detail: e.to_string(),
            })?;
        }
        Ok(remaining.len())
    }

    /// Dispatch timing statistics for the run so far.
    pub fn metrics(&self) -> Result<PeriodMetrics, ClockError> {
        if let Some(core) = self.recovered.as_ref() {
            return Ok(core.metrics());
        }
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(1);
        self.send_ctl(ClockCtl::Metrics { reply: reply_tx })?;
        reply_rx.recv().map_err(|_| ClockError::Stopped)
    }

    /// Stop the run loop and recover the core.
    ///
    /// Cooperative: the thread observes the stop flag at its next
    /// pacing point. Returns the final metrics. Idempotent once the
    /// core has been recovered.
    pub fn stop(&mut self) -> Result<PeriodMetrics, ClockError> {
        self.stop_flag.store(true, Ordering::Release);
        self.ctl_tx = None;
        // Wake a sleeping fast-forward waiter and let the shared view
        // reflect the stop request promptly.
        self.shared.advanced.notify_all();

        if let Some(handle) = self.thread.take() {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(POLL_INTERVAL);
            }
            if !handle.is_finished() {
                self.thread = Some(handle);
                return Err(ClockError::JoinTimeout);
            }
            let core = handle.join().map_err(|_| ClockError::Panicked)?;
            tracing::info!(metrics = %core.metrics(), "lockstep clock stopped");
            self.recovered = Some(core);
        }

        self.recovered
            .as_ref()
            .map(ClockCore::metrics)
            .ok_or(ClockError::Stopped)
    }

    /// The recovered core, available after a successful `stop()`.
    pub fn core(&self) -> Option<&ClockCore> {
        self.recovered.as_ref()
    }

    /// A detached handle that observes the run's stopped state from
    /// another thread, outliving any borrow of the clock itself.
    pub fn stop_watcher(&self) -> StopWatcher {
        StopWatcher {
            shared: Arc::clone(&self.shared),
        }
    }

    /// A detached handle that pauses or releases the clock from
    /// another thread, e.g. while this handle is blocked in
    /// [`fast_forward_to`](Self::fast_forward_to).
    pub fn pause_switch(&self) -> PauseSwitch {
        PauseSwitch {
            shared: Arc::clone(&self.shared),
        }
    }

    fn send_ctl(&self, ctl: ClockCtl) -> Result<(), ClockError> {
        let ctl_tx = self.ctl_tx.as_ref().ok_or(ClockError::Stopped)?;
        ctl_tx.try_send(ctl).map_err(|e| match e {
            crossbeam_channel::TrySendError::Full(_) => ClockError::ChannelFull,
            crossbeam_channel::TrySendError::Disconnected(_) => ClockError::Stopped,
        })
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, SharedState> {
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Pausing control detached from the clock handle, created by
/// [`GameClock::pause_switch`].
///
/// A blocked [`fast_forward_to`](GameClock::fast_forward_to) borrows
/// the clock handle, so releasing a paused clock from another thread
/// goes through this switch instead.
#[derive(Clone)]
pub struct PauseSwitch {
    shared: Arc<SharedView>,
}

impl PauseSwitch {
    /// Enable or disable pausing, waking any blocked waiter.
    pub fn set_pausing(&self, pausing: bool) {
        let mut state = match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.pausing != pausing {
            tracing::info!(pausing, "clock pausing changed");
            state.pausing = pausing;
            self.shared.advanced.notify_all();
        }
    }

    /// Whether the clock is currently pausing.
    pub fn is_pausing(&self) -> bool {
        let state = match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.pausing
    }
}

/// Observer handle created by [`GameClock::stop_watcher`].
///
/// Lets a supervising thread block until the run loop exits without
/// holding a reference to the clock, which the owner may be using to
/// schedule tasks or stop the run concurrently.
#[derive(Clone)]
pub struct StopWatcher {
    shared: Arc<SharedView>,
}

impl StopWatcher {
    /// Block until the run loop has exited, returning the abnormal
    /// stop cause if there was one.
    pub fn wait(&self) -> Option<RunError> {
        let mut state = match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while !state.stopped {
            state = match self.shared.advanced.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        state.stop_cause.clone()
    }

    /// Whether the run loop has already exited.
    pub fn is_stopped(&self) -> bool {
        let state = match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.stopped
    }
}

impl Drop for GameClock {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        self.ctl_tx = None;
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for GameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock_state();
        f.debug_struct("GameClock")
            .field("next_period", &state.next_period)
            .field("pausing", &state.pausing)
            .field("stopped", &state.stopped)
            .field("period_duration_ms", &self.period_duration_ms)
            .finish()
    }
}
