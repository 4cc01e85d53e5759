//! The clock thread's main loop: control draining, period dispatch,
//! realtime pacing, and fast-forward.
//!
//! The loop owns the [`ClockCore`] exclusively (moved in via
//! `thread::spawn`). No locks on the dispatch path — requests arrive
//! via the bounded control channel and the shared view is only locked
//! briefly to publish the advanced period.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::Receiver;

use cadence_core::RunError;

use crate::clock::{time_of, ClockCore, ClockCtl, SharedView, POLL_INTERVAL};
use crate::config::ClockConfig;

/// Main clock loop. Runs until the stop flag is set or a run-fatal
/// error occurs.
///
/// Consumes the core and returns it so the handle can recover it via
/// `JoinHandle<ClockCore>` for post-run export.
pub(crate) fn run(
    mut core: ClockCore,
    ctl_rx: Receiver<ClockCtl>,
    shared: Arc<SharedView>,
    stop_flag: Arc<std::sync::atomic::AtomicBool>,
    config: ClockConfig,
) -> ClockCore {
    let period_duration = config.period_duration();
    let cause = loop {
        if stop_flag.load(Ordering::Acquire) {
            break None;
        }

        // 1. Drain control requests.
        if let Err(fatal) = drain_ctl(&mut core, &ctl_rx) {
            break Some(fatal);
        }

        // 2. A pausing clock accepts tasks but does not advance.
        let fast_forward_target = {
            let state = lock(&shared);
            if state.pausing {
                drop(state);
                thread::sleep(POLL_INTERVAL);
                continue;
            }
            state.fast_forward_target_ms
        };

        // 3. Dispatch the next period.
        let period_start = Instant::now();
        let dispatched = match core.dispatch_next() {
            Ok(period) => period,
            Err(e) => break Some(e),
        };

        // 4. Publish the advance; on reaching a fast-forward target,
        //    enter pausing so time does not overshoot the boundary.
        let next = dispatched.next();
        {
            let mut state = lock(&shared);
            state.next_period = next;
            if let Some(target) = fast_forward_target {
                if time_of(next, config.period_duration_ms) >= target {
                    state.fast_forward_target_ms = None;
                    state.pausing = true;
                    tracing::info!(target, period = dispatched.0, "fast-forward target reached");
                }
            }
            shared.advanced.notify_all();
        }

        // 5. Realtime pacing, skipped while fast-forwarding.
        if fast_forward_target.is_none() {
            if let Some(remaining) = period_duration.checked_sub(period_start.elapsed()) {
                thread::sleep(remaining);
            }
        }
    };

    if let Some(e) = cause.as_ref() {
        tracing::error!(error = %e, "run stopped abnormally");
    }
    let mut state = lock(&shared);
    state.stopped = true;
    state.stop_cause = cause;
    shared.advanced.notify_all();
    drop(state);
    core
}

/// Handle all pending control requests. A desync in a recorded stream
/// is run-fatal and returned as such; everything else replies
/// best-effort (the caller may have dropped its receiver).
fn drain_ctl(core: &mut ClockCore, ctl_rx: &Receiver<ClockCtl>) -> Result<(), RunError> {
    while let Ok(ctl) = ctl_rx.try_recv() {
        match ctl {
            ClockCtl::Schedule { task, reply } => {
                let period = core.scheduler_mut().schedule(task);
                let _ = reply.send(period);
            }
            ClockCtl::FeedRecorded { tasks, reply } => {
                for task in tasks {
                    if let Err(desync) = core.scheduler_mut().insert_recorded(task) {
                        let _ = reply.send(Err(desync.clone()));
                        return Err(RunError::Desync(desync));
                    }
                }
                let _ = reply.send(Ok(()));
            }
            ClockCtl::RemainingTasks { reply } => {
                let _ = reply.send(core.remaining_tasks());
            }
            ClockCtl::Metrics { reply } => {
                let _ = reply.send(core.metrics());
            }
        }
    }
    Ok(())
}

fn lock(shared: &SharedView) -> std::sync::MutexGuard<'_, crate::clock::SharedState> {
    match shared.state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
