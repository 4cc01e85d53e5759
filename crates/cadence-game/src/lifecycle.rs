//! Game lifecycle state machine.
//!
//! A run moves through five strictly monotonic states:
//!
//! ```text
//! Created -> Starting -> Started -> Stopping -> Stopped
//! ```
//!
//! States are never revisited and `Stopped` is terminal; restarting
//! means constructing a new run. Transitions may be requested from any
//! thread. A stop can originate from the controller or from a run-fatal
//! condition inside the clock, so `request_stop` and `mark_stopped` are
//! idempotent and may skip intermediate states, while the forward
//! transitions (`request_start`, `mark_started`) reject out-of-order
//! calls as logic errors.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use cadence_core::{LockstepPeriod, RunError};
use cadence_engine::StopWatcher;

/// The five lifecycle states, ordered by progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    /// Constructed, simulation not yet loaded.
    Created,
    /// Loading the simulation and staging the command stream.
    Starting,
    /// Running; the clock may advance time.
    Started,
    /// Stop requested; the clock is winding down.
    Stopping,
    /// Terminal. The run cannot be restarted.
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Started => "started",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        write!(f, "{name}")
    }
}

/// A forward transition was requested out of order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// The requested transition is not reachable from the current state.
    InvalidTransition {
        /// State the lifecycle was in.
        from: LifecycleState,
        /// State the caller tried to enter.
        to: LifecycleState,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTransition { from, to } => {
                write!(f, "invalid lifecycle transition {from} -> {to}")
            }
        }
    }
}

impl Error for LifecycleError {}

/// Observation handle for a started run, delivered with the `Started`
/// event so the listener can follow the run it was told about.
///
/// Cheap to clone; holds no reference back to the clock handle, so the
/// listener may outlive the run.
#[derive(Clone)]
pub struct RunHandle {
    start_period: LockstepPeriod,
    watcher: StopWatcher,
}

impl RunHandle {
    /// Bundle the run's start period with a detached stop watcher.
    pub fn new(start_period: LockstepPeriod, watcher: StopWatcher) -> Self {
        Self {
            start_period,
            watcher,
        }
    }

    /// The first period the run dispatches.
    pub fn start_period(&self) -> LockstepPeriod {
        self.start_period
    }

    /// Whether the run's clock loop has already exited.
    pub fn is_stopped(&self) -> bool {
        self.watcher.is_stopped()
    }

    /// Block until the run's clock loop exits, returning the abnormal
    /// stop cause if there was one.
    pub fn await_stopped(&self) -> Option<RunError> {
        self.watcher.wait()
    }
}

impl fmt::Debug for RunHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHandle")
            .field("start_period", &self.start_period)
            .field("stopped", &self.watcher.is_stopped())
            .finish()
    }
}

/// Notification delivered to the registered listener.
#[derive(Clone, Debug)]
pub enum LifecycleEvent {
    /// The run reached `Started`; no simulation time has advanced yet.
    Started {
        /// Observation handle for the run that just started.
        run: RunHandle,
    },
    /// The run reached `Stopped`. `cause` is `None` for a requested
    /// stop and carries the run-fatal error otherwise.
    Stopped {
        /// Why the run stopped, if it stopped abnormally.
        cause: Option<RunError>,
    },
}

type Listener = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

struct Inner {
    state: LifecycleState,
    cause: Option<RunError>,
    listener: Option<Listener>,
}

/// Shared, thread-safe lifecycle of one game run.
///
/// Observers either poll [`state`](Self::state), block on
/// [`wait_until`](Self::wait_until), or register a listener that is
/// notified on `Started` and `Stopped`. The listener runs outside the
/// internal lock, so it may call back into the lifecycle.
pub struct GameLifecycle {
    inner: Mutex<Inner>,
    changed: Condvar,
}

impl GameLifecycle {
    /// A fresh lifecycle in the `Created` state.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: LifecycleState::Created,
                cause: None,
                listener: None,
            }),
            changed: Condvar::new(),
        }
    }

    /// The current state.
    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    /// The stop cause, once `Stopped` is reached; `None` before that
    /// and for runs that stopped on request.
    pub fn stop_cause(&self) -> Option<RunError> {
        self.lock().cause.clone()
    }

    /// Register the listener notified on `Started` and `Stopped`.
    /// Replaces any previously registered listener.
    pub fn set_listener(&self, listener: impl Fn(&LifecycleEvent) + Send + Sync + 'static) {
        self.lock().listener = Some(Arc::new(listener));
    }

    /// `Created -> Starting`.
    pub fn request_start(&self) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state != LifecycleState::Created {
            return Err(LifecycleError::InvalidTransition {
                from: inner.state,
                to: LifecycleState::Starting,
            });
        }
        inner.state = LifecycleState::Starting;
        drop(inner);
        self.changed.notify_all();
        Ok(())
    }

    /// `Starting -> Started`. Fires the `Started` event carrying `run`.
    pub fn mark_started(&self, run: RunHandle) -> Result<(), LifecycleError> {
        let mut inner = self.lock();
        if inner.state != LifecycleState::Starting {
            return Err(LifecycleError::InvalidTransition {
                from: inner.state,
                to: LifecycleState::Started,
            });
        }
        inner.state = LifecycleState::Started;
        let listener = inner.listener.clone();
        drop(inner);
        self.changed.notify_all();
        if let Some(listener) = listener {
            listener(&LifecycleEvent::Started { run });
        }
        Ok(())
    }

    /// Move to `Stopping`. Idempotent: a no-op once the lifecycle is
    /// already `Stopping` or `Stopped`. Valid from any earlier state,
    /// since a run can be torn down before it ever started.
    pub fn request_stop(&self) {
        let mut inner = self.lock();
        if inner.state >= LifecycleState::Stopping {
            return;
        }
        inner.state = LifecycleState::Stopping;
        drop(inner);
        self.changed.notify_all();
    }

    /// Move to `Stopped`, recording `cause` and firing the `Stopped`
    /// event. Idempotent: later calls are no-ops and the first cause
    /// wins.
    pub fn mark_stopped(&self, cause: Option<RunError>) {
        let mut inner = self.lock();
        if inner.state == LifecycleState::Stopped {
            return;
        }
        inner.state = LifecycleState::Stopped;
        inner.cause = cause.clone();
        let listener = inner.listener.clone();
        drop(inner);
        self.changed.notify_all();
        if let Some(listener) = listener {
            listener(&LifecycleEvent::Stopped { cause });
        }
    }

    /// Block until the state has reached at least `target`, returning
    /// the state actually observed. Because states are totally ordered
    /// and `Stopped` is always reached eventually, this cannot wait
    /// past a run that skips ahead (e.g. a failed start jumping to
    /// `Stopped` satisfies a wait for `Started`).
    pub fn wait_until(&self, target: LifecycleState) -> LifecycleState {
        let mut inner = self.lock();
        while inner.state < target {
            inner = match self.changed.wait(inner) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
        inner.state
    }

    /// Block until `Stopped`, returning the stop cause.
    pub fn wait_for_stopped(&self) -> Option<RunError> {
        self.wait_until(LifecycleState::Stopped);
        self.lock().cause.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for GameLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GameLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("GameLifecycle")
            .field("state", &inner.state)
            .field("cause", &inner.cause)
            .finish()
    }
}
