//! Launching, supervising, and stopping a game run.
//!
//! [`GameRunner`] owns the connector (and through it the clock), the
//! [`GameLifecycle`], and the optional savegame repository, and wires
//! the three together: it launches the clock pausing so the lifecycle
//! reaches `Started` before any simulation time advances, and a monitor
//! thread forwards a run-fatal clock stop to the lifecycle so listeners
//! learn the cause without polling.

use std::error::Error;
use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cadence_core::{ClockError, LockstepPeriod, Simulation, Task};
use cadence_engine::{ClockConfig, ConfigError, GameClock, PeriodMetrics};
use cadence_net::{Connector, OfflineConnector};
use cadence_replay::{ReplayError, ReplayHeader, ReplayReader};

use crate::host::SavegameHost;
use crate::lifecycle::{GameLifecycle, LifecycleError, LifecycleEvent, RunHandle};
use crate::savegame::SavegameRepository;

/// Listener accepted by [`GameRunner::launch`], registered before the
/// `Started` event fires so it observes the full event sequence.
pub type RunListener = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

/// Errors surfaced while launching a run, before any time has advanced.
#[derive(Debug)]
pub enum LaunchError {
    /// The clock configuration was rejected or the clock thread could
    /// not be spawned.
    Config(ConfigError),
    /// The staged command stream was rejected by the clock.
    Clock(ClockError),
    /// The replay stream could not be read.
    Replay(ReplayError),
    /// The lifecycle was not in a launchable state.
    Lifecycle(LifecycleError),
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "launch failed: {e}"),
            Self::Clock(e) => write!(f, "launch failed: {e}"),
            Self::Replay(e) => write!(f, "launch failed: {e}"),
            Self::Lifecycle(e) => write!(f, "launch failed: {e}"),
        }
    }
}

impl Error for LaunchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Clock(e) => Some(e),
            Self::Replay(e) => Some(e),
            Self::Lifecycle(e) => Some(e),
        }
    }
}

impl From<ConfigError> for LaunchError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ClockError> for LaunchError {
    fn from(e: ClockError) -> Self {
        Self::Clock(e)
    }
}

impl From<ReplayError> for LaunchError {
    fn from(e: ReplayError) -> Self {
        Self::Replay(e)
    }
}

impl From<LifecycleError> for LaunchError {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

/// One supervised game run.
///
/// Launch leaves the clock pausing with the recorded stream staged;
/// call [`resume`](Self::resume) to release simulation time, and
/// [`stop`](Self::stop) to wind the run down and drive the lifecycle
/// to `Stopped`.
pub struct GameRunner {
    connector: OfflineConnector,
    lifecycle: Arc<GameLifecycle>,
    header: ReplayHeader,
    repository: Option<Arc<dyn SavegameRepository>>,
    monitor: Option<JoinHandle<()>>,
}

impl GameRunner {
    /// Launch a run from a header and a pre-loaded command stream.
    ///
    /// `config.start_period` is overridden by the header's start
    /// period and the clock starts pausing regardless of
    /// `config.start_pausing`; the lifecycle reaches `Started` before
    /// any simulation time advances. `listener` is registered before
    /// the `Started` event fires, so it observes every notification of
    /// the run.
    pub fn launch(
        header: ReplayHeader,
        config: ClockConfig,
        simulation: Box<dyn Simulation>,
        recorded: Vec<Task>,
        repository: Option<Arc<dyn SavegameRepository>>,
        listener: Option<RunListener>,
    ) -> Result<Self, LaunchError> {
        let lifecycle = Arc::new(GameLifecycle::new());
        if let Some(listener) = listener {
            lifecycle.set_listener(listener);
        }
        lifecycle.request_start()?;
        tracing::info!(
            map = %header.map_name,
            start_period = header.start_period.0,
            staged_tasks = recorded.len(),
            "launching run"
        );

        let save_hook = repository.as_ref().map(|repo| {
            SavegameHost::new(Arc::clone(repo), header.map_id, header.map_name.clone()).into_hook()
        });
        let config = ClockConfig {
            start_period: header.start_period,
            ..config
        };
        let connector = OfflineConnector::start_pausing(config, simulation, save_hook)?;
        connector.feed_source(recorded)?;

        let monitor = Self::spawn_monitor(&connector, Arc::clone(&lifecycle))?;
        let run = RunHandle::new(header.start_period, connector.clock().stop_watcher());
        lifecycle.mark_started(run)?;

        Ok(Self {
            connector,
            lifecycle,
            header,
            repository,
            monitor: Some(monitor),
        })
    }

    /// Launch by reading a full replay stream: header, then body.
    pub fn launch_from_replay<R: Read>(
        reader: R,
        config: ClockConfig,
        simulation: Box<dyn Simulation>,
        repository: Option<Arc<dyn SavegameRepository>>,
        listener: Option<RunListener>,
    ) -> Result<Self, LaunchError> {
        let mut reader = ReplayReader::open(reader)?;
        let recorded = reader.read_all_tasks()?;
        let header = reader.header().clone();
        Self::launch(header, config, simulation, recorded, repository, listener)
    }

    /// Forwards a clock stop to the lifecycle, so run-fatal conditions
    /// reach listeners even when nobody calls [`stop`](Self::stop).
    fn spawn_monitor(
        connector: &OfflineConnector,
        lifecycle: Arc<GameLifecycle>,
    ) -> Result<JoinHandle<()>, LaunchError> {
        let watcher = connector.clock().stop_watcher();
        thread::Builder::new()
            .name("cadence-lifecycle".into())
            .spawn(move || {
                let cause = watcher.wait();
                if let Some(cause) = &cause {
                    tracing::warn!(%cause, "run stopped abnormally");
                }
                lifecycle.request_stop();
                lifecycle.mark_stopped(cause);
            })
            .map_err(|e| {
                LaunchError::Config(ConfigError::ThreadSpawnFailed {
                    reason: e.to_string(),
                })
            })
    }

    /// The lifecycle of this run.
    pub fn lifecycle(&self) -> &Arc<GameLifecycle> {
        &self.lifecycle
    }

    /// The clock driving this run.
    pub fn clock(&self) -> &GameClock {
        self.connector.clock()
    }

    /// The header the run was launched from.
    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    /// The savegame repository, if one was attached at launch.
    pub fn repository(&self) -> Option<&Arc<dyn SavegameRepository>> {
        self.repository.as_ref()
    }

    /// Release simulation time.
    pub fn resume(&self) {
        self.connector.clock().set_pausing(false);
    }

    /// Request a pause at the next period boundary.
    pub fn pause(&self) {
        self.connector.clock().set_pausing(true);
    }

    /// Inject a locally issued task, returning the period it was
    /// actually scheduled for.
    pub fn schedule_task_at(&self, task: Task) -> Result<LockstepPeriod, ClockError> {
        self.connector.schedule_task_at(task)
    }

    /// Feed further tasks from the run's command source. A task behind
    /// the dispatch horizon is a protocol violation fatal to the run.
    pub fn feed_recorded(&self, tasks: Vec<Task>) -> Result<(), ClockError> {
        self.connector.feed_source(tasks)
    }

    /// Stop the run, recover the clock core, and drive the lifecycle
    /// to `Stopped`. Returns the final dispatch metrics.
    pub fn stop(&mut self) -> Result<PeriodMetrics, ClockError> {
        self.lifecycle.request_stop();
        let metrics = self.connector.clock_mut().stop()?;
        if let Some(monitor) = self.monitor.take() {
            let _ = monitor.join();
        }
        Ok(metrics)
    }
}

impl fmt::Debug for GameRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameRunner")
            .field("map", &self.header.map_name)
            .field("lifecycle", &self.lifecycle)
            .field("clock", self.connector.clock())
            .finish()
    }
}
