//! Offline/replay connector: a command source with no remote peers.

use cadence_core::{ClockError, LockstepPeriod, Simulation, Task};
use cadence_engine::{ClockConfig, ConfigError, GameClock, SaveHook};

use crate::Connector;

/// Connector for single-player, AI-only, and replay runs.
///
/// The command source is a pre-loaded, already-ordered sequence fed in
/// via [`feed_source`](Connector::feed_source) (or empty for a fresh
/// run); period completeness never waits on a peer, so the clock is
/// free to advance as soon as a period's local tasks are in.
///
/// Tooling constructs it pausing so tasks can be staged before any
/// time advances, mirroring the split/continue workflow.
pub struct OfflineConnector {
    clock: GameClock,
}

impl OfflineConnector {
    /// Spawn the clock for an offline run.
    pub fn start(
        config: ClockConfig,
        simulation: Box<dyn Simulation>,
        save_hook: Option<SaveHook>,
    ) -> Result<Self, ConfigError> {
        let clock = GameClock::start(config, simulation, save_hook)?;
        Ok(Self { clock })
    }

    /// Spawn the clock in the pausing state, for tooling that stages
    /// tasks before releasing time.
    pub fn start_pausing(
        config: ClockConfig,
        simulation: Box<dyn Simulation>,
        save_hook: Option<SaveHook>,
    ) -> Result<Self, ConfigError> {
        let config = ClockConfig {
            start_pausing: true,
            ..config
        };
        Self::start(config, simulation, save_hook)
    }

    /// Consume the connector and hand back the clock.
    pub fn into_clock(self) -> GameClock {
        self.clock
    }
}

impl Connector for OfflineConnector {
    fn clock(&self) -> &GameClock {
        &self.clock
    }

    fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    fn schedule_task_at(&self, task: Task) -> Result<LockstepPeriod, ClockError> {
        self.clock.schedule_task_at(task)
    }

    fn feed_source(&self, tasks: Vec<Task>) -> Result<(), ClockError> {
        tracing::debug!(tasks = tasks.len(), "feeding recorded command stream");
        self.clock.feed_recorded(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::{PlayerId, TaskPayload};
    use cadence_test_utils::RecordingSimulation;

    fn custom(period: u64, issuer: u8) -> Task {
        Task {
            target_period: LockstepPeriod(period),
            issuer: PlayerId(issuer),
            payload: TaskPayload::Custom { kind: 1, data: vec![] },
        }
    }

    fn config() -> ClockConfig {
        ClockConfig {
            period_duration_ms: 5,
            ..ClockConfig::default()
        }
    }

    #[test]
    fn offline_connector_replays_fed_stream() {
        let (sim, observer) = RecordingSimulation::new();
        let mut conn =
            OfflineConnector::start_pausing(config(), Box::new(sim), None).unwrap();

        conn.feed_source(vec![custom(2, 1), custom(4, 2)]).unwrap();
        conn.schedule_task_at(custom(4, 1)).unwrap();

        conn.clock().set_pausing(false);
        conn.clock().fast_forward_to(6 * 5).unwrap();
        conn.clock_mut().stop().unwrap();

        let dispatched = observer.dispatched();
        assert_eq!(dispatched.len(), 3);
        assert_eq!(dispatched[0].0, LockstepPeriod(2));
        assert_eq!(dispatched[1].1.issuer, PlayerId(1));
        assert_eq!(dispatched[2].1.issuer, PlayerId(2));
    }

    #[test]
    fn start_pausing_does_not_advance_until_released() {
        let (sim, _observer) = RecordingSimulation::new();
        let mut conn =
            OfflineConnector::start_pausing(config(), Box::new(sim), None).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(40));
        assert_eq!(conn.clock().current_time_ms(), 0);
        conn.clock_mut().stop().unwrap();
    }
}
