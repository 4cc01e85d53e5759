//! End-to-end runs through the runner, lifecycle, and clock together.

use std::sync::{Arc, Mutex};

use cadence_core::player::{roster_with_ai, AiDifficulty};
use cadence_core::{LockstepPeriod, MapId, PlayerId, RunError, Task, TaskPayload};
use cadence_engine::ClockConfig;
use cadence_game::{GameRunner, LifecycleEvent, LifecycleState};
use cadence_replay::ReplayHeader;
use cadence_test_utils::RecordingSimulation;

fn header(start_period: u64) -> ReplayHeader {
    ReplayHeader {
        start_period: LockstepPeriod(start_period),
        random_seed: 0xC0FFEE,
        map_name: "highlands".into(),
        map_id: MapId([9; 16]),
        local_player_id: PlayerId(1),
        player_settings: roster_with_ai(&[(0, AiDifficulty::VeryHard)]),
    }
}

fn quick_config() -> ClockConfig {
    ClockConfig {
        period_duration_ms: 5,
        ..ClockConfig::default()
    }
}

fn custom(period: u64, issuer: u8, kind: u32) -> Task {
    Task {
        target_period: LockstepPeriod(period),
        issuer: PlayerId(issuer),
        payload: TaskPayload::Custom { kind, data: vec![] },
    }
}

/// A single-AI run fast-forwarded across 90 minutes of simulation
/// time, with one command landing at the final period.
#[test]
fn ninety_minute_fast_forward_run() {
    const TARGET_MS: u64 = 90 * 60 * 1000;
    let config = ClockConfig::default();
    let final_period = TARGET_MS / config.period_duration_ms;

    let (sim, observer) = RecordingSimulation::new();
    let mut runner =
        GameRunner::launch(header(0), config, Box::new(sim), Vec::new(), None, None).unwrap();

    // Started is reached before any simulation time advances.
    assert_eq!(runner.lifecycle().state(), LifecycleState::Started);
    assert_eq!(runner.clock().current_time_ms(), 0);

    runner.schedule_task_at(custom(final_period, 2, 1)).unwrap();
    runner.resume();
    runner.clock().fast_forward_to(TARGET_MS).unwrap();

    assert_eq!(runner.clock().current_time_ms(), TARGET_MS);
    assert_eq!(runner.lifecycle().state(), LifecycleState::Started);

    let dispatched = observer.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].0, LockstepPeriod(final_period));

    let metrics = runner.stop().unwrap();
    assert_eq!(metrics.dispatched_periods, final_period + 1);
    assert_eq!(runner.lifecycle().state(), LifecycleState::Stopped);
    assert_eq!(runner.lifecycle().stop_cause(), None);
}

/// A listener handed to `launch` is registered before the `Started`
/// event fires, so it observes the full sequence and receives a
/// working handle to the run.
#[test]
fn launch_listener_observes_started_then_stopped() {
    let (sim, _observer) = RecordingSimulation::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let mut runner = GameRunner::launch(
        header(0),
        quick_config(),
        Box::new(sim),
        Vec::new(),
        None,
        Some(Box::new(move |event: &LifecycleEvent| {
            sink.lock().unwrap().push(event.clone())
        })),
    )
    .unwrap();

    runner.resume();
    runner.clock().fast_forward_to(20 * 5).unwrap();
    runner.stop().unwrap();
    runner.lifecycle().wait_for_stopped();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 2);
    let run = match &events[0] {
        LifecycleEvent::Started { run } => run.clone(),
        other => panic!("expected Started first, got {other:?}"),
    };
    assert_eq!(run.start_period(), LockstepPeriod(0));
    assert!(run.is_stopped());
    assert_eq!(run.await_stopped(), None);
    assert!(matches!(&events[1], LifecycleEvent::Stopped { cause: None }));
}

#[test]
fn simulation_failure_reaches_the_lifecycle_as_a_cause() {
    let (sim, _observer) = RecordingSimulation::new();
    let sim = sim.fail_on_kind(7);
    let runner = GameRunner::launch(
        header(0),
        quick_config(),
        Box::new(sim),
        vec![custom(4, 1, 7)],
        None,
        None,
    )
    .unwrap();

    runner.resume();
    // The run dies at period 4, so the fast-forward cannot complete.
    assert!(runner.clock().fast_forward_to(10 * 5).is_err());

    let cause = runner.lifecycle().wait_for_stopped();
    match cause {
        Some(RunError::Simulation(e)) => assert_eq!(e.period, LockstepPeriod(4)),
        other => panic!("expected simulation cause, got {other:?}"),
    }
    assert_eq!(runner.lifecycle().state(), LifecycleState::Stopped);
}

#[test]
fn recorded_task_behind_the_dispatch_horizon_stops_the_run() {
    let (sim, _observer) = RecordingSimulation::new();
    let runner =
        GameRunner::launch(header(0), quick_config(), Box::new(sim), Vec::new(), None, None).unwrap();

    runner.resume();
    runner.clock().fast_forward_to(10 * 5).unwrap();
    // The horizon is now at period 10; period 3 can never dispatch.
    let _ = runner.feed_recorded(vec![custom(3, 2, 0)]);

    let cause = runner.lifecycle().wait_for_stopped();
    assert!(matches!(cause, Some(RunError::Desync(_))));
}

#[test]
fn recorded_stream_before_the_start_period_fails_the_launch() {
    let (sim, _observer) = RecordingSimulation::new();
    let result = GameRunner::launch(
        header(100),
        quick_config(),
        Box::new(sim),
        vec![custom(50, 1, 0)],
        None,
        None,
    );
    assert!(result.is_err());
}

#[test]
fn staged_stream_dispatches_in_issuer_order_within_a_period() {
    let (sim, observer) = RecordingSimulation::new();
    let mut runner = GameRunner::launch(
        header(0),
        quick_config(),
        Box::new(sim),
        vec![custom(6, 3, 0), custom(6, 1, 1), custom(2, 2, 2)],
        None,
        None,
    )
    .unwrap();

    runner.resume();
    runner.clock().fast_forward_to(8 * 5).unwrap();
    runner.stop().unwrap();

    let issuers: Vec<(u64, u8)> = observer
        .dispatched()
        .iter()
        .map(|(period, task)| (period.0, task.issuer.0))
        .collect();
    assert_eq!(issuers, vec![(2, 2), (6, 1), (6, 3)]);
}
