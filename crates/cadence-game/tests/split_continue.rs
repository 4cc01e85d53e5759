//! The split workflow: a savegame plus a continuation replay must be
//! exactly equivalent to the uncut run.

use std::sync::Arc;

use proptest::prelude::*;

use cadence_core::player::{roster_with_ai, AiDifficulty};
use cadence_core::{LockstepPeriod, MapId, PlayerId, Task, TaskPayload};
use cadence_engine::ClockConfig;
use cadence_game::{
    play_to_target_and_save, write_continuation_replay, GameRunner, MemoryRepository,
    SavegameRepository, SplitError,
};
use cadence_replay::{ReplayHeader, ReplayReader};
use cadence_test_utils::{seeded_task_stream, RecordingSimulation};

const PERIOD_MS: u64 = 5;
const SPLIT_PERIOD: u64 = 200;
const END_PERIOD: u64 = 450;

fn header() -> ReplayHeader {
    ReplayHeader {
        start_period: LockstepPeriod(0),
        random_seed: 0xDEAD_BEEF,
        map_name: "river-delta".into(),
        map_id: MapId([4; 16]),
        local_player_id: PlayerId(2),
        player_settings: roster_with_ai(&[(0, AiDifficulty::Hard), (1, AiDifficulty::Easy)]),
    }
}

fn config() -> ClockConfig {
    ClockConfig {
        period_duration_ms: PERIOD_MS,
        ..ClockConfig::default()
    }
}

fn stream() -> Vec<Task> {
    seeded_task_stream(424242, 60, 400, 4)
}

/// Runs the full stream uncut and returns the final state hash.
fn uncut_final_hash() -> u64 {
    let (sim, _observer) = RecordingSimulation::new();
    let mut runner =
        GameRunner::launch(header(), config(), Box::new(sim), stream(), None, None).unwrap();
    runner.resume();
    runner.clock().fast_forward_to(END_PERIOD * PERIOD_MS).unwrap();
    runner.stop().unwrap();
    runner.clock().core().unwrap().state_hash()
}

/// Splits the run at `split_period`, returning the savegame snapshot
/// and the continuation replay bytes.
fn split_run(split_period: u64) -> (Vec<u8>, Vec<u8>, LockstepPeriod) {
    let repository = Arc::new(MemoryRepository::new());
    let (sim, _observer) = RecordingSimulation::new();
    let mut runner = GameRunner::launch(
        header(),
        config(),
        Box::new(sim),
        stream(),
        Some(Arc::clone(&repository) as Arc<dyn SavegameRepository>),
        None,
    )
    .unwrap();

    let savegame = play_to_target_and_save(&runner, split_period * PERIOD_MS).unwrap();
    let mut replay = Vec::new();
    write_continuation_replay(&runner, &savegame, &mut replay).unwrap();
    runner.stop().unwrap();

    let snapshot = repository.load(&savegame.id).unwrap();
    (snapshot, replay, savegame.period)
}

/// Restores the snapshot, replays the continuation to `END_PERIOD`,
/// and returns the final state hash.
fn continuation_final_hash(snapshot: &[u8], replay: &[u8]) -> u64 {
    let (sim, _observer) = RecordingSimulation::from_snapshot(snapshot).unwrap();
    let mut runner =
        GameRunner::launch_from_replay(replay, config(), Box::new(sim), None, None).unwrap();
    runner.resume();
    runner.clock().fast_forward_to(END_PERIOD * PERIOD_MS).unwrap();
    runner.stop().unwrap();
    runner.clock().core().unwrap().state_hash()
}

#[test]
fn savegame_lands_at_the_split_period() {
    let (_, _, period) = split_run(SPLIT_PERIOD);
    assert_eq!(period, LockstepPeriod(SPLIT_PERIOD));
}

#[test]
fn continuation_replay_resumes_after_the_snapshot() {
    let (_, replay, _) = split_run(SPLIT_PERIOD);
    let reader = ReplayReader::open(replay.as_slice()).unwrap();
    let restored = reader.header();
    assert_eq!(restored.start_period, LockstepPeriod(SPLIT_PERIOD + 1));
    assert_eq!(restored.random_seed, header().random_seed);
    assert_eq!(restored.map_id, header().map_id);
    assert_eq!(restored.local_player_id, header().local_player_id);
    assert_eq!(restored.player_settings, header().player_settings);
}

#[test]
fn continuation_body_is_the_undispatched_tail_without_the_save() {
    let (_, replay, _) = split_run(SPLIT_PERIOD);
    let mut reader = ReplayReader::open(replay.as_slice()).unwrap();
    let tasks = reader.read_all_tasks().unwrap();

    let expected = stream()
        .iter()
        .filter(|t| t.target_period.0 > SPLIT_PERIOD)
        .count();
    assert_eq!(tasks.len(), expected);
    assert!(tasks.iter().all(|t| t.target_period.0 > SPLIT_PERIOD));
    assert!(tasks.iter().all(|t| t.payload != TaskPayload::QuickSave));
}

#[test]
fn split_and_continuation_match_the_uncut_run() {
    let full_hash = uncut_final_hash();
    let (snapshot, replay, _) = split_run(SPLIT_PERIOD);
    assert_eq!(continuation_final_hash(&snapshot, &replay), full_hash);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    // Three full runs per case, so keep the case count modest.
    #[test]
    fn split_at_any_period_matches_the_uncut_run(split_period in 1u64..440) {
        let full_hash = uncut_final_hash();
        let (snapshot, replay, period) = split_run(split_period);
        prop_assert_eq!(period, LockstepPeriod(split_period));
        prop_assert_eq!(continuation_final_hash(&snapshot, &replay), full_hash);
    }
}

/// A split target at or behind the clock cannot dispatch its quick
/// save, so the newest entry is a stale earlier savegame and the
/// split must refuse it instead of writing a gapped continuation.
#[test]
fn split_target_behind_the_clock_is_rejected_as_stale() {
    let repository = Arc::new(MemoryRepository::new());
    let (sim, _observer) = RecordingSimulation::new();
    let mut runner = GameRunner::launch(
        header(),
        config(),
        Box::new(sim),
        stream(),
        Some(Arc::clone(&repository) as Arc<dyn SavegameRepository>),
        None,
    )
    .unwrap();

    play_to_target_and_save(&runner, SPLIT_PERIOD * PERIOD_MS).unwrap();
    match play_to_target_and_save(&runner, (SPLIT_PERIOD / 2) * PERIOD_MS) {
        Err(SplitError::StaleSavegame { expected, .. }) => {
            assert_eq!(expected, LockstepPeriod(SPLIT_PERIOD / 2));
        }
        other => panic!("expected StaleSavegame, got {other:?}"),
    }
    runner.stop().unwrap();
}

#[test]
fn split_without_a_repository_is_rejected() {
    let (sim, _observer) = RecordingSimulation::new();
    let runner =
        GameRunner::launch(header(), config(), Box::new(sim), stream(), None, None).unwrap();
    match play_to_target_and_save(&runner, SPLIT_PERIOD * PERIOD_MS) {
        Err(SplitError::NoRepository) => {}
        other => panic!("expected NoRepository, got {other:?}"),
    }
}
