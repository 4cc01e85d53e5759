//! Test utilities and mock simulations for Cadence development.
//!
//! Provides [`RecordingSimulation`], a deterministic [`Simulation`]
//! that logs every dispatch and folds it into a running state hash,
//! plus a seeded random task-stream generator for determinism tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cadence_core::hash::Fnv1a;
use cadence_core::{
    LockstepPeriod, PlayerId, Simulation, SimulationError, Task, TaskPayload,
};

/// Shared view into a [`RecordingSimulation`], readable from the test
/// thread while the simulation itself lives on the clock thread.
#[derive(Debug, Default)]
pub struct SimObserver {
    log: Mutex<Vec<(LockstepPeriod, Task)>>,
    state_hash: AtomicU64,
    advanced_periods: AtomicU64,
}

impl SimObserver {
    /// All dispatched `(period, task)` pairs in dispatch order.
    pub fn dispatched(&self) -> Vec<(LockstepPeriod, Task)> {
        self.log.lock().unwrap().clone()
    }

    pub fn dispatched_len(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    /// How many times the dispatched task stream contains `payload`.
    pub fn count_payload(&self, payload: &TaskPayload) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, t)| &t.payload == payload)
            .count()
    }

    /// The hash as of the last executed event.
    pub fn state_hash(&self) -> u64 {
        self.state_hash.load(Ordering::Acquire)
    }

    /// Number of `advance_period` calls observed.
    pub fn advanced_periods(&self) -> u64 {
        self.advanced_periods.load(Ordering::Acquire)
    }
}

/// Deterministic mock simulation.
///
/// Every executed task and advanced period is folded into an FNV-1a
/// state hash, so two runs fed the same stream in the same order
/// report identical hashes, and any reordering or omission changes
/// the result. Optionally fails on a chosen custom task kind to
/// exercise run-fatal error paths.
pub struct RecordingSimulation {
    observer: Arc<SimObserver>,
    hash: Fnv1a,
    fail_on_kind: Option<u32>,
}

impl RecordingSimulation {
    pub fn new() -> (Self, Arc<SimObserver>) {
        let observer = Arc::new(SimObserver::default());
        let sim = Self {
            observer: Arc::clone(&observer),
            hash: Fnv1a::new(),
            fail_on_kind: None,
        };
        (sim, observer)
    }

    /// Rebuild a simulation from snapshot bytes produced by
    /// [`Simulation::write_snapshot`], continuing the hash chain where
    /// the snapshot left it. The dispatch log starts empty.
    pub fn from_snapshot(bytes: &[u8]) -> io::Result<(Self, Arc<SimObserver>)> {
        let raw: [u8; 8] = bytes.try_into().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("snapshot must be 8 bytes, got {}", bytes.len()),
            )
        })?;
        let state = u64::from_le_bytes(raw);
        let observer = Arc::new(SimObserver::default());
        observer.state_hash.store(state, Ordering::Release);
        let sim = Self {
            observer: Arc::clone(&observer),
            hash: Fnv1a::resume(state),
            fail_on_kind: None,
        };
        Ok((sim, observer))
    }

    /// Fail `execute_task` for `Custom` payloads of the given kind.
    pub fn fail_on_kind(mut self, kind: u32) -> Self {
        self.fail_on_kind = Some(kind);
        self
    }

    fn fold_task(&mut self, period: LockstepPeriod, task: &Task) {
        // Saves observe state without mutating it, so a run with an
        // injected quick save hashes identically to one without.
        let TaskPayload::Custom { kind, data } = &task.payload else {
            return;
        };
        self.hash.write_u64(period.0);
        self.hash.write_u8(task.issuer.0);
        self.hash.write_u32(*kind);
        self.hash.write_bytes(data);
    }
}

impl Simulation for RecordingSimulation {
    fn execute_task(
        &mut self,
        period: LockstepPeriod,
        task: &Task,
    ) -> Result<(), SimulationError> {
        if let TaskPayload::Custom { kind, .. } = &task.payload {
            if Some(*kind) == self.fail_on_kind {
                return Err(SimulationError {
                    period,
                    reason: format!("injected failure for task kind {kind}"),
                });
            }
        }
        self.fold_task(period, task);
        self.observer
            .log
            .lock()
            .unwrap()
            .push((period, task.clone()));
        self.observer
            .state_hash
            .store(self.hash.finish(), Ordering::Release);
        Ok(())
    }

    fn advance_period(&mut self, period: LockstepPeriod) {
        self.hash.write_u64(period.0 ^ 0x9E37_79B9_7F4A_7C15);
        self.observer
            .state_hash
            .store(self.hash.finish(), Ordering::Release);
        self.observer
            .advanced_periods
            .fetch_add(1, Ordering::AcqRel);
    }

    fn state_hash(&self) -> u64 {
        self.hash.finish()
    }

    fn write_snapshot(&self, w: &mut dyn io::Write) -> io::Result<()> {
        w.write_all(&self.hash.finish().to_le_bytes())
    }
}

/// Generate a seeded, reproducible stream of custom tasks.
///
/// Targets are spread over `[0, max_period)` and issuers over
/// `[1, players]`. The same seed always yields the same stream.
pub fn seeded_task_stream(seed: u64, count: usize, max_period: u64, players: u8) -> Vec<Task> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let data_len = rng.gen_range(0..8);
            Task {
                target_period: LockstepPeriod(rng.gen_range(0..max_period)),
                issuer: PlayerId(rng.gen_range(1..=players)),
                payload: TaskPayload::Custom {
                    kind: rng.gen_range(0..4),
                    data: (0..data_len).map(|_| rng.gen()).collect(),
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stream_same_hash() {
        let tasks = seeded_task_stream(7, 32, 100, 4);
        let (mut a, _) = RecordingSimulation::new();
        let (mut b, _) = RecordingSimulation::new();
        for sim in [&mut a, &mut b] {
            for task in &tasks {
                sim.execute_task(task.target_period, task).unwrap();
            }
            sim.advance_period(LockstepPeriod(100));
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn reordered_stream_changes_hash() {
        let tasks = seeded_task_stream(7, 8, 100, 4);
        let (mut a, _) = RecordingSimulation::new();
        let (mut b, _) = RecordingSimulation::new();
        for task in &tasks {
            a.execute_task(task.target_period, task).unwrap();
        }
        for task in tasks.iter().rev() {
            b.execute_task(task.target_period, task).unwrap();
        }
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn seeded_stream_is_reproducible() {
        assert_eq!(
            seeded_task_stream(42, 16, 50, 3),
            seeded_task_stream(42, 16, 50, 3)
        );
        assert_ne!(
            seeded_task_stream(42, 16, 50, 3),
            seeded_task_stream(43, 16, 50, 3)
        );
    }

    #[test]
    fn quick_save_does_not_perturb_the_hash() {
        let tasks = seeded_task_stream(5, 8, 100, 4);
        let (mut plain, _) = RecordingSimulation::new();
        let (mut saved, _) = RecordingSimulation::new();
        for task in &tasks {
            plain.execute_task(task.target_period, task).unwrap();
            saved.execute_task(task.target_period, task).unwrap();
        }
        let save = Task {
            target_period: LockstepPeriod(50),
            issuer: PlayerId(0),
            payload: TaskPayload::QuickSave,
        };
        saved.execute_task(LockstepPeriod(50), &save).unwrap();
        assert_eq!(plain.state_hash(), saved.state_hash());
    }

    #[test]
    fn snapshot_restore_continues_the_hash_chain() {
        let tasks = seeded_task_stream(11, 16, 100, 4);
        let (mut full, _) = RecordingSimulation::new();
        let (mut front, _) = RecordingSimulation::new();
        for task in &tasks[..8] {
            full.execute_task(task.target_period, task).unwrap();
            front.execute_task(task.target_period, task).unwrap();
        }
        let mut snapshot = Vec::new();
        front.write_snapshot(&mut snapshot).unwrap();
        let (mut back, _) = RecordingSimulation::from_snapshot(&snapshot).unwrap();
        for task in &tasks[8..] {
            full.execute_task(task.target_period, task).unwrap();
            back.execute_task(task.target_period, task).unwrap();
        }
        assert_eq!(full.state_hash(), back.state_hash());
    }

    #[test]
    fn fail_on_kind_errors() {
        let (mut sim, _) = RecordingSimulation::new();
        sim = sim.fail_on_kind(3);
        let task = Task {
            target_period: LockstepPeriod(1),
            issuer: PlayerId(1),
            payload: TaskPayload::Custom { kind: 3, data: vec![] },
        };
        assert!(sim.execute_task(LockstepPeriod(1), &task).is_err());
    }
}
