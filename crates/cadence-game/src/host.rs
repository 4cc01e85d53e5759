//! Quick-save interception.
//!
//! Quick-save tasks dispatch to the simulation like any other task so a
//! replayed run observes the identical stream, but the snapshot write
//! itself is a host concern: the clock invokes its save hook at the
//! period boundary and [`SavegameHost`] routes the snapshot into a
//! [`SavegameRepository`] stamped with the run's map identity.

use std::sync::Arc;

use cadence_core::{LockstepPeriod, MapId, Simulation};
use cadence_engine::SaveHook;

use crate::savegame::{SavegameMeta, SavegameRepository};

/// Bridges the clock's quick-save hook to a savegame repository.
pub struct SavegameHost {
    repository: Arc<dyn SavegameRepository>,
    map_id: MapId,
    map_name: String,
}

impl SavegameHost {
    /// A host writing snapshots for the given map into `repository`.
    pub fn new(repository: Arc<dyn SavegameRepository>, map_id: MapId, map_name: String) -> Self {
        Self {
            repository,
            map_id,
            map_name,
        }
    }

    /// The hook to install on the clock. Runs on the clock thread with
    /// the simulation quiescent at the end of the saving period.
    pub fn into_hook(self) -> SaveHook {
        Box::new(move |period: LockstepPeriod, simulation: &dyn Simulation| {
            let mut snapshot = Vec::new();
            simulation.write_snapshot(&mut snapshot)?;
            let entry = self.repository.store(
                SavegameMeta {
                    period,
                    map_id: self.map_id,
                    map_name: self.map_name.clone(),
                },
                snapshot,
            )?;
            tracing::info!(period = period.0, id = %entry.id, "savegame written");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::savegame::MemoryRepository;
    use cadence_test_utils::RecordingSimulation;

    #[test]
    fn hook_stores_a_snapshot_with_the_run_identity() {
        let repository = Arc::new(MemoryRepository::new());
        let host = SavegameHost::new(
            Arc::clone(&repository) as Arc<dyn SavegameRepository>,
            MapId([3; 16]),
            "highlands".into(),
        );
        let mut hook = host.into_hook();

        let (sim, _observer) = RecordingSimulation::new();
        hook(LockstepPeriod(120), &sim).unwrap();

        let entries = repository.list();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].period, LockstepPeriod(120));
        assert_eq!(entries[0].map_id, MapId([3; 16]));
        assert_eq!(entries[0].map_name, "highlands");

        let snapshot = repository.load(&entries[0].id).unwrap();
        assert_eq!(snapshot, sim.state_hash().to_le_bytes().to_vec());
    }
}
