//! Savegame repository: where quick-save snapshots land.
//!
//! The repository is deliberately dumb storage. All timing decisions
//! live in the clock, and the snapshot bytes are opaque; the repository
//! only attaches identity (map, period) and a creation timestamp so the
//! split workflow can ask for the newest entry.

use std::io;
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexMap;

use cadence_core::{LockstepPeriod, MapId};

/// Identity attached to a snapshot at store time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavegameMeta {
    /// Period the snapshot captures the end of.
    pub period: LockstepPeriod,
    /// Content id of the map the run was played on.
    pub map_id: MapId,
    /// Display name of the map.
    pub map_name: String,
}

/// One stored savegame, as listed by a repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavegameEntry {
    /// Repository-assigned identifier, unique within the repository.
    pub id: String,
    /// Period the snapshot captures the end of. A continuation run
    /// resumes at the following period.
    pub period: LockstepPeriod,
    /// Content id of the map the run was played on.
    pub map_id: MapId,
    /// Display name of the map.
    pub map_name: String,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

/// Storage backend for savegame snapshots.
///
/// Implementations must be shareable across threads; the clock thread
/// stores through the quick-save hook while the controller lists and
/// loads.
pub trait SavegameRepository: Send + Sync {
    /// Persist a snapshot, returning the entry that now lists it.
    fn store(&self, meta: SavegameMeta, snapshot: Vec<u8>) -> io::Result<SavegameEntry>;

    /// Every stored entry, in storage order.
    fn list(&self) -> Vec<SavegameEntry>;

    /// Snapshot bytes for the given entry id.
    fn load(&self, id: &str) -> io::Result<Vec<u8>>;
}

/// The entry with the greatest creation timestamp, or `None` for an
/// empty repository. On a timestamp tie the entry listed first wins,
/// so the result is stable for a fixed listing order.
pub fn newest_savegame(repository: &dyn SavegameRepository) -> Option<SavegameEntry> {
    let mut newest: Option<SavegameEntry> = None;
    for entry in repository.list() {
        let newer = match &newest {
            None => true,
            Some(best) => entry.created_at_ms > best.created_at_ms,
        };
        if newer {
            newest = Some(entry);
        }
    }
    newest
}

struct MemoryInner {
    entries: IndexMap<String, (SavegameEntry, Vec<u8>)>,
    last_created_ms: u64,
}

/// In-memory repository for tests and tooling.
///
/// Preserves insertion order in [`list`](SavegameRepository::list) and
/// stamps entries with strictly increasing timestamps, so "newest"
/// is unambiguous even for stores within the same millisecond.
pub struct MemoryRepository {
    inner: Mutex<MemoryInner>,
}

impl MemoryRepository {
    /// An empty repository.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryInner {
                entries: IndexMap::new(),
                last_created_ms: 0,
            }),
        }
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the repository holds no entries.
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SavegameRepository for MemoryRepository {
    fn store(&self, meta: SavegameMeta, snapshot: Vec<u8>) -> io::Result<SavegameEntry> {
        let mut inner = self.lock();
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let created_at_ms = wall.max(inner.last_created_ms + 1);
        inner.last_created_ms = created_at_ms;

        let entry = SavegameEntry {
            id: format!("{}-{}", meta.map_name, created_at_ms),
            period: meta.period,
            map_id: meta.map_id,
            map_name: meta.map_name,
            created_at_ms,
        };
        inner
            .entries
            .insert(entry.id.clone(), (entry.clone(), snapshot));
        Ok(entry)
    }

    fn list(&self) -> Vec<SavegameEntry> {
        self.lock()
            .entries
            .values()
            .map(|(entry, _)| entry.clone())
            .collect()
    }

    fn load(&self, id: &str) -> io::Result<Vec<u8>> {
        self.lock()
            .entries
            .get(id)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no savegame with id {id}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(period: u64) -> SavegameMeta {
        SavegameMeta {
            period: LockstepPeriod(period),
            map_id: MapId([7; 16]),
            map_name: "river-delta".into(),
        }
    }

    #[test]
    fn store_then_load_round_trips_the_snapshot() {
        let repo = MemoryRepository::new();
        let entry = repo.store(meta(40), vec![1, 2, 3]).unwrap();
        assert_eq!(repo.load(&entry.id).unwrap(), vec![1, 2, 3]);
        assert_eq!(entry.period, LockstepPeriod(40));
        assert_eq!(entry.map_name, "river-delta");
    }

    #[test]
    fn load_unknown_id_is_not_found() {
        let repo = MemoryRepository::new();
        let err = repo.load("missing").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn list_preserves_storage_order() {
        let repo = MemoryRepository::new();
        for period in [10, 20, 30] {
            repo.store(meta(period), vec![]).unwrap();
        }
        let periods: Vec<u64> = repo.list().iter().map(|e| e.period.0).collect();
        assert_eq!(periods, vec![10, 20, 30]);
    }

    #[test]
    fn newest_savegame_picks_the_latest_store() {
        let repo = MemoryRepository::new();
        assert!(newest_savegame(&repo).is_none());
        repo.store(meta(10), vec![]).unwrap();
        let last = repo.store(meta(99), vec![]).unwrap();
        assert_eq!(newest_savegame(&repo), Some(last));
    }

    #[test]
    fn newest_savegame_tie_break_is_first_listed() {
        struct Tied;
        impl SavegameRepository for Tied {
            fn store(&self, _: SavegameMeta, _: Vec<u8>) -> io::Result<SavegameEntry> {
                unimplemented!()
            }
            fn list(&self) -> Vec<SavegameEntry> {
                [1u64, 2]
                    .into_iter()
                    .map(|period| SavegameEntry {
                        id: format!("s{period}"),
                        period: LockstepPeriod(period),
                        map_id: MapId::default(),
                        map_name: "tied".into(),
                        created_at_ms: 500,
                    })
                    .collect()
            }
            fn load(&self, _: &str) -> io::Result<Vec<u8>> {
                unimplemented!()
            }
        }
        let newest = newest_savegame(&Tied).unwrap();
        assert_eq!(newest.id, "s1");
    }
}
