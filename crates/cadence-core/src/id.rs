//! Strongly-typed identifiers for periods, players, and maps.

use std::fmt;

/// Index of one fixed-duration lockstep period.
///
/// The clock advances in whole periods; wall-clock simulation time is
/// `index * period_duration_ms`. For a given run the counter is
/// monotonically non-decreasing: a period's tasks are never dispatched
/// out of index order and never re-dispatched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LockstepPeriod(pub u64);

impl LockstepPeriod {
    /// The period immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Simulation time at this period boundary, given the period duration.
    pub fn time_ms(self, period_duration_ms: u64) -> u64 {
        self.0 * period_duration_ms
    }

    /// The period whose boundary first reaches `time_ms`, rounding up.
    pub fn containing(time_ms: u64, period_duration_ms: u64) -> Self {
        Self(time_ms.div_ceil(period_duration_ms))
    }
}

impl fmt::Display for LockstepPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for LockstepPeriod {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one player slot in the fixed roster.
///
/// `PlayerId(0)` doubles as the issuer of system tasks (quick saves and
/// other meta-actions scheduled by the run itself rather than a player).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Issuer id used for system-scheduled tasks.
    pub const SYSTEM: PlayerId = PlayerId(0);
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PlayerId {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

/// Fixed-size content identifier of a map or savegame.
///
/// Two runs can only be compared for determinism when their map ids
/// match; the replay header records it for exactly that check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MapId(pub [u8; 16]);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl From<[u8; 16]> for MapId {
    fn from(v: [u8; 16]) -> Self {
        Self(v)
    }
}
