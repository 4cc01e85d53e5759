//! Data types for replay persistence.

use cadence_core::{LockstepPeriod, MapId, PlayerId, PlayerSettings};

/// Everything needed to deterministically recreate a run from its
/// starting point.
///
/// Written once at replay-file creation, read once at load, immutable
/// in between. A continuation produced by the split flow resumes at
/// the period after its snapshot and carries the original roster
/// unchanged.
///
/// # Examples
///
/// ```
/// use cadence_core::{roster_with_ai, AiDifficulty, LockstepPeriod, MapId, PlayerId};
/// use cadence_replay::ReplayHeader;
///
/// let header = ReplayHeader {
///     start_period: LockstepPeriod(0),
///     random_seed: 42,
///     map_name: "river crossing".into(),
///     map_id: MapId([7; 16]),
///     local_player_id: PlayerId(0),
///     player_settings: roster_with_ai(&[(0, AiDifficulty::VeryHard)]),
/// };
///
/// assert_eq!(header.start_period, LockstepPeriod(0));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayHeader {
    /// Period the run starts dispatching at; 0 for a from-scratch run,
    /// the period after the snapshot for a continuation.
    pub start_period: LockstepPeriod,
    /// RNG seed for deterministic simulation.
    pub random_seed: u64,
    /// Display name of the map or savegame the run starts from.
    pub map_name: String,
    /// Content identifier of the map or savegame.
    pub map_id: MapId,
    /// The player slot this file was recorded from.
    pub local_player_id: PlayerId,
    /// The ordered, fixed-size match roster.
    pub player_settings: PlayerSettings,
}

// ── Payload type tag constants ──────────────────────────────────

/// Payload type tag for `TaskPayload::QuickSave`.
pub const PAYLOAD_QUICK_SAVE: u8 = 0;
/// Payload type tag for `TaskPayload::Custom`.
pub const PAYLOAD_CUSTOM: u8 = 1;
