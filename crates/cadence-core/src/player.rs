//! Player roster settings carried in the replay header.

use smallvec::SmallVec;
use std::fmt;

/// Maximum number of player slots in a match roster.
pub const MAX_PLAYERS: usize = 12;

/// AI difficulty tiers.
///
/// The discriminants are stable wire tags; see the replay codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AiDifficulty {
    /// Barely expands, never attacks.
    VeryEasy,
    /// Expands slowly, defends only.
    Easy,
    /// Expands and attacks opportunistically.
    Hard,
    /// Full economy and military pressure.
    VeryHard,
}

impl AiDifficulty {
    /// Stable wire tag for this difficulty.
    pub fn tag(self) -> u8 {
        match self {
            Self::VeryEasy => 1,
            Self::Easy => 2,
            Self::Hard => 3,
            Self::VeryHard => 4,
        }
    }

    /// Inverse of [`tag()`](Self::tag); `None` for unknown tags.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::VeryEasy),
            2 => Some(Self::Easy),
            3 => Some(Self::Hard),
            4 => Some(Self::VeryHard),
            _ => None,
        }
    }
}

impl fmt::Display for AiDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VeryEasy => "very-easy",
            Self::Easy => "easy",
            Self::Hard => "hard",
            Self::VeryHard => "very-hard",
        };
        write!(f, "{name}")
    }
}

/// Per-slot player configuration, immutable for the lifetime of a run.
///
/// An absent (closed) slot carries `is_ai == false` and no difficulty,
/// matching the sentinel encoding in the replay header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlayerSetting {
    /// Whether this slot is driven by an AI.
    pub is_ai: bool,
    /// AI difficulty; `None` for human players and absent slots.
    pub difficulty: Option<AiDifficulty>,
}

impl PlayerSetting {
    /// An AI-controlled slot at the given difficulty.
    pub fn ai(difficulty: AiDifficulty) -> Self {
        Self {
            is_ai: true,
            difficulty: Some(difficulty),
        }
    }

    /// A human-controlled slot.
    pub fn human() -> Self {
        Self {
            is_ai: false,
            difficulty: None,
        }
    }

    /// An absent (closed) slot.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// The ordered, fixed-size match roster.
///
/// Inline storage for the full [`MAX_PLAYERS`] slots; rosters never
/// grow past that bound.
pub type PlayerSettings = SmallVec<[PlayerSetting; MAX_PLAYERS]>;

/// A full roster with every slot absent except the given AI slots.
///
/// Convenience for tests and tooling that mirror the common
/// "one or two AIs on an otherwise empty 12-slot map" setup.
pub fn roster_with_ai(slots: &[(usize, AiDifficulty)]) -> PlayerSettings {
    let mut roster: PlayerSettings = (0..MAX_PLAYERS).map(|_| PlayerSetting::absent()).collect();
    for &(slot, difficulty) in slots {
        roster[slot] = PlayerSetting::ai(difficulty);
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_tags_round_trip() {
        for d in [
            AiDifficulty::VeryEasy,
            AiDifficulty::Easy,
            AiDifficulty::Hard,
            AiDifficulty::VeryHard,
        ] {
            assert_eq!(AiDifficulty::from_tag(d.tag()), Some(d));
        }
        assert_eq!(AiDifficulty::from_tag(0), None);
        assert_eq!(AiDifficulty::from_tag(99), None);
    }

    #[test]
    fn roster_with_ai_fills_remaining_slots_with_absent() {
        let roster = roster_with_ai(&[(0, AiDifficulty::VeryHard)]);
        assert_eq!(roster.len(), MAX_PLAYERS);
        assert_eq!(roster[0], PlayerSetting::ai(AiDifficulty::VeryHard));
        assert!(roster[1..].iter().all(|s| *s == PlayerSetting::absent()));
    }
}
