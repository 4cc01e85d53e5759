//! Binary encode/decode for the replay format.
//!
//! All integers are little-endian. Strings and byte arrays are
//! length-prefixed with a `u32` length. The format is intentionally
//! simple — no compression, no alignment padding, no self-describing
//! schema.

use std::io::{Read, Write};

use cadence_core::{
    LockstepPeriod, MapId, PlayerId, PlayerSetting, PlayerSettings, Task, TaskPayload,
    MAX_PLAYERS,
};

use crate::error::ReplayError;
use crate::types::{ReplayHeader, PAYLOAD_CUSTOM, PAYLOAD_QUICK_SAVE};
use crate::{FORMAT_VERSION, MAGIC};

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), ReplayError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ReplayError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), ReplayError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

/// Write a length-prefixed byte array (u32 length + bytes).
pub fn write_length_prefixed_bytes(w: &mut dyn Write, b: &[u8]) -> Result<(), ReplayError> {
    write_u32_le(w, b.len() as u32)?;
    w.write_all(b)?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, ReplayError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ReplayError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ReplayError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, ReplayError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| ReplayError::MalformedHeader {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

/// Read a length-prefixed byte array.
pub fn read_length_prefixed_bytes(r: &mut dyn Read) -> Result<Vec<u8>, ReplayError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

// ── Header encode/decode ────────────────────────────────────────

/// Encode the replay file header (magic, version, run descriptor).
pub fn encode_header(w: &mut dyn Write, header: &ReplayHeader) -> Result<(), ReplayError> {
    // Magic bytes
    w.write_all(&MAGIC)?;
    // Format version
    write_u8(w, FORMAT_VERSION)?;

    write_u64_le(w, header.start_period.0)?;
    write_u64_le(w, header.random_seed)?;
    write_length_prefixed_str(w, &header.map_name)?;
    w.write_all(&header.map_id.0)?;
    write_u8(w, header.local_player_id.0)?;

    write_u8(w, header.player_settings.len() as u8)?;
    for setting in &header.player_settings {
        write_u8(w, u8::from(setting.is_ai))?;
        // 0 = no difficulty (human or absent slot), else the stable tag.
        write_u8(w, setting.difficulty.map_or(0, |d| d.tag()))?;
    }

    Ok(())
}

/// Decode and validate the replay file header.
pub fn decode_header(r: &mut dyn Read) -> Result<ReplayHeader, ReplayError> {
    // Magic bytes
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(ReplayError::InvalidMagic);
    }

    // Format version
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion { found: version });
    }

    let start_period = LockstepPeriod(read_u64_le(r)?);
    let random_seed = read_u64_le(r)?;
    let map_name = read_length_prefixed_str(r)?;
    let mut map_id = [0u8; 16];
    r.read_exact(&mut map_id)?;
    let local_player_id = PlayerId(read_u8(r)?);

    let player_count = read_u8(r)? as usize;
    if player_count > MAX_PLAYERS {
        return Err(ReplayError::MalformedHeader {
            detail: format!("player count {player_count} exceeds roster size {MAX_PLAYERS}"),
        });
    }
    let mut player_settings = PlayerSettings::new();
    for slot in 0..player_count {
        let is_ai = match read_u8(r)? {
            0 => false,
            1 => true,
            flag => {
                return Err(ReplayError::MalformedHeader {
                    detail: format!("invalid is_ai flag {flag} for slot {slot}"),
                })
            }
        };
        let difficulty = match read_u8(r)? {
            0 => None,
            tag => Some(cadence_core::AiDifficulty::from_tag(tag).ok_or_else(|| {
                ReplayError::MalformedHeader {
                    detail: format!("invalid difficulty tag {tag} for slot {slot}"),
                }
            })?),
        };
        player_settings.push(PlayerSetting { is_ai, difficulty });
    }

    Ok(ReplayHeader {
        start_period,
        random_seed,
        map_name,
        map_id: MapId(map_id),
        local_player_id,
        player_settings,
    })
}

// ── Task record encode/decode ───────────────────────────────────

/// Encode a single task record.
pub fn encode_task(w: &mut dyn Write, task: &Task) -> Result<(), ReplayError> {
    write_u64_le(w, task.target_period.0)?;
    write_u8(w, task.issuer.0)?;
    match &task.payload {
        TaskPayload::QuickSave => write_u8(w, PAYLOAD_QUICK_SAVE)?,
        TaskPayload::Custom { kind, data } => {
            write_u8(w, PAYLOAD_CUSTOM)?;
            write_u32_le(w, *kind)?;
            write_length_prefixed_bytes(w, data)?;
        }
    }
    Ok(())
}

/// Decode a single task record.
///
/// Returns `Ok(None)` on clean EOF (no bytes available),
/// `Ok(Some(task))` on success, or an error on truncated/corrupt data.
pub fn decode_task(r: &mut dyn Read) -> Result<Option<Task>, ReplayError> {
    // Read the target_period byte-by-byte to distinguish clean EOF
    // (zero bytes available) from truncation (1-7 bytes before EOF).
    let mut period_buf = [0u8; 8];
    let mut filled = 0;
    while filled < 8 {
        match r.read(&mut period_buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    // Clean EOF — no more task records.
                    return Ok(None);
                }
                return Err(ReplayError::MalformedRecord {
                    detail: format!(
                        "truncated record: got {filled} of 8 bytes for target_period"
                    ),
                });
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ReplayError::Io(e)),
        }
    }
    let target_period = LockstepPeriod(u64::from_le_bytes(period_buf));

    let issuer = PlayerId(read_u8(r)?);
    let payload = match read_u8(r)? {
        PAYLOAD_QUICK_SAVE => TaskPayload::QuickSave,
        PAYLOAD_CUSTOM => TaskPayload::Custom {
            kind: read_u32_le(r)?,
            data: read_length_prefixed_bytes(r)?,
        },
        tag => return Err(ReplayError::UnknownPayloadType { tag }),
    };

    Ok(Some(Task {
        target_period,
        issuer,
        payload,
    }))
}
