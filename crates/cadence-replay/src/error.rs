//! Error types for replay persistence.
//!
//! All of these are load-time or write-time fatal: a malformed file is
//! surfaced to the caller before any run is constructed, never
//! silently repaired.

use std::fmt;
use std::io;

/// Errors that can occur while reading or writing a replay file.
#[derive(Debug)]
pub enum ReplayError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The file does not start with the expected `b"CDNC"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The header could not be decoded (truncated or corrupt data).
    MalformedHeader {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A task record could not be decoded (truncated or corrupt data).
    MalformedRecord {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// A task payload type tag is not recognized.
    UnknownPayloadType {
        /// The unrecognized type tag.
        tag: u8,
    },
    /// A task record targets a period before the header's start period.
    ///
    /// Such a task could never dispatch; the file is inconsistent.
    TaskBeforeStart {
        /// The offending task's target period.
        period: u64,
        /// The header's start period.
        start_period: u64,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"CDNC\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::MalformedHeader { detail } => write!(f, "malformed header: {detail}"),
            Self::MalformedRecord { detail } => write!(f, "malformed task record: {detail}"),
            Self::UnknownPayloadType { tag } => {
                write!(f, "unknown payload type tag {tag}")
            }
            Self::TaskBeforeStart {
                period,
                start_period,
            } => {
                write!(
                    f,
                    "task targets period {period} before the start period {start_period}"
                )
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
