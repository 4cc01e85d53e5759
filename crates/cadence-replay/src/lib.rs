//! Binary replay format for continuable Cadence runs.
//!
//! A replay file is a header plus an ordered task stream, together
//! sufficient to deterministically reproduce a run from its starting
//! period. A from-scratch run has `start_period == 0`; a continuation
//! produced by the split flow resumes at the period after its snapshot
//! and its body holds only the tasks not yet executed at the split
//! point.
//!
//! # Architecture
//!
//! - [`ReplayWriter`] streams the header then task records to any
//!   `Write` sink, and implements the clock's `TaskSink` so the
//!   remaining-task export writes straight through
//! - [`ReplayReader`] validates the header and iterates task records
//!   from any `Read` source
//! - All I/O uses a custom binary codec (no serde dependency)
//!
//! # Format
//!
//! ```text
//! [MAGIC "CDNC"] [VERSION u8] [ReplayHeader]
//! [TaskRecord 1] [TaskRecord 2] ... EOF
//! ```
//!
//! Integers are little-endian; strings and byte arrays carry a `u32`
//! length prefix. The task stream is terminated by end-of-stream, with
//! clean EOF distinguished byte-exactly from truncation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use error::ReplayError;
pub use reader::{ReplayReader, TaskIter};
pub use types::ReplayHeader;
pub use writer::ReplayWriter;

/// Magic bytes at the start of every replay file.
pub const MAGIC: [u8; 4] = *b"CDNC";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
