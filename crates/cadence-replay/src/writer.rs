//! Replay recording writer.
//!
//! [`ReplayWriter`] streams the header then task records to any
//! `Write` sink. The header is written immediately on construction, so
//! a writer that never records a task still produces a loadable file
//! describing an empty run.

use std::io::{self, Write};

use cadence_core::{ScheduledTask, Task, TaskSink};

use crate::codec::{encode_header, encode_task};
use crate::error::ReplayError;
use crate::types::ReplayHeader;

/// Writes replay data to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`. Implements the clock's [`TaskSink`]
/// so a remaining-task export streams straight into the file in
/// dispatch order.
///
/// # Examples
///
/// ```
/// use cadence_core::{LockstepPeriod, MapId, PlayerId, Task};
/// use cadence_replay::{ReplayHeader, ReplayReader, ReplayWriter};
///
/// let header = ReplayHeader {
///     start_period: LockstepPeriod(0),
///     random_seed: 7,
///     map_name: "plain".into(),
///     map_id: MapId([0; 16]),
///     local_player_id: PlayerId(0),
///     player_settings: Default::default(),
/// };
///
/// let mut buf = Vec::new();
/// let mut writer = ReplayWriter::new(&mut buf, &header).unwrap();
/// writer.write_task(&Task::quick_save(LockstepPeriod(4))).unwrap();
/// assert_eq!(writer.tasks_written(), 1);
/// drop(writer);
///
/// let mut reader = ReplayReader::open(buf.as_slice()).unwrap();
/// assert_eq!(reader.header(), &header);
/// assert!(reader.next_task().unwrap().is_some());
/// assert!(reader.next_task().unwrap().is_none());
/// ```
pub struct ReplayWriter<W: Write> {
    writer: W,
    tasks_written: u64,
}

impl<W: Write> ReplayWriter<W> {
    /// Create a new replay writer, immediately writing the header.
    pub fn new(mut writer: W, header: &ReplayHeader) -> Result<Self, ReplayError> {
        encode_header(&mut writer, header)?;
        Ok(Self {
            writer,
            tasks_written: 0,
        })
    }

    /// Append one task record.
    pub fn write_task(&mut self, task: &Task) -> Result<(), ReplayError> {
        encode_task(&mut self.writer, task)?;
        self.tasks_written += 1;
        Ok(())
    }

    /// Append every task in order.
    pub fn write_tasks<'a>(
        &mut self,
        tasks: impl IntoIterator<Item = &'a Task>,
    ) -> Result<(), ReplayError> {
        for task in tasks {
            self.write_task(task)?;
        }
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), ReplayError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of task records written so far.
    pub fn tasks_written(&self) -> u64 {
        self.tasks_written
    }

    /// Consume the writer and return the underlying `Write` sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TaskSink for ReplayWriter<W> {
    fn accept(&mut self, task: &ScheduledTask) -> io::Result<()> {
        self.write_task(&task.task).map_err(|e| match e {
            ReplayError::Io(io_err) => io_err,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        })
    }
}
