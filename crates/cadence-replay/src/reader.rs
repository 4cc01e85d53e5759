//! Replay playback reader.
//!
//! [`ReplayReader`] reads a replay from any `Read` source. The header
//! is validated on construction; task records are checked against the
//! header's start period as they are decoded, so an inconsistent file
//! fails at load time rather than desyncing a run later.

use std::io::Read;

use cadence_core::Task;

use crate::codec::{decode_header, decode_task};
use crate::error::ReplayError;
use crate::types::ReplayHeader;

/// Reads replay data from a byte stream.
///
/// Generic over `R: Read` so tests can use `&[u8]` and production
/// code can use `BufReader<File>`.
pub struct ReplayReader<R: Read> {
    reader: R,
    header: ReplayHeader,
    tasks_read: u64,
}

impl<R: Read> ReplayReader<R> {
    /// Open a replay stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, ReplayError> {
        let header = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            header,
            tasks_read: 0,
        })
    }

    /// The validated replay header.
    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    /// Read the next task record, or `None` if the stream is exhausted.
    pub fn next_task(&mut self) -> Result<Option<Task>, ReplayError> {
        let task = decode_task(&mut self.reader)?;
        if let Some(task) = &task {
            if task.target_period < self.header.start_period {
                return Err(ReplayError::TaskBeforeStart {
                    period: task.target_period.0,
                    start_period: self.header.start_period.0,
                });
            }
            self.tasks_read += 1;
        }
        Ok(task)
    }

    /// Read the whole remaining task stream in file order.
    pub fn read_all_tasks(&mut self) -> Result<Vec<Task>, ReplayError> {
        let mut tasks = Vec::new();
        while let Some(task) = self.next_task()? {
            tasks.push(task);
        }
        Ok(tasks)
    }

    /// Number of task records read so far.
    pub fn tasks_read(&self) -> u64 {
        self.tasks_read
    }

    /// Convert into a task iterator.
    pub fn tasks(self) -> TaskIter<R> {
        TaskIter {
            inner: self,
            done: false,
        }
    }
}

/// Iterator adapter over replay task records.
pub struct TaskIter<R: Read> {
    inner: ReplayReader<R>,
    done: bool,
}

impl<R: Read> Iterator for TaskIter<R> {
    type Item = Result<Task, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.inner.next_task() {
            Ok(Some(task)) => Some(Ok(task)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
