//! History log reader
//!
//! Sequentially reads framed entries from the history log file.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{HubError, Result};

use super::entry::{FrameHeader, HEADER_SIZE};
use super::LogEntry;

/// Outcome of reading one frame
#[derive(Debug)]
pub(crate) enum Frame {
    /// A complete, verified entry
    Entry(LogEntry),
    /// Clean end of file
    End,
    /// File ends in the middle of a frame (interrupted append)
    Torn { offset: u64 },
    /// Frame is complete but fails verification
    Corrupt { offset: u64, reason: String },
}

/// Reads entries from the history log file
pub struct HistoryReader {
    reader: BufReader<File>,
    /// Offset just past the last entry returned
    position: u64,
    file_len: u64,
    last_lsn: u64,
}

impl HistoryReader {
    /// Open a history log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
            file_len,
            last_lsn: 0,
        })
    }

    /// Read the next entry
    ///
    /// Returns `Ok(None)` at a clean end of file and
    /// `HubError::HistoryCorruption` for a torn or invalid frame.
    pub fn next_entry(&mut self) -> Result<Option<LogEntry>> {
        match self.read_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn { offset } => Err(HubError::HistoryCorruption(format!(
                "partial entry at offset {}",
                offset
            ))),
            Frame::Corrupt { offset, reason } => Err(HubError::HistoryCorruption(format!(
                "invalid entry at offset {}: {}",
                offset, reason
            ))),
        }
    }

    /// Iterate over entries until the end of the valid prefix
    pub fn entries(self) -> HistoryIterator {
        HistoryIterator {
            reader: self,
            done: false,
        }
    }

    /// Offset just past the last entry read successfully
    pub fn position(&self) -> u64 {
        self.position
    }

    /// LSN of the last entry read successfully (0 if none)
    pub fn last_lsn(&self) -> u64 {
        self.last_lsn
    }

    pub(crate) fn read_frame(&mut self) -> Result<Frame> {
        let offset = self.position;
        let remaining = self.file_len - offset;

        if remaining == 0 {
            return Ok(Frame::End);
        }
        if remaining < HEADER_SIZE as u64 {
            return Ok(Frame::Torn { offset });
        }

        let mut header_bytes = [0u8; HEADER_SIZE];
        self.reader.read_exact(&mut header_bytes)?;

        let header = match FrameHeader::parse(&header_bytes) {
            Ok(header) => header,
            Err(e) => {
                return Ok(Frame::Corrupt {
                    offset,
                    reason: e.to_string(),
                })
            }
        };

        let frame_len = HEADER_SIZE as u64 + header.body_len as u64;
        if remaining < frame_len {
            return Ok(Frame::Torn { offset });
        }

        let mut body = vec![0u8; header.body_len as usize];
        self.reader.read_exact(&mut body)?;

        let entry = match LogEntry::decode_body(&header, &body) {
            Ok(entry) => entry,
            Err(e) => {
                return Ok(Frame::Corrupt {
                    offset,
                    reason: e.to_string(),
                })
            }
        };

        if entry.lsn <= self.last_lsn {
            return Ok(Frame::Corrupt {
                offset,
                reason: format!(
                    "LSN {} does not follow previous LSN {}",
                    entry.lsn, self.last_lsn
                ),
            });
        }

        self.position = offset + frame_len;
        self.last_lsn = entry.lsn;
        Ok(Frame::Entry(entry))
    }
}

/// Iterator over history log entries
///
/// Yields the first error it hits and then stops.
pub struct HistoryIterator {
    reader: HistoryReader,
    done: bool,
}

impl Iterator for HistoryIterator {
    type Item = Result<LogEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
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
