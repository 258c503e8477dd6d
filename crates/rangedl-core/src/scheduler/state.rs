//! Per-chunk write bookkeeping owned by the scheduler.

use crate::error::TransferFailure;
use crate::planner::ChunkDescriptor;
use crate::sink::OutputSink;

/// One in-flight chunk. `write_cursor == descriptor.start + bytes_written` always holds.
#[derive(Debug)]
pub(crate) struct TransferState {
    pub(crate) descriptor: ChunkDescriptor,
    write_cursor: u64,
    bytes_written: u64,
}

impl TransferState {
    pub(crate) fn new(descriptor: ChunkDescriptor) -> Self {
        Self {
            write_cursor: descriptor.start,
            bytes_written: 0,
            descriptor,
        }
    }

    /// Write a received span at the cursor. A span that would run past the
    /// chunk's declared length is rejected without touching the file.
    pub(crate) fn accept(&mut self, bytes: &[u8], sink: &mut OutputSink) -> Result<u64, TransferFailure> {
        let received = self.bytes_written + bytes.len() as u64;
        if received > self.descriptor.length {
            return Err(TransferFailure::Overrun {
                expected: self.descriptor.length,
                received,
            });
        }
        let n = sink
            .write(self.write_cursor, bytes)
            .map_err(TransferFailure::Storage)?;
        self.write_cursor += n;
        self.bytes_written += n;
        debug_assert_eq!(self.write_cursor, self.descriptor.start + self.bytes_written);
        Ok(n)
    }

    /// A cleanly finished transfer must have delivered the whole chunk.
    pub(crate) fn finish(&self) -> Result<(), TransferFailure> {
        if self.bytes_written != self.descriptor.length {
            return Err(TransferFailure::PartialTransfer {
                expected: self.descriptor.length,
                received: self.bytes_written,
            });
        }
        Ok(())
    }

    pub(crate) fn bytes_written(&self) -> u64 {
        self.bytes_written
    }
}
