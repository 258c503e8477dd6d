//! Chunk descriptor and range planning.

use crate::error::DownloadError;

/// One byte range of the remote resource, fetched by one range request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Position in the plan (0-based); also the admission order.
    pub index: usize,
    /// Absolute offset of the first byte.
    pub start: u64,
    /// Number of bytes in the chunk (never 0).
    pub length: u64,
}

impl ChunkDescriptor {
    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }

    /// Inclusive offset of the last byte, as used by HTTP `Range`.
    pub fn last_byte(&self) -> u64 {
        self.end() - 1
    }
}

/// Number of chunks needed to cover `total_bytes` with `chunk_size` chunks.
pub fn chunk_count(total_bytes: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    total_bytes.div_ceil(chunk_size)
}

/// Builds the ordered chunk plan for `total_bytes` with nominal `chunk_size`.
///
/// Every chunk is `chunk_size` long except possibly the last one, which takes
/// the remainder. Pure and deterministic.
pub fn plan(total_bytes: u64, chunk_size: u64) -> Result<Vec<ChunkDescriptor>, DownloadError> {
    if chunk_size == 0 {
        return Err(DownloadError::InvalidInput("chunk size must be > 0".into()));
    }
    if total_bytes == 0 {
        return Err(DownloadError::InvalidInput("total size must be > 0".into()));
    }

    let count = chunk_count(total_bytes, chunk_size);
    let mut out = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = i * chunk_size;
        let length = chunk_size.min(total_bytes - start);
        out.push(ChunkDescriptor {
            index: i as usize,
            start,
            length,
        });
    }
    Ok(out)
}
