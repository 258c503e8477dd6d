//! Chunk planning.
//!
//! Splits `[0, total_bytes)` into fixed-size, contiguous, non-overlapping
//! chunks. The no-overlap property is what lets the sink write without locks.

mod chunk;

pub use chunk::{chunk_count, plan, ChunkDescriptor};
