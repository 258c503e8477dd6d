//! Output file lifecycle and offset writes.
//!
//! One file handle per run. Every write seeks to an absolute offset first, so
//! interleaved writes from different transfers never depend on a shared file
//! cursor. Chunks never overlap, so no two writes target the same byte.

mod file;

pub use file::OutputSink;
