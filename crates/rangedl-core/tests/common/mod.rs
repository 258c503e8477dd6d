#![allow(dead_code)]

pub mod memory_transport;
pub mod range_server;

/// Deterministic, non-repeating-per-chunk byte pattern.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + i / 251) % 251) as u8).collect()
}
