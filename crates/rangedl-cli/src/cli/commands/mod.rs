//! CLI command handlers.

mod get;
mod size;

pub use get::run_get;
pub use size::run_size;
