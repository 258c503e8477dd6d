//! Parallel HTTP range-request downloads.
//!
//! A resource of known size is split into fixed-size chunks
//! ([`planner`]), fetched with a bounded number of concurrent range requests
//! over one multiplexed transport ([`scheduler`], [`transport`]), and written
//! at absolute offsets into a single output file ([`sink`]). The [`monitor`]
//! throttles progress notifications and turns prolonged inactivity into an
//! error. [`engine::Downloader`] ties the pieces together.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod output_name;
pub mod planner;
pub mod probe;
pub mod retry;
pub mod scheduler;
pub mod sink;
pub mod transport;

pub use config::EngineConfig;
pub use engine::{Downloader, RunState};
pub use error::{DownloadError, SizeError, TransferFailure};
pub use scheduler::RunOutcome;
pub use transport::Flow;
