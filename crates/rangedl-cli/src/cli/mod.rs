//! CLI for the rangedl parallel downloader.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use rangedl_core::config::{self, EngineConfig, RetryConfig};
use std::path::PathBuf;

use commands::{run_get, run_size};

/// Top-level CLI for rangedl.
#[derive(Debug, Parser)]
#[command(name = "rangedl")]
#[command(about = "rangedl: parallel HTTP range-request downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL using parallel range requests.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,
        /// Output file (default: last path segment of the URL).
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print the size reported by a HEAD request.
    Size {
        url: String,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

/// Per-invocation overrides of config.toml.
#[derive(Debug, Default, Clone, Args)]
pub struct EngineArgs {
    /// Nominal chunk size in bytes.
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<u64>,
    /// Maximum concurrent range requests.
    #[arg(short = 'n', long, value_name = "N")]
    pub parallel: Option<usize>,
    /// Network timeout in seconds (connect, low speed, stall).
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    /// Minimum seconds between progress updates.
    #[arg(long, value_name = "SECS")]
    pub min_callback_period: Option<f64>,
    #[arg(long, value_name = "N")]
    pub max_redirects: Option<u32>,
    /// Raw Cookie header value, e.g. "session=abc; lang=en".
    #[arg(long)]
    pub cookie: Option<String>,
    #[arg(long)]
    pub user_agent: Option<String>,
    /// Retry a failed download up to N more times (0 disables retry).
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,
    /// Print libcurl's request/response trace to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

impl EngineArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, mut cfg: EngineConfig) -> EngineConfig {
        if let Some(v) = self.chunk_size {
            cfg.chunk_size = v;
        }
        if let Some(v) = self.parallel {
            cfg.max_parallel = v;
        }
        if let Some(v) = self.timeout {
            cfg.network_timeout_secs = v;
        }
        if let Some(v) = self.min_callback_period {
            cfg.min_callback_period_secs = v;
        }
        if let Some(v) = self.max_redirects {
            cfg.max_redirects = v;
        }
        if let Some(v) = &self.cookie {
            cfg.cookie = Some(v.clone());
        }
        if let Some(v) = &self.user_agent {
            cfg.user_agent = v.clone();
        }
        if self.verbose {
            cfg.verbose = true;
        }
        match self.retries {
            Some(0) => cfg.retry = None,
            Some(n) => {
                let base = cfg.retry.take().unwrap_or_default();
                cfg.retry = Some(RetryConfig {
                    max_attempts: n + 1,
                    ..base
                });
            }
            None => {}
        }
        cfg
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Get {
                url,
                output,
                engine,
            } => run_get(url, output, engine.apply(cfg)).await?,
            CliCommand::Size { url, engine } => run_size(url, engine.apply(cfg)).await?,
        }

        Ok(())
    }
}
