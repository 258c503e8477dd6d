//! Download facade: size discovery, planning, output file, scheduling.
//!
//! ```text
//! Idle -> Planning -> Running -> Completed | Failed | Aborted
//! ```
//!
//! The output file is opened only after the size is known and the plan is
//! valid, and it is closed on every exit path.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::error::DownloadError;
use crate::monitor::{Monitor, ProgressObserver, StreamGauge};
use crate::output_name::default_output_name;
use crate::planner;
use crate::probe::{self, ProbeOptions};
use crate::retry::run_with_retry;
use crate::scheduler::{self, RunOutcome};
use crate::sink::OutputSink;
use crate::transport::{CurlOptions, CurlTransport, Transport};

/// Lifecycle of one download run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Planning,
    Running,
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Planning => "planning",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Parallel range-request download of one URL into one file.
pub struct Downloader<'o> {
    url: String,
    output: PathBuf,
    config: EngineConfig,
    observer: Option<Box<dyn ProgressObserver + 'o>>,
    gauge: Option<StreamGauge>,
    total_bytes: Option<u64>,
    state: RunState,
}

impl<'o> Downloader<'o> {
    /// `output` defaults to a name derived from the URL path, in the current directory.
    pub fn new(url: impl Into<String>, output: Option<PathBuf>, config: EngineConfig) -> Self {
        let url = url.into();
        let output = output.unwrap_or_else(|| PathBuf::from(default_output_name(&url)));
        Self {
            url,
            output,
            config,
            observer: None,
            gauge: None,
            total_bytes: None,
            state: RunState::Idle,
        }
    }

    pub fn with_observer(mut self, observer: impl ProgressObserver + 'o) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Keep `gauge` at the number of range requests in flight while running.
    pub fn with_stream_gauge(mut self, gauge: StreamGauge) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        tracing::debug!(from = %self.state, to = %next, url = %self.url, "run state");
        self.state = next;
    }

    /// Size of the resource; discovered with a HEAD request on first use, then cached.
    pub fn total_bytes(&mut self) -> Result<u64, DownloadError> {
        if let Some(n) = self.total_bytes {
            return Ok(n);
        }
        let n = probe::head_size(&self.url, &ProbeOptions::from(&self.config))?;
        tracing::info!(url = %self.url, total_bytes = n, "size discovered");
        self.total_bytes = Some(n);
        Ok(n)
    }

    /// Download over libcurl. Retried as a whole when `[retry]` is configured.
    pub fn download(&mut self) -> Result<RunOutcome, DownloadError> {
        match self.config.retry.clone() {
            Some(retry) => run_with_retry(&retry, |attempt| {
                if attempt > 1 {
                    tracing::info!(attempt, url = %self.url, "retrying download");
                }
                self.download_once()
            }),
            None => self.download_once(),
        }
    }

    fn download_once(&mut self) -> Result<RunOutcome, DownloadError> {
        if let Err(e) = self.config.validate() {
            self.transition(RunState::Failed);
            return Err(e);
        }
        let total = match self.total_bytes() {
            Ok(n) => n,
            Err(e) => {
                self.transition(RunState::Failed);
                return Err(e);
            }
        };
        let mut transport = CurlTransport::new(self.curl_options(total));
        self.download_with(&mut transport, total)
    }

    fn curl_options(&self, total_bytes: u64) -> CurlOptions {
        let cfg = &self.config;
        CurlOptions {
            cookie: cfg.cookie.clone(),
            user_agent: cfg.user_agent.clone(),
            max_redirects: cfg.max_redirects,
            network_timeout: cfg.network_timeout(),
            verbose: cfg.verbose,
            ..CurlOptions::new(&self.url, total_bytes)
        }
    }

    /// Run the download over a caller-supplied transport with a known size.
    pub fn download_with<T>(&mut self, transport: &mut T, total_bytes: u64) -> Result<RunOutcome, DownloadError>
    where
        T: Transport + ?Sized,
    {
        let result = self.run_with(transport, total_bytes);
        let next = match &result {
            Ok(RunOutcome::Completed(_)) => RunState::Completed,
            Ok(RunOutcome::Aborted(_)) => RunState::Aborted,
            Err(_) => RunState::Failed,
        };
        self.transition(next);
        match &result {
            Ok(outcome) => tracing::info!(
                url = %self.url,
                output = %self.output.display(),
                done_bytes = outcome.done_bytes(),
                total_bytes,
                state = %next,
                "download finished"
            ),
            Err(e) => tracing::error!(url = %self.url, "download failed: {}", e),
        }
        result
    }

    fn run_with<T>(&mut self, transport: &mut T, total_bytes: u64) -> Result<RunOutcome, DownloadError>
    where
        T: Transport + ?Sized,
    {
        self.config.validate()?;
        self.transition(RunState::Planning);
        let plan = planner::plan(total_bytes, self.config.chunk_size)?;
        let parallel = self.config.max_parallel.min(plan.len());
        tracing::debug!(chunks = plan.len(), parallel, chunk_size = self.config.chunk_size, "planned");

        let mut sink = OutputSink::create(&self.output)?;
        sink.preallocate(total_bytes)?;

        self.transition(RunState::Running);
        let mut monitor = Monitor::new(
            total_bytes,
            self.config.min_callback_period(),
            self.config.network_timeout(),
        );
        if let Some(observer) = self.observer.as_deref_mut() {
            monitor = monitor.with_observer(observer);
        }
        if let Some(gauge) = &self.gauge {
            monitor = monitor.with_gauge(gauge.clone());
        }
        let result = scheduler::run(&plan, self.config.max_parallel, transport, &mut sink, &mut monitor);
        drop(monitor);

        let closed = sink.close();
        match result {
            Ok(outcome) => {
                closed?;
                Ok(outcome)
            }
            Err(e) => {
                if let Err(ce) = closed {
                    tracing::warn!("closing output after failure: {}", ce);
                }
                Err(e)
            }
        }
    }
}
