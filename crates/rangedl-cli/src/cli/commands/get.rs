//! `rangedl get` – download one URL with parallel range requests.

use anyhow::{Context, Result};
use rangedl_core::config::EngineConfig;
use rangedl_core::control::StopFlag;
use rangedl_core::monitor::{ProgressStats, StreamGauge};
use rangedl_core::{Downloader, Flow, RunOutcome};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

const MIB: f64 = 1_048_576.0;

/// Exit status after an interrupt, as shells report SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// Let the run stop at its next progress notification.
    Graceful,
    /// Leave right away.
    Exit,
}

/// First Ctrl-C while range requests are open asks the run to stop and keeps
/// the partial file consistent. A second one, or one while nothing is
/// transferring (size probe, retry backoff), exits.
fn on_interrupt(stop: &StopFlag, open_streams: usize) -> Interrupt {
    if stop.is_requested() || open_streams == 0 {
        return Interrupt::Exit;
    }
    stop.request();
    Interrupt::Graceful
}

fn progress_line(stats: &ProgressStats) -> String {
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    format!(
        "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  streams {}  ETA {}  ",
        stats.bytes_done as f64 / MIB,
        stats.total_bytes as f64 / MIB,
        stats.fraction() * 100.0,
        stats.bytes_per_sec() / MIB,
        stats.streams,
        eta
    )
}

pub async fn run_get(url: String, output: Option<PathBuf>, cfg: EngineConfig) -> Result<()> {
    let stop = StopFlag::new();
    let gauge = StreamGauge::new();
    let on_signal = stop.clone();
    let streams = gauge.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match on_interrupt(&on_signal, streams.get()) {
                Interrupt::Graceful => {
                    tracing::info!("interrupt received, stopping download");
                    eprintln!("\nstopping; press Ctrl-C again to quit now");
                }
                Interrupt::Exit => {
                    tracing::warn!("interrupted, exiting");
                    eprintln!("\ninterrupted");
                    std::process::exit(EXIT_INTERRUPTED);
                }
            }
        }
    });

    let (outcome, path) = tokio::task::spawn_blocking(move || -> Result<(RunOutcome, PathBuf)> {
        let started = Instant::now();
        let streams = gauge.clone();
        let observer = stop.guard(move |done: u64, total: u64| {
            let stats = ProgressStats {
                bytes_done: done,
                total_bytes: total,
                elapsed: started.elapsed(),
                streams: streams.get(),
            };
            let mut err = std::io::stderr().lock();
            let _ = write!(err, "{}", progress_line(&stats));
            let _ = err.flush();
            Flow::Continue
        });
        let mut downloader = Downloader::new(url, output, cfg)
            .with_stream_gauge(gauge)
            .with_observer(observer);
        let result = downloader.download();
        eprintln!();
        let outcome = result.with_context(|| format!("download of {} failed", downloader.url()))?;
        Ok((outcome, downloader.output().to_path_buf()))
    })
    .await
    .context("download task panicked")??;

    match outcome {
        RunOutcome::Completed(bytes) => {
            println!("saved {} ({} bytes)", path.display(), bytes);
            Ok(())
        }
        RunOutcome::Aborted(bytes) => {
            anyhow::bail!("download aborted after {} bytes; {} is incomplete", bytes, path.display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn progress_line_formats_rate_and_eta() {
        let line = progress_line(&ProgressStats {
            bytes_done: 1_048_576,
            total_bytes: 4 * 1_048_576,
            elapsed: Duration::from_secs(1),
            streams: 4,
        });
        assert_eq!(line, "\r  1.0 / 4.0 MiB (25.0%)  1.00 MiB/s  streams 4  ETA 3s  ");
    }

    #[test]
    fn second_interrupt_exits() {
        let stop = StopFlag::new();
        assert_eq!(on_interrupt(&stop, 3), Interrupt::Graceful);
        assert!(stop.is_requested());
        assert_eq!(on_interrupt(&stop, 3), Interrupt::Exit);
    }

    #[test]
    fn interrupt_without_open_streams_exits() {
        let stop = StopFlag::new();
        assert_eq!(on_interrupt(&stop, 0), Interrupt::Exit);
        assert!(!stop.is_requested());
    }

    #[test]
    fn progress_line_unknown_eta() {
        let line = progress_line(&ProgressStats {
            bytes_done: 0,
            total_bytes: 10,
            elapsed: Duration::ZERO,
            streams: 0,
        });
        assert!(line.ends_with("ETA ?  "));
    }
}
