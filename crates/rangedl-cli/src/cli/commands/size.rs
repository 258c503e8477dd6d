//! `rangedl size` – print the content length of a URL.

use anyhow::{Context, Result};
use rangedl_core::config::EngineConfig;
use rangedl_core::probe::{head_size, ProbeOptions};

pub async fn run_size(url: String, cfg: EngineConfig) -> Result<()> {
    let opts = ProbeOptions::from(&cfg);
    let size = tokio::task::spawn_blocking(move || head_size(&url, &opts))
        .await
        .context("size probe task panicked")?
        .context("size discovery failed")?;
    println!("{}", size);
    Ok(())
}
