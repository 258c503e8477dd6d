//! Size discovery: HTTP HEAD via libcurl.
//!
//! Only the headers of the final response count; redirects are followed up to
//! the configured limit and each new status line resets the collected headers.

mod parse;

use std::str;
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::SizeError;

pub use parse::HeadInfo;

/// Request settings for the HEAD probe.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub max_redirects: u32,
    pub cookie: Option<String>,
    pub user_agent: String,
    pub network_timeout: Duration,
    pub verbose: bool,
}

impl From<&EngineConfig> for ProbeOptions {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            max_redirects: cfg.max_redirects,
            cookie: cfg.cookie.clone(),
            user_agent: cfg.user_agent.clone(),
            network_timeout: cfg.network_timeout(),
            verbose: cfg.verbose,
        }
    }
}

/// Performs a HEAD request and returns the final response's metadata.
///
/// Runs in the current thread; call from `spawn_blocking` if used from async code.
pub fn probe(url: &str, opts: &ProbeOptions) -> Result<HeadInfo, SizeError> {
    let mut headers: Vec<String> = Vec::new();
    let request = |e: curl::Error| SizeError::Request(e.to_string());

    let mut easy = curl::easy::Easy::new();
    easy.verbose(opts.verbose).map_err(request)?;
    easy.url(url).map_err(request)?;
    easy.nobody(true).map_err(request)?;
    easy.follow_location(true).map_err(request)?;
    easy.max_redirections(opts.max_redirects).map_err(request)?;
    easy.connect_timeout(opts.network_timeout).map_err(request)?;
    easy.low_speed_limit(1).map_err(request)?;
    easy.low_speed_time(opts.network_timeout).map_err(request)?;
    easy.useragent(&opts.user_agent).map_err(request)?;
    if let Some(cookie) = &opts.cookie {
        easy.cookie(cookie).map_err(request)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    let line = s.trim_end();
                    if line.starts_with("HTTP/") {
                        headers.clear();
                    }
                    headers.push(line.to_string());
                }
                true
            })
            .map_err(request)?;
        transfer.perform().map_err(request)?;
    }

    let code = easy.response_code().map_err(request)?;
    if !(200..300).contains(&code) {
        return Err(SizeError::Http(code));
    }

    let info = parse::parse_headers(&headers);
    tracing::debug!(
        url,
        code,
        content_length = ?info.content_length,
        accept_ranges = info.accept_ranges,
        "HEAD probe"
    );
    Ok(info)
}

/// Content length of `url`; fails when the final response is not 2xx or
/// carries no usable `Content-Length`.
pub fn head_size(url: &str, opts: &ProbeOptions) -> Result<u64, SizeError> {
    let info = probe(url, opts)?;
    let size = info.content_length.ok_or(SizeError::MissingLength)?;
    if !info.accept_ranges {
        tracing::warn!(url, "server does not advertise Accept-Ranges: bytes");
    }
    Ok(size)
}
