use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::DownloadError;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("rangedl/", env!("CARGO_PKG_VERSION"));

/// Caller-level retry parameters (optional `[retry]` section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of whole-download attempts (including the first).
    pub max_attempts: u32,
    /// Base backoff delay in seconds (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
        }
    }
}

/// Seconds as a `Duration`; rejects negative, NaN, infinite and out-of-range values.
fn secs_to_duration(name: &str, secs: f64) -> Result<Duration, DownloadError> {
    Duration::try_from_secs_f64(secs).map_err(|_| {
        DownloadError::InvalidInput(format!(
            "{} must be a non-negative number of seconds within range, got {}",
            name, secs
        ))
    })
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.base_delay_secs).unwrap_or(self.max_delay())
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }

    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.max_attempts == 0 {
            return Err(DownloadError::InvalidInput(
                "retry.max_attempts must be > 0".into(),
            ));
        }
        secs_to_duration("retry.base_delay_secs", self.base_delay_secs)?;
        Ok(())
    }
}

/// Engine configuration, loaded from `~/.config/rangedl/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Nominal chunk size in bytes; the last chunk may be shorter.
    pub chunk_size: u64,
    /// Maximum number of concurrent range requests.
    pub max_parallel: usize,
    /// Connect timeout, per-connection low-speed window and global stall window.
    pub network_timeout_secs: u64,
    /// Minimum time between two progress notifications.
    pub min_callback_period_secs: f64,
    /// Maximum redirects followed by size discovery and each chunk request.
    pub max_redirects: u32,
    /// Raw `Cookie` header value sent with every request.
    pub cookie: Option<String>,
    pub user_agent: String,
    /// Turn on libcurl's verbose trace (to stderr) for every request.
    pub verbose: bool,
    /// Optional retry policy; absent means a failed download is not retried.
    pub retry: Option<RetryConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            max_parallel: 10,
            network_timeout_secs: 60,
            min_callback_period_secs: 1.0,
            max_redirects: 20,
            cookie: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            verbose: false,
            retry: None,
        }
    }
}

impl EngineConfig {
    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    /// Saturates for values `validate` rejects.
    pub fn min_callback_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_callback_period_secs).unwrap_or(Duration::MAX)
    }

    /// Reject settings the engine cannot run with. Called before any network activity.
    pub fn validate(&self) -> Result<(), DownloadError> {
        if self.chunk_size == 0 {
            return Err(DownloadError::InvalidInput("chunk_size must be > 0".into()));
        }
        if self.max_parallel == 0 {
            return Err(DownloadError::InvalidInput("max_parallel must be > 0".into()));
        }
        if self.network_timeout_secs == 0 {
            return Err(DownloadError::InvalidInput(
                "network_timeout_secs must be > 0".into(),
            ));
        }
        secs_to_duration("min_callback_period_secs", self.min_callback_period_secs)?;
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("rangedl")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<EngineConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: EngineConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.chunk_size, 1_048_576);
        assert_eq!(cfg.max_parallel, 10);
        assert_eq!(cfg.network_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.min_callback_period(), Duration::from_secs(1));
        assert_eq!(cfg.max_redirects, 20);
        assert!(cfg.cookie.is_none());
        assert!(cfg.user_agent.starts_with("rangedl/"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = EngineConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.chunk_size, cfg.chunk_size);
        assert_eq!(parsed.max_parallel, cfg.max_parallel);
        assert_eq!(parsed.user_agent, cfg.user_agent);
    }

    #[test]
    fn config_toml_partial_uses_defaults() {
        let toml = r#"
            chunk_size = 65536
            max_parallel = 4
            cookie = "session=abc"
        "#;
        let cfg: EngineConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.chunk_size, 65536);
        assert_eq!(cfg.max_parallel, 4);
        assert_eq!(cfg.cookie.as_deref(), Some("session=abc"));
        assert_eq!(cfg.network_timeout_secs, 60);
        assert!(cfg.retry.is_none());
    }

    #[test]
    fn config_toml_retry_section() {
        let toml = r#"
            [retry]
            max_attempts = 4
            base_delay_secs = 0.5
            max_delay_secs = 15
        "#;
        let cfg: EngineConfig = toml::from_str(toml).unwrap();
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.base_delay(), Duration::from_millis(500));
        assert_eq!(retry.max_delay(), Duration::from_secs(15));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unrepresentable_periods() {
        for secs in [1e30, f64::INFINITY, f64::NAN, -0.5] {
            let cfg = EngineConfig {
                min_callback_period_secs: secs,
                ..EngineConfig::default()
            };
            assert!(
                matches!(cfg.validate(), Err(DownloadError::InvalidInput(_))),
                "accepted min_callback_period_secs = {}",
                secs
            );
            // Never panics, even unvalidated.
            let _ = cfg.min_callback_period();
        }
    }

    #[test]
    fn validate_rejects_bad_retry_section() {
        let toml = r#"
            [retry]
            max_attempts = 3
            base_delay_secs = inf
            max_delay_secs = 10
        "#;
        let cfg: EngineConfig = toml::from_str(toml).unwrap();
        assert!(matches!(cfg.validate(), Err(DownloadError::InvalidInput(_))));
        let retry = cfg.retry.as_ref().unwrap();
        assert_eq!(retry.base_delay(), Duration::from_secs(10));

        let cfg = EngineConfig {
            retry: Some(RetryConfig {
                max_attempts: 0,
                ..RetryConfig::default()
            }),
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_values() {
        let mut cfg = EngineConfig::default();
        cfg.chunk_size = 0;
        assert!(matches!(cfg.validate(), Err(DownloadError::InvalidInput(_))));

        let mut cfg = EngineConfig::default();
        cfg.max_parallel = 0;
        assert!(matches!(cfg.validate(), Err(DownloadError::InvalidInput(_))));

        let mut cfg = EngineConfig::default();
        cfg.min_callback_period_secs = -1.0;
        assert!(cfg.validate().is_err());
    }
}
