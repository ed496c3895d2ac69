use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_URL: &str = "https://www.thisismyjam.com/";
pub const DEFAULT_POLL_MS: u64 = 500;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("JAMDECK_POLL_MS must be a positive number of milliseconds, got {0:?}")]
    PollInterval(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Page the sidecar opens
    pub site_url: String,
    pub poll_interval: Duration,
    /// Explicit sidecar location, otherwise resolved per build mode
    pub sidecar_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: DEFAULT_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MS),
            sidecar_path: None,
        }
    }
}

impl Config {
    /// Read `JAMDECK_URL`, `JAMDECK_POLL_MS` and `JAMDECK_SIDECAR`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("JAMDECK_URL").filter(|v| !v.trim().is_empty()) {
            log::info!("Using site URL: {}", url);
            config.site_url = url;
        }

        if let Some(raw) = lookup("JAMDECK_POLL_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ConfigError::PollInterval(raw.clone()))?;
            config.poll_interval = Duration::from_millis(millis);
        }

        if let Some(path) = lookup("JAMDECK_SIDECAR").filter(|v| !v.trim().is_empty()) {
            config.sidecar_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }
}
