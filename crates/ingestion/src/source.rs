//! Input source resolution.
//!
//! Prefers a local CSV; falls back to a single remote fetch. No retries.

use adl_core::config::SourceConfig;
use adl_core::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Resolved location of the ADL table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Local(PathBuf),
    Remote(String),
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Local(path) => write!(f, "local: {}", path.display()),
            InputSource::Remote(url) => write!(f, "remote: {url}"),
        }
    }
}

impl InputSource {
    /// Pick the local path if it exists, otherwise the remote URL.
    pub fn resolve(config: &SourceConfig) -> Result<InputSource> {
        if !config.local_path.as_os_str().is_empty() && config.local_path.exists() {
            return Ok(InputSource::Local(config.local_path.clone()));
        }
        if config.remote_url.trim().is_empty() {
            return Err(Error::unavailable(format!(
                "{} does not exist and no remote URL is configured",
                config.local_path.display()
            )));
        }
        debug!(path = %config.local_path.display(), "local input missing, using remote");
        Ok(InputSource::Remote(config.remote_url.clone()))
    }

    /// Read the full CSV payload into memory.
    pub fn read_bytes(&self, fetch_timeout: Duration) -> Result<Vec<u8>> {
        match self {
            InputSource::Local(path) => {
                info!(path = %path.display(), "Loading from local");
                std::fs::read(path).map_err(|e| {
                    Error::unavailable(format!("failed to read {}: {e}", path.display()))
                })
            }
            InputSource::Remote(url) => {
                info!(%url, "Downloading from remote");
                fetch(url, fetch_timeout)
            }
        }
    }
}

fn fetch(url: &str, timeout: Duration) -> Result<Vec<u8>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::unavailable(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .map_err(|e| Error::unavailable(format!("request to {url} failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::unavailable(format!("{url} returned HTTP {status}")));
    }

    let body = response
        .bytes()
        .map_err(|e| Error::unavailable(format!("failed to read body from {url}: {e}")))?;
    Ok(body.to_vec())
}
