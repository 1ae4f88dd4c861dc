//! Configuration structures for the ADL visualizer export.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Canonical ADL event table published alongside the analysis repository.
pub const CANONICAL_CSV_URL: &str = "https://raw.githubusercontent.com/ConejoCapital/HyperMultiAssetedADL/main/data/canonical/cash-only%20balances%20ADL%20event%20orderbook%202025-10-10/adl_detailed_analysis_REALTIME.csv";

/// Main configuration for the export pipelines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Input source configuration.
    pub source: SourceConfig,
    /// Output artifact configuration.
    pub output: OutputConfig,
    /// Flow aggregation configuration.
    pub flow: FlowConfig,
}

impl Config {
    /// Load a configuration from a JSON file. Missing sections keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would produce an empty or unwritable artifact.
    pub fn validate(&self) -> Result<()> {
        if self.flow.top_accounts == 0 {
            return Err(Error::config("flow.top_accounts must be at least 1"));
        }
        if self.output.events_file.trim().is_empty() {
            return Err(Error::config("output.events_file must not be empty"));
        }
        if self.output.flow_file.trim().is_empty() {
            return Err(Error::config("output.flow_file must not be empty"));
        }
        if self.source.remote_url.trim().is_empty() && self.source.local_path.as_os_str().is_empty() {
            return Err(Error::config("either source.local_path or source.remote_url must be set"));
        }
        Ok(())
    }
}

/// Where the raw ADL table is read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Local CSV path, preferred when it exists.
    pub local_path: PathBuf,
    /// Remote CSV URL used when the local path is absent.
    pub remote_url: String,
    /// Timeout for the remote fetch in seconds.
    pub fetch_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            local_path: PathBuf::from(
                "../HyperMultiAssetedADL/data/canonical/cash-only balances ADL event orderbook 2025-10-10/adl_detailed_analysis_REALTIME.csv",
            ),
            remote_url: CANONICAL_CSV_URL.to_string(),
            fetch_timeout_secs: 120,
        }
    }
}

/// Where and how the JSON artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory, created if missing.
    pub dir: PathBuf,
    /// File name of the events document.
    pub events_file: String,
    /// File name of the flow document.
    pub flow_file: String,
    /// Pretty-print with two-space indentation.
    pub pretty: bool,
}

impl OutputConfig {
    /// Full path of the events document.
    pub fn events_path(&self) -> PathBuf {
        self.dir.join(&self.events_file)
    }

    /// Full path of the flow document.
    pub fn flow_path(&self) -> PathBuf {
        self.dir.join(&self.flow_file)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/data"),
            events_file: "adl_events.json".to_string(),
            flow_file: "adl_flow_data.json".to_string(),
            pretty: true,
        }
    }
}

/// Flow aggregation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Number of accounts kept per direction when gating account flow edges.
    pub top_accounts: usize,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self { top_accounts: 50 }
    }
}
