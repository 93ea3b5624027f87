//! Engine configuration, loaded from a TOML file. Every field has a
//! default so a missing or partial file still yields a working config.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory for original receipt files.
    pub blob_dir: String,
    /// SQLite database file for receipt and reimbursement records.
    pub db_path: String,
    pub extractor: ExtractorConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            blob_dir: "data/uploads".to_string(),
            db_path: "data/receipts.db".to_string(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Base URL of the Ollama server.
    pub base_url: String,
    /// Vision model used for scanning.
    pub model: String,
    /// Per-scan deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llava".to_string(),
            timeout_secs: 120,
        }
    }
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
