use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::LogFormat;

pub const CONFIG_VERSION: &str = "1.0";

/// Top-level configuration of the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_version")]
    pub version: String,
    /// Defaults to `~/.coursegen/data/coursegen.db` when unset.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
    #[serde(default = "default_chunk_timeout_secs")]
    pub chunk_timeout_secs: u64,
    #[serde(default)]
    pub require_review: bool,
    #[serde(default = "default_progress_channel_capacity")]
    pub progress_channel_capacity: usize,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub transform: TransformDefaults,
}

fn default_version() -> String {
    CONFIG_VERSION.to_string()
}

fn default_max_chunk_chars() -> usize {
    12_000
}

fn default_max_concurrent_chunks() -> usize {
    3
}

fn default_chunk_timeout_secs() -> u64 {
    150
}

fn default_progress_channel_capacity() -> usize {
    100
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            database_path: None,
            max_chunk_chars: default_max_chunk_chars(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
            chunk_timeout_secs: default_chunk_timeout_secs(),
            require_review: false,
            progress_channel_capacity: default_progress_channel_capacity(),
            log_format: LogFormat::default(),
            transform: TransformDefaults::default(),
        }
    }
}

impl IngestConfig {
    pub fn chunk_timeout(&self) -> Duration {
        Duration::from_secs(self.chunk_timeout_secs)
    }

    /// Configured database path, falling back to the per-user default.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

/// Defaults passed to the transformation client for stages 3 and 4.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformDefaults {
    #[serde(default)]
    pub philosophy: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}
