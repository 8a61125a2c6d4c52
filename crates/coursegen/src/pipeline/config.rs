use std::time::Duration;

use crate::ai::TransformOptions;
use crate::config::IngestConfig;

/// Runtime settings of the orchestrator, resolved from [`IngestConfig`].
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_chunk_chars: usize,
    pub max_concurrent_chunks: usize,
    pub chunk_timeout: Duration,
    pub require_review: bool,
    pub transform: TransformOptions,
}

impl PipelineConfig {
    pub fn from_config(config: &IngestConfig) -> Self {
        Self {
            max_chunk_chars: config.max_chunk_chars,
            max_concurrent_chunks: config.max_concurrent_chunks,
            chunk_timeout: config.chunk_timeout(),
            require_review: config.require_review,
            transform: TransformOptions::from(&config.transform),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&IngestConfig::default())
    }
}

/// Per-call options. Defaults come from [`PipelineConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    pub require_review: bool,
    pub transform: TransformOptions,
}

impl ProcessOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            require_review: config.require_review,
            transform: config.transform.clone(),
        }
    }

    pub fn with_review(mut self) -> Self {
        self.require_review = true;
        self
    }
}
