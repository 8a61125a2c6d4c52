use std::path::Path;

use crate::config::schema::{IngestConfig, CONFIG_VERSION};
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<IngestConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<IngestConfig, ConfigError> {
    let config: IngestConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &IngestConfig) -> Result<(), ConfigError> {
    if config.version != CONFIG_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let limits = [
        ("max_chunk_chars", config.max_chunk_chars as u64),
        ("max_concurrent_chunks", config.max_concurrent_chunks as u64),
        ("chunk_timeout_secs", config.chunk_timeout_secs),
        (
            "progress_channel_capacity",
            config.progress_channel_capacity as u64,
        ),
    ];
    for (name, value) in limits {
        if value == 0 {
            return Err(ConfigError::Validation {
                message: format!("{} must be greater than zero", name),
            });
        }
    }

    Ok(())
}
