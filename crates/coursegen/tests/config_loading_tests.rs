//! Table-driven tests for configuration loading and validation.

mod common;

use std::path::PathBuf;
use std::time::Duration;

use coursegen::config::{load_config, load_config_from_str};
use coursegen::{LogFormat, PipelineConfig, ProcessOptions};

struct ConfigTestCase {
    name: &'static str,
    config_json: &'static str,
    should_succeed: bool,
    /// Expected error substring when loading fails.
    expected_error: Option<&'static str>,
}

const JSON_CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "empty_object",
        config_json: "{}",
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "tuned_chunking",
        config_json: r#"{
            "version": "1.0",
            "max_chunk_chars": 4000,
            "max_concurrent_chunks": 8,
            "chunk_timeout_secs": 30
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "2.0" }"#,
        should_succeed: false,
        expected_error: Some("Unsupported config version"),
    },
    ConfigTestCase {
        name: "zero_chunk_size",
        config_json: r#"{ "max_chunk_chars": 0 }"#,
        should_succeed: false,
        expected_error: Some("max_chunk_chars must be greater than zero"),
    },
    ConfigTestCase {
        name: "zero_concurrency",
        config_json: r#"{ "max_concurrent_chunks": 0 }"#,
        should_succeed: false,
        expected_error: Some("max_concurrent_chunks"),
    },
    ConfigTestCase {
        name: "zero_timeout",
        config_json: r#"{ "chunk_timeout_secs": 0 }"#,
        should_succeed: false,
        expected_error: Some("chunk_timeout_secs"),
    },
    ConfigTestCase {
        name: "unknown_log_format",
        config_json: r#"{ "log_format": "xml" }"#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "version": "1.0", "#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn test_json_config_loading() {
    for test_case in JSON_CONFIG_TESTS {
        let result = load_config_from_str(test_case.config_json);
        match (test_case.should_succeed, result) {
            (true, Ok(_)) => {}
            (true, Err(e)) => panic!("Test '{}': expected success, got {}", test_case.name, e),
            (false, Ok(_)) => panic!("Test '{}': expected failure", test_case.name),
            (false, Err(e)) => {
                if let Some(expected) = test_case.expected_error {
                    assert!(
                        e.to_string().contains(expected),
                        "Test '{}': expected error containing '{}', got '{}'",
                        test_case.name,
                        expected,
                        e
                    );
                }
            }
        }
    }
}

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/configs")
}

#[test]
fn test_config_defaults_applied() {
    let config = load_config(fixtures_path().join("minimal.json")).unwrap();

    assert_eq!(config.max_chunk_chars, 12_000);
    assert_eq!(config.max_concurrent_chunks, 3);
    assert_eq!(config.chunk_timeout(), Duration::from_secs(150));
    assert!(!config.require_review);
    assert_eq!(config.log_format, LogFormat::Plain);
    assert!(config.transform.philosophy.is_none());
}

#[test]
fn test_full_config_field_values() {
    let config = load_config(fixtures_path().join("full.json")).unwrap();

    assert_eq!(config.max_chunk_chars, 8000);
    assert_eq!(config.max_concurrent_chunks, 5);
    assert_eq!(config.chunk_timeout(), Duration::from_secs(90));
    assert!(config.require_review);
    assert_eq!(config.progress_channel_capacity, 64);
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(
        config.resolved_database_path(),
        Some(PathBuf::from("/var/lib/coursegen/coursegen.db"))
    );

    let pipeline = PipelineConfig::from_config(&config);
    assert_eq!(pipeline.chunk_timeout, Duration::from_secs(90));
    let options = ProcessOptions::from_config(&pipeline);
    assert!(options.require_review);
    assert_eq!(options.transform.philosophy.as_deref(), Some("project-based"));
    assert_eq!(options.transform.audience.as_deref(), Some("backend engineers"));
}

#[test]
fn test_missing_config_file() {
    let err = load_config(fixtures_path().join("does-not-exist.json")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}
