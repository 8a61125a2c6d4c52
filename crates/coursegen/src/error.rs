use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::db::DatabaseError;
use crate::job::{JobStatus, Stage};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Parsing failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Structure detection failed: {0}")]
    StructureDetection(#[from] StructureDetectionError),

    #[error("Philosophy alignment failed: {0}")]
    PhilosophyAlignment(#[source] TransformError),

    #[error("Content generation failed: {0}")]
    ContentGeneration(#[source] TransformError),

    #[error("Failed to create course from generated content: {0}")]
    Finalize(#[source] DatabaseError),

    #[error(transparent)]
    StateConflict(#[from] StateConflictError),

    #[error("Invalid review edits for job {job_id}: {reason}")]
    InvalidReviewEdits { job_id: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl PipelineError {
    /// Stable machine-readable name of the error class, surfaced to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Parse(_) => "parse_error",
            PipelineError::StructureDetection(_) => "structure_detection_error",
            PipelineError::PhilosophyAlignment(_) => "philosophy_alignment_error",
            PipelineError::ContentGeneration(_) | PipelineError::Finalize(_) => {
                "content_generation_error"
            }
            PipelineError::StateConflict(_) => "state_conflict_error",
            PipelineError::InvalidReviewEdits { .. } => "invalid_review_edits",
            PipelineError::Database(_) => "database_error",
            PipelineError::Config(_) => "config_error",
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Unsupported source type: {0}")]
    UnsupportedFormat(String),

    #[error("Source content is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    #[error("Source '{filename}' contains no usable text")]
    EmptyContent { filename: String },

    #[error("Source content is no longer available; re-upload is required")]
    SourceReleased,

    #[error("Parser failed: {0}")]
    Parser(String),
}

/// Failures reported by an [`AiTransformationClient`](crate::ai::AiTransformationClient).
#[derive(Error, Debug, Clone)]
pub enum TransformError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Transformation backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum StructureDetectionError {
    #[error("All {total} chunks failed structure detection (last error: {last_error})")]
    AllChunksFailed { total: usize, last_error: String },

    #[error(transparent)]
    Detection(#[from] TransformError),
}

#[derive(Error, Debug)]
pub enum StateConflictError {
    #[error("Job {0} not found")]
    JobNotFound(String),

    #[error("Job {job_id} is not paused for review (status: {status})")]
    NotPausedForReview { job_id: String, status: JobStatus },

    #[error("Job {job_id} cannot be resumed (status: {status})")]
    NotResumable { job_id: String, status: JobStatus },

    /// Paused, running and finalized jobs only move through their own entry points.
    #[error("Job {job_id} cannot be processed (status: {status})")]
    NotProcessable { job_id: String, status: JobStatus },

    #[error("Job {job_id} must re-run parsing but its source content was released")]
    SourceReleased { job_id: String },

    #[error("Job {job_id} has no checkpoint for stage {stage}")]
    MissingCheckpoint { job_id: String, stage: Stage },

    #[error("Checkpoint for stage {stage} of job {job_id} is unreadable: {reason}")]
    CorruptCheckpoint {
        job_id: String,
        stage: Stage,
        reason: String,
    },
}

/// Non-fatal persistence failures. Callers log these; they never stop a stage.
#[derive(Error, Debug)]
pub enum PersistenceWarning {
    #[error("Failed to save stage {stage} checkpoint for job {job_id}: {source}")]
    Checkpoint {
        job_id: String,
        stage: Stage,
        #[source]
        source: DatabaseError,
    },

    #[error("Refusing to checkpoint stage {stage} for job {job_id}: stage {missing} has not completed")]
    OutOfOrder {
        job_id: String,
        stage: Stage,
        missing: Stage,
    },

    #[error("Failed to serialize stage {stage} output: {source}")]
    Serialize {
        stage: Stage,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to update progress for job {job_id}: {source}")]
    Progress {
        job_id: String,
        #[source]
        source: DatabaseError,
    },

    #[error("Failed to update status of job {job_id}: {source}")]
    Status {
        job_id: String,
        #[source]
        source: DatabaseError,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_map_to_kinds() {
        let err = PipelineError::from(ParseError::EmptyContent {
            filename: "a.txt".to_string(),
        });
        assert_eq!(err.kind(), "parse_error");

        let err = PipelineError::PhilosophyAlignment(TransformError::Request("boom".into()));
        assert_eq!(err.kind(), "philosophy_alignment_error");
        assert!(err.to_string().contains("boom"));

        let err = PipelineError::from(StateConflictError::JobNotFound("j1".into()));
        assert_eq!(err.kind(), "state_conflict_error");
        assert_eq!(err.to_string(), "Job j1 not found");
    }

    #[test]
    fn test_all_chunks_failed_message() {
        let err = StructureDetectionError::AllChunksFailed {
            total: 3,
            last_error: "Request timed out after 150s".to_string(),
        };
        assert!(err.to_string().contains("All 3 chunks failed"));
    }
}
