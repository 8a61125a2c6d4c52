//! Optional human review between structure detection and philosophy alignment.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::content::{CoursePreview, ParsedContent, StructureResult};
use crate::db::{job_repo, Database};
use crate::error::{PersistenceWarning, PipelineError, StateConflictError};
use crate::job::{JobStatus, Stage, UploadJob};

use super::checkpoint::CheckpointStore;
use super::progress::{overall_percent, ProgressTracker};

/// What a reviewer sees while the job is paused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewPreview {
    pub job_id: String,
    pub course: CoursePreview,
    pub section_count: usize,
    pub source_chars: usize,
}

#[derive(Clone)]
pub struct ReviewGate {
    db: Database,
    checkpoints: CheckpointStore,
    progress: ProgressTracker,
}

impl ReviewGate {
    pub fn new(db: Database, checkpoints: CheckpointStore, progress: ProgressTracker) -> Self {
        Self {
            db,
            checkpoints,
            progress,
        }
    }

    /// Persists the stage 2 checkpoint and parks the job. Never advances the pipeline.
    pub fn pause_for_review(
        &self,
        job_id: &str,
        parsed: &ParsedContent,
        structure: &StructureResult,
    ) -> (ReviewPreview, Vec<PersistenceWarning>) {
        let mut warnings = Vec::new();

        if let Err(w) = self
            .checkpoints
            .save(job_id, Stage::DetectStructure, structure)
        {
            warnings.push(w);
        }
        if let Err(w) = self
            .progress
            .update(job_id, Stage::DetectStructure, 100, "Completed")
        {
            warnings.push(w);
        }
        if let Err(w) = self
            .checkpoints
            .set_status(job_id, JobStatus::PausedForReview, false)
        {
            warnings.push(w);
        }

        self.progress.notify_status(
            job_id,
            JobStatus::PausedForReview,
            overall_percent(Stage::DetectStructure, 100),
            "Awaiting review",
        );
        info!(job_id, "Paused for review");

        let preview = ReviewPreview {
            job_id: job_id.to_string(),
            course: CoursePreview::from_structure(structure),
            section_count: parsed.sections.len(),
            source_chars: parsed.total_chars(),
        };
        (preview, warnings)
    }

    /// Applies reviewer edits to the stored structure and releases the job.
    ///
    /// `edits` is shallow-merged over the stored structure: each top-level key
    /// replaces the stored value. Edits that do not yield a valid structure
    /// are rejected and the job is left untouched.
    pub fn approve(&self, job_id: &str, edits: &Value) -> Result<StructureResult, PipelineError> {
        let job = self.paused_job(job_id)?;

        let edits = edits
            .as_object()
            .ok_or_else(|| PipelineError::InvalidReviewEdits {
                job_id: job_id.to_string(),
                reason: "edits must be a JSON object".to_string(),
            })?;

        let mut stored: Value = self.checkpoints.load(&job, Stage::DetectStructure)?;
        let fields = stored
            .as_object_mut()
            .ok_or_else(|| StateConflictError::CorruptCheckpoint {
                job_id: job_id.to_string(),
                stage: Stage::DetectStructure,
                reason: "stored structure is not an object".to_string(),
            })?;
        for (key, value) in edits {
            fields.insert(key.clone(), value.clone());
        }

        let structure: StructureResult =
            serde_json::from_value(stored).map_err(|e| PipelineError::InvalidReviewEdits {
                job_id: job_id.to_string(),
                reason: e.to_string(),
            })?;

        if let Err(w) = self
            .checkpoints
            .save(job_id, Stage::DetectStructure, &structure)
        {
            warn!(job_id, "{}", w);
        }
        if let Err(w) = self.checkpoints.set_status(job_id, JobStatus::Queued, true) {
            warn!(job_id, "{}", w);
        }

        info!(job_id, edited_fields = edits.len(), "Review approved");
        Ok(structure)
    }

    /// Rejects the detected structure. The job becomes resumable from stage 2.
    pub fn deny(&self, job_id: &str, reason: &str) -> Result<(), PipelineError> {
        self.paused_job(job_id)?;

        let message = format!("Review denied: {}", reason);
        if let Err(w) = self
            .checkpoints
            .mark_error(job_id, Stage::DetectStructure, &message)
        {
            warn!(job_id, "{}", w);
        }
        self.progress.notify_status(
            job_id,
            JobStatus::Error,
            overall_percent(Stage::DetectStructure, 100),
            &message,
        );

        info!(job_id, "Review denied");
        Ok(())
    }

    fn paused_job(&self, job_id: &str) -> Result<UploadJob, PipelineError> {
        let job = job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| StateConflictError::JobNotFound(job_id.to_string()))?;
        if job.status != JobStatus::PausedForReview {
            return Err(StateConflictError::NotPausedForReview {
                job_id: job_id.to_string(),
                status: job.status,
            }
            .into());
        }
        Ok(job)
    }
}
