//! Durable per-stage outputs and the resumability fields that go with them.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::db::{job_repo, Database, DatabaseError};
use crate::error::{PersistenceWarning, StateConflictError};
use crate::job::{JobStatus, Stage, UploadJob};
use crate::sanitize;

#[derive(Clone)]
pub struct CheckpointStore {
    db: Database,
}

impl CheckpointStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Serializes and saves a stage output. NUL characters are removed first.
    pub fn save<T: Serialize>(
        &self,
        job_id: &str,
        stage: Stage,
        output: &T,
    ) -> Result<(), PersistenceWarning> {
        let mut value = serde_json::to_value(output)
            .map_err(|source| PersistenceWarning::Serialize { stage, source })?;
        sanitize::strip_nul_value(&mut value);
        let json = serde_json::to_string(&value)
            .map_err(|source| PersistenceWarning::Serialize { stage, source })?;
        self.write(job_id, stage, json)
    }

    /// Saves an already-serialized output. Valid JSON is cleaned of `\u0000`
    /// escapes as well as literal NULs.
    pub fn save_raw(&self, job_id: &str, stage: Stage, json: &str) -> Result<(), PersistenceWarning> {
        let cleaned = match serde_json::from_str::<Value>(json) {
            Ok(mut value) => {
                sanitize::strip_nul_value(&mut value);
                serde_json::to_string(&value)
                    .map_err(|source| PersistenceWarning::Serialize { stage, source })?
            }
            Err(_) => sanitize::strip_nul(json).into_owned(),
        };
        self.write(job_id, stage, cleaned)
    }

    fn write(&self, job_id: &str, stage: Stage, json: String) -> Result<(), PersistenceWarning> {
        let checkpoint_err = |source: DatabaseError| PersistenceWarning::Checkpoint {
            job_id: job_id.to_string(),
            stage,
            source,
        };

        let mut job = job_repo::find_by_id(&self.db, job_id)
            .map_err(checkpoint_err)?
            .ok_or_else(|| checkpoint_err(DatabaseError::JobNotFound(job_id.to_string())))?;

        if let Some(previous) = stage.previous() {
            if job.stage_completed_at(previous).is_none() {
                return Err(PersistenceWarning::OutOfOrder {
                    job_id: job_id.to_string(),
                    stage,
                    missing: previous,
                });
            }
        }

        let now = Utc::now();
        job.set_stage_output(stage, json);
        job.set_stage_completed_at(stage, now);
        job.current_stage = job.current_stage.max(stage);
        job.resume_from_stage = job.current_stage.next();
        job.updated_at = now;

        job_repo::update(&self.db, &job).map_err(checkpoint_err)?;

        tracing::debug!(job_id, stage = stage.number(), "Checkpoint saved");
        Ok(())
    }

    /// Reads and deserializes a persisted stage output.
    pub fn load<T: DeserializeOwned>(
        &self,
        job: &UploadJob,
        stage: Stage,
    ) -> Result<T, StateConflictError> {
        let raw = job
            .stage_output(stage)
            .ok_or_else(|| StateConflictError::MissingCheckpoint {
                job_id: job.id.clone(),
                stage,
            })?;
        serde_json::from_str(raw).map_err(|e| StateConflictError::CorruptCheckpoint {
            job_id: job.id.clone(),
            stage,
            reason: e.to_string(),
        })
    }

    /// Marks the job failed at `stage`; a resume retries that same stage.
    pub fn mark_error(
        &self,
        job_id: &str,
        stage: Stage,
        message: &str,
    ) -> Result<(), PersistenceWarning> {
        self.modify(job_id, |job| {
            job.status = JobStatus::Error;
            job.can_resume = true;
            job.resume_from_stage = Some(stage);
            job.error_message = Some(sanitize::strip_nul(message).into_owned());
        })
    }

    /// Marks the job as running. Clears any previous error message; a running
    /// job is not resumable until a stage fails again.
    pub fn begin_run(&self, job_id: &str) -> Result<(), PersistenceWarning> {
        self.modify(job_id, |job| {
            job.status = JobStatus::Processing;
            job.can_resume = false;
            job.error_message = None;
        })
    }

    pub fn set_status(
        &self,
        job_id: &str,
        status: JobStatus,
        can_resume: bool,
    ) -> Result<(), PersistenceWarning> {
        self.modify(job_id, |job| {
            job.status = status;
            job.can_resume = can_resume;
        })
    }

    fn modify<F>(&self, job_id: &str, f: F) -> Result<(), PersistenceWarning>
    where
        F: FnOnce(&mut UploadJob),
    {
        let status_err = |source: DatabaseError| PersistenceWarning::Status {
            job_id: job_id.to_string(),
            source,
        };

        let mut job = job_repo::find_by_id(&self.db, job_id)
            .map_err(status_err)?
            .ok_or_else(|| status_err(DatabaseError::JobNotFound(job_id.to_string())))?;
        f(&mut job);
        job.updated_at = Utc::now();
        job_repo::update(&self.db, &job).map_err(status_err)
    }
}
