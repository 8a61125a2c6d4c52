//! Best-effort progress reporting: persisted for pollers, broadcast for subscribers.

use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::db::{job_repo, Database};
use crate::error::PersistenceWarning;
use crate::job::{JobStatus, Stage};

const STAGE_WEIGHT: u32 = 25;

/// Overall progress: each stage owns an equal quarter.
pub fn overall_percent(stage: Stage, percent_within_stage: u8) -> u8 {
    let within = u32::from(percent_within_stage.min(100));
    let base = u32::from(stage.number() - 1) * STAGE_WEIGHT;
    (base + within * STAGE_WEIGHT / 100) as u8
}

#[derive(Clone)]
pub struct ProgressTracker {
    db: Database,
    broadcaster: Option<JobProgressBroadcaster>,
}

impl ProgressTracker {
    pub fn new(db: Database, broadcaster: Option<JobProgressBroadcaster>) -> Self {
        Self { db, broadcaster }
    }

    /// Records progress and returns the overall percentage written.
    pub fn update(
        &self,
        job_id: &str,
        stage: Stage,
        percent_within_stage: u8,
        label: &str,
    ) -> Result<u8, PersistenceWarning> {
        let overall = overall_percent(stage, percent_within_stage);

        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.send(JobProgressEvent::progress(job_id, stage, overall, label));
        }

        job_repo::update_progress(&self.db, job_id, overall, stage.display_name(), label)
            .map_err(|source| PersistenceWarning::Progress {
                job_id: job_id.to_string(),
                source,
            })?;

        Ok(overall)
    }

    /// Publishes a status change to subscribers. The job record is updated
    /// by whoever changed the status.
    pub fn notify_status(&self, job_id: &str, status: JobStatus, percent: u8, message: &str) {
        if let Some(broadcaster) = &self.broadcaster {
            broadcaster.send(JobProgressEvent::status(job_id, status, percent, message));
        }
    }
}
