//! Job progress broadcaster for real-time pipeline status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::job::{JobStatus, Stage};

/// Progress event for a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobProgressEvent {
    pub job_id: String,
    /// Stage being executed; `None` for status-only events such as finalize.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// Display name of the stage or activity.
    pub stage_name: String,
    /// Overall progress, 0–100.
    pub progress_percent: u8,
    /// Human-readable message describing current activity.
    pub item: String,
    pub status: JobStatus,
    pub timestamp: DateTime<Utc>,
}

impl JobProgressEvent {
    /// A progress event emitted while a stage runs.
    pub fn progress(job_id: &str, stage: Stage, progress_percent: u8, item: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: Some(stage),
            stage_name: stage.display_name().to_string(),
            progress_percent,
            item: item.to_string(),
            status: JobStatus::Processing,
            timestamp: Utc::now(),
        }
    }

    /// A status change (paused, complete, error).
    pub fn status(job_id: &str, status: JobStatus, progress_percent: u8, message: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            stage: None,
            stage_name: status.to_string(),
            progress_percent,
            item: message.to_string(),
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Broadcasts job progress events for streaming.
#[derive(Clone)]
pub struct JobProgressBroadcaster {
    sender: Arc<broadcast::Sender<JobProgressEvent>>,
}

impl JobProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: JobProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobProgressEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for JobProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}
