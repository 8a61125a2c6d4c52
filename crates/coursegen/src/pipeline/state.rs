//! Pipeline control flow as an explicit state machine.

use crate::job::{JobStatus, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running(Stage),
    PausedForReview,
    Finalizing,
    Complete,
    Failed(Stage),
}

impl PipelineState {
    /// The state after the current step succeeded.
    pub fn after_success(self, require_review: bool) -> Self {
        match self {
            PipelineState::Running(Stage::DetectStructure) if require_review => {
                PipelineState::PausedForReview
            }
            PipelineState::Running(stage) => match stage.next() {
                Some(next) => PipelineState::Running(next),
                None => PipelineState::Finalizing,
            },
            PipelineState::Finalizing => PipelineState::Complete,
            other => other,
        }
    }

    /// The state after the current step failed. Finalize failures are
    /// retried as part of stage 4.
    pub fn after_failure(self) -> Self {
        match self {
            PipelineState::Running(stage) => PipelineState::Failed(stage),
            PipelineState::Finalizing => PipelineState::Failed(Stage::GenerateContent),
            other => other,
        }
    }

    /// Continuation after a reviewer approved. Other states are unchanged.
    pub fn approve(self) -> Self {
        match self {
            PipelineState::PausedForReview => PipelineState::Running(Stage::AlignPhilosophy),
            other => other,
        }
    }

    /// Whether the run loop stops in this state.
    pub fn is_stopped(self) -> bool {
        matches!(
            self,
            PipelineState::PausedForReview | PipelineState::Complete | PipelineState::Failed(_)
        )
    }

    /// The job status this state is persisted as.
    pub fn job_status(self) -> JobStatus {
        match self {
            PipelineState::Running(_) | PipelineState::Finalizing => JobStatus::Processing,
            PipelineState::PausedForReview => JobStatus::PausedForReview,
            PipelineState::Complete => JobStatus::Complete,
            PipelineState::Failed(_) => JobStatus::Error,
        }
    }
}
