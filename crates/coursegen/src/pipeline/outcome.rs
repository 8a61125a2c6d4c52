//! The result handed back to callers of the orchestrator.

use serde::Serialize;

use crate::content::{AlignedContent, CoursePreview, GeneratedContent, ParsedContent, StructureResult};
use crate::job::{JobStatus, Stage, UploadJob};

use super::context::RunContext;
use super::detector::ChunkingSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    /// Stable error class, e.g. `structure_detection_error`.
    pub kind: String,
    pub message: String,
}

/// Stage outputs available at the end of a run, in-memory or from checkpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageOutputs {
    pub parsed: Option<ParsedContent>,
    pub structure: Option<StructureResult>,
    pub aligned: Option<AlignedContent>,
    pub generated: Option<GeneratedContent>,
}

impl StageOutputs {
    pub fn completed(&self) -> Vec<Stage> {
        let present = [
            self.parsed.is_some(),
            self.structure.is_some(),
            self.aligned.is_some(),
            self.generated.is_some(),
        ];
        Stage::ALL
            .iter()
            .zip(present)
            .filter_map(|(stage, p)| p.then_some(*stage))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OutcomeMetadata {
    pub job_id: String,
    pub status: JobStatus,
    pub can_resume: bool,
    pub last_completed_stage: Option<Stage>,
    pub resume_from_stage: Option<Stage>,
    pub course_id: Option<String>,
    pub chunking: Option<ChunkingSummary>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub preview: Option<CoursePreview>,
    pub error: Option<StageFailure>,
    pub stages: StageOutputs,
    pub metadata: OutcomeMetadata,
}

impl PipelineOutcome {
    pub fn is_paused(&self) -> bool {
        self.metadata.status == JobStatus::PausedForReview
    }

    /// Builds the outcome from the run context and the job as last persisted.
    pub(crate) fn build(
        ctx: RunContext,
        job: &UploadJob,
        preview: Option<CoursePreview>,
        error: Option<StageFailure>,
    ) -> Self {
        Self {
            success: error.is_none(),
            preview,
            error,
            metadata: OutcomeMetadata {
                job_id: ctx.job_id,
                status: job.status,
                can_resume: job.can_resume,
                last_completed_stage: job.last_completed_stage(),
                resume_from_stage: job.resume_from_stage,
                course_id: ctx.course_id.or_else(|| job.created_course_id.clone()),
                chunking: ctx.chunking,
                warnings: ctx.warnings,
            },
            stages: StageOutputs {
                parsed: ctx.parsed,
                structure: ctx.structure,
                aligned: ctx.aligned,
                generated: ctx.generated,
            },
        }
    }
}
