use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{error, info, info_span, warn, Instrument};

use crate::ai::AiTransformationClient;
use crate::broadcast::{JobProgressBroadcaster, JobProgressEvent};
use crate::config::IngestConfig;
use crate::content::{CoursePreview, GeneratedContent};
use crate::db::course_repo::{self, FinalizeResult};
use crate::db::{job_repo, Database};
use crate::error::{ParseError, PersistenceWarning, PipelineError, Result, StateConflictError};
use crate::job::{JobStatus, SourceType, Stage, UploadJob};
use crate::processor::ParserRegistry;
use crate::sanitize;

use super::checkpoint::CheckpointStore;
use super::config::{PipelineConfig, ProcessOptions};
use super::context::RunContext;
use super::detector::ParallelStructureDetector;
use super::outcome::{PipelineOutcome, StageFailure};
use super::progress::{overall_percent, ProgressTracker};
use super::review::ReviewGate;
use super::state::PipelineState;

const TOPIC_FILENAME: &str = "topic";

/// An uploaded source, as handed to [`PipelineOrchestrator::submit`].
#[derive(Debug, Clone)]
pub struct SourceInput {
    pub source_type: SourceType,
    pub filename: String,
    pub content: Vec<u8>,
}

impl SourceInput {
    pub fn new(source_type: SourceType, filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            source_type,
            filename: filename.into(),
            content,
        }
    }

    /// Infers the source type from the filename.
    pub fn from_upload(filename: &str, content: Vec<u8>) -> std::result::Result<Self, ParseError> {
        let source_type = SourceType::from_filename(filename)
            .ok_or_else(|| ParseError::UnsupportedFormat(sanitize::redact_filename(filename)))?;
        Ok(Self::new(source_type, filename, content))
    }

    pub fn topic(topic: &str) -> Self {
        Self::new(SourceType::Topic, TOPIC_FILENAME, topic.as_bytes().to_vec())
    }
}

/// Where a resumed job picks up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Stage(Stage),
    Finalize,
}

fn resume_point(job: &UploadJob) -> std::result::Result<ResumePoint, StateConflictError> {
    let resumable = job.can_resume
        && job.created_course_id.is_none()
        && !matches!(
            job.status,
            JobStatus::Complete | JobStatus::PausedForReview | JobStatus::Processing
        );
    if !resumable {
        return Err(StateConflictError::NotResumable {
            job_id: job.id.clone(),
            status: job.status,
        });
    }

    let stage = match job.resume_from_stage {
        Some(stage) => stage,
        None => match job.last_completed_stage() {
            Some(last) => match last.next() {
                Some(next) => next,
                None => return Ok(ResumePoint::Finalize),
            },
            None => Stage::Parse,
        },
    };

    // Stage 4 output exists; only finalize failed.
    if stage == Stage::GenerateContent && job.stage_4_completed_at.is_some() {
        return Ok(ResumePoint::Finalize);
    }
    Ok(ResumePoint::Stage(stage))
}

/// Guards direct entry into the pipeline. Paused jobs continue only through
/// `approve`; running or finalized jobs are never re-entered.
fn ensure_processable(job: &UploadJob) -> std::result::Result<(), StateConflictError> {
    let blocked = job.created_course_id.is_some()
        || matches!(
            job.status,
            JobStatus::Complete | JobStatus::PausedForReview | JobStatus::Processing
        );
    if blocked {
        return Err(StateConflictError::NotProcessable {
            job_id: job.id.clone(),
            status: job.status,
        });
    }
    Ok(())
}

fn record_warning(ctx: &mut RunContext, warning: PersistenceWarning) {
    warn!(job_id = %ctx.job_id, "{}", warning);
    ctx.warnings.push(warning.to_string());
}

pub struct PipelineOrchestrator {
    db: Database,
    parsers: ParserRegistry,
    client: Arc<dyn AiTransformationClient>,
    config: PipelineConfig,
    checkpoints: CheckpointStore,
    progress: ProgressTracker,
    detector: ParallelStructureDetector,
    review: ReviewGate,
    broadcaster: Option<JobProgressBroadcaster>,
}

impl PipelineOrchestrator {
    /// Builds the orchestrator from config, with a progress broadcaster.
    pub fn from_config(
        db: Database,
        config: &IngestConfig,
        client: Arc<dyn AiTransformationClient>,
    ) -> Self {
        let broadcaster = JobProgressBroadcaster::new(config.progress_channel_capacity);
        Self::assemble(
            db,
            ParserRegistry::new(),
            client,
            PipelineConfig::from_config(config),
            Some(broadcaster),
        )
    }

    /// Explicit constructor without broadcasting.
    pub fn new(
        db: Database,
        parsers: ParserRegistry,
        client: Arc<dyn AiTransformationClient>,
        config: PipelineConfig,
    ) -> Self {
        Self::assemble(db, parsers, client, config, None)
    }

    pub fn with_broadcaster(
        db: Database,
        parsers: ParserRegistry,
        client: Arc<dyn AiTransformationClient>,
        config: PipelineConfig,
        broadcaster: JobProgressBroadcaster,
    ) -> Self {
        Self::assemble(db, parsers, client, config, Some(broadcaster))
    }

    fn assemble(
        db: Database,
        parsers: ParserRegistry,
        client: Arc<dyn AiTransformationClient>,
        config: PipelineConfig,
        broadcaster: Option<JobProgressBroadcaster>,
    ) -> Self {
        let checkpoints = CheckpointStore::new(db.clone());
        let progress = ProgressTracker::new(db.clone(), broadcaster.clone());
        let detector = ParallelStructureDetector::new(
            Arc::clone(&client),
            config.max_chunk_chars,
            config.max_concurrent_chunks,
            config.chunk_timeout,
        );
        let review = ReviewGate::new(db.clone(), checkpoints.clone(), progress.clone());

        Self {
            db,
            parsers,
            client,
            config,
            checkpoints,
            progress,
            detector,
            review,
            broadcaster,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Options derived from the pipeline config.
    pub fn default_options(&self) -> ProcessOptions {
        ProcessOptions::from_config(&self.config)
    }

    /// Subscribes to live progress events, if a broadcaster is configured.
    pub fn subscribe(&self) -> Option<broadcast::Receiver<JobProgressEvent>> {
        self.broadcaster.as_ref().map(JobProgressBroadcaster::subscribe)
    }

    pub fn job(&self, job_id: &str) -> Result<UploadJob> {
        Ok(job_repo::find_by_id(&self.db, job_id)?
            .ok_or_else(|| StateConflictError::JobNotFound(job_id.to_string()))?)
    }

    /// Creates a queued job for `source` and runs it from stage 1.
    pub async fn submit(&self, source: SourceInput, options: &ProcessOptions) -> Result<PipelineOutcome> {
        let job = UploadJob::new(source.source_type, source.filename);
        job_repo::insert(&self.db, &job)?;
        info!(job_id = %job.id, source_type = %job.source_type, "Job submitted");

        self.process(&job.id, Some(source.content), options, Stage::Parse)
            .await
    }

    /// Runs the pipeline for an existing job starting at `resume_from`.
    ///
    /// Earlier stage outputs come from checkpoints. `source` is only read by
    /// stage 1 and is dropped as soon as parsing finishes.
    pub async fn process(
        &self,
        job_id: &str,
        source: Option<Vec<u8>>,
        options: &ProcessOptions,
        resume_from: Stage,
    ) -> Result<PipelineOutcome> {
        let job = self.job(job_id)?;
        ensure_processable(&job)?;
        let ctx = RunContext::new(job_id, source);
        self.run(job, ctx, options, PipelineState::Running(resume_from))
            .await
    }

    /// Retries a failed job from its recorded resume stage.
    pub async fn resume(&self, job_id: &str, options: &ProcessOptions) -> Result<PipelineOutcome> {
        self.resume_inner(job_id, None, options).await
    }

    /// Like [`resume`](Self::resume), supplying the source again for jobs
    /// that must re-run parsing. Ignored for later resume stages.
    pub async fn resume_with_source(
        &self,
        job_id: &str,
        content: Vec<u8>,
        options: &ProcessOptions,
    ) -> Result<PipelineOutcome> {
        self.resume_inner(job_id, Some(content), options).await
    }

    async fn resume_inner(
        &self,
        job_id: &str,
        source: Option<Vec<u8>>,
        options: &ProcessOptions,
    ) -> Result<PipelineOutcome> {
        let job = self.job(job_id)?;
        let start = match resume_point(&job)? {
            ResumePoint::Finalize => PipelineState::Finalizing,
            ResumePoint::Stage(Stage::Parse) if source.is_none() => {
                return Err(StateConflictError::SourceReleased {
                    job_id: job_id.to_string(),
                }
                .into());
            }
            ResumePoint::Stage(stage) => PipelineState::Running(stage),
        };
        info!(job_id, ?start, "Resuming job");

        let ctx = RunContext::new(job_id, source);
        self.run(job, ctx, options, start).await
    }

    /// Approves a paused job and continues from stage 3 with the edited structure.
    pub async fn approve(
        &self,
        job_id: &str,
        edits: &Value,
        options: &ProcessOptions,
    ) -> Result<PipelineOutcome> {
        let structure = self.review.approve(job_id, edits)?;
        let job = self.job(job_id)?;

        let mut ctx = RunContext::new(job_id, None);
        ctx.structure = Some(structure);
        let start = PipelineState::PausedForReview.approve();

        self.run(job, ctx, options, start).await
    }

    pub fn deny(&self, job_id: &str, reason: &str) -> Result<()> {
        self.review.deny(job_id, reason)
    }

    /// Creates the course from the stage 4 checkpoint. Runs at most once per job.
    pub fn finalize(&self, job_id: &str) -> Result<FinalizeResult> {
        let job = self.job(job_id)?;
        if let Some(course_id) = &job.created_course_id {
            return Ok(FinalizeResult::AlreadyFinalized(course_id.clone()));
        }

        let generated: GeneratedContent = self.checkpoints.load(&job, Stage::GenerateContent)?;
        let result =
            course_repo::finalize_job(&self.db, job_id, &generated).map_err(PipelineError::Finalize)?;
        self.progress
            .notify_status(job_id, JobStatus::Complete, 100, "Course created");
        Ok(result)
    }

    async fn run(
        &self,
        job: UploadJob,
        ctx: RunContext,
        options: &ProcessOptions,
        start: PipelineState,
    ) -> Result<PipelineOutcome> {
        let span = info_span!("pipeline",
            job_id = %job.id,
            source_type = %job.source_type,
            filename = %sanitize::redact_filename(&job.original_filename),
        );
        self.drive(job, ctx, options, start).instrument(span).await
    }

    async fn drive(
        &self,
        job: UploadJob,
        mut ctx: RunContext,
        options: &ProcessOptions,
        start: PipelineState,
    ) -> Result<PipelineOutcome> {
        self.load_prior_output(&job, start, &mut ctx)?;
        if let Err(w) = self.checkpoints.begin_run(&job.id) {
            record_warning(&mut ctx, w);
        }

        let mut state = start;
        let mut failure: Option<StageFailure> = None;

        loop {
            state = match state {
                PipelineState::Running(stage) => {
                    self.report(&mut ctx, stage, 10, "Starting");
                    let stage_span =
                        info_span!("stage", stage = stage.number(), name = stage.display_name());
                    match self
                        .execute_stage(stage, &job, &mut ctx, options)
                        .instrument(stage_span)
                        .await
                    {
                        Ok(()) => {
                            let next = state.after_success(options.require_review);
                            // The review gate saves stage 2 and reports it complete itself.
                            if next != PipelineState::PausedForReview {
                                self.checkpoint(stage, &mut ctx);
                                self.report(&mut ctx, stage, 100, "Completed");
                            }
                            next
                        }
                        Err(err) => {
                            failure = Some(self.record_failure(&mut ctx, stage, &err));
                            state.after_failure()
                        }
                    }
                }
                PipelineState::Finalizing => match self.finalize_run(&mut ctx) {
                    Ok(()) => state.after_success(false),
                    Err(err) => {
                        failure =
                            Some(self.record_failure(&mut ctx, Stage::GenerateContent, &err));
                        state.after_failure()
                    }
                },
                PipelineState::PausedForReview => {
                    let (preview, warnings) = self.review.pause_for_review(
                        &ctx.job_id,
                        ctx.parsed()?,
                        ctx.structure()?,
                    );
                    for w in warnings {
                        record_warning(&mut ctx, w);
                    }
                    return Ok(self.conclude(ctx, job, state, Some(preview.course), None));
                }
                PipelineState::Complete => {
                    self.progress
                        .notify_status(&ctx.job_id, JobStatus::Complete, 100, "Course created");
                    info!(course_id = ctx.course_id.as_deref().unwrap_or(""), "Pipeline complete");
                    let preview = ctx.generated.as_ref().map(CoursePreview::from_generated);
                    return Ok(self.conclude(ctx, job, state, preview, None));
                }
                PipelineState::Failed(stage) => {
                    let failure = failure.take().unwrap_or_else(|| StageFailure {
                        stage,
                        kind: "unknown_error".to_string(),
                        message: "stage failed".to_string(),
                    });
                    return Ok(self.conclude(ctx, job, state, None, Some(failure)));
                }
            };
        }
    }

    async fn execute_stage(
        &self,
        stage: Stage,
        job: &UploadJob,
        ctx: &mut RunContext,
        options: &ProcessOptions,
    ) -> Result<()> {
        match stage {
            Stage::Parse => {
                let bytes = ctx.source.take().ok_or(ParseError::SourceReleased)?;
                let parsed = self
                    .parsers
                    .parse(&bytes, job.source_type, &job.original_filename);
                drop(bytes);
                let parsed = parsed?;
                info!(
                    sections = parsed.sections.len(),
                    chars = parsed.total_chars(),
                    "Parsed source"
                );
                ctx.parsed = Some(parsed);
            }
            Stage::DetectStructure => {
                let outcome = self
                    .detector
                    .detect_chunked(ctx.parsed()?, &ctx.job_id, &self.progress)
                    .await?;
                if outcome.is_degraded() {
                    warn!(
                        failed = ?outcome.failed_chunks,
                        total = outcome.total_chunks,
                        "Structure merged from partial chunk results"
                    );
                    ctx.warnings.push(format!(
                        "Structure detection failed for {} of {} chunks",
                        outcome.failed_chunks.len(),
                        outcome.total_chunks
                    ));
                }
                info!(
                    modules = outcome.structure.modules.len(),
                    lessons = outcome.structure.lessons.len(),
                    chunks = outcome.total_chunks,
                    "Detected structure"
                );
                ctx.chunking = Some(outcome.summary());
                ctx.structure = Some(outcome.structure);
            }
            Stage::AlignPhilosophy => {
                let aligned = self
                    .client
                    .align_philosophy(ctx.structure()?, &options.transform)
                    .await
                    .map_err(PipelineError::PhilosophyAlignment)?;
                ctx.aligned = Some(aligned);
            }
            Stage::GenerateContent => {
                let generated = self
                    .client
                    .generate_content(ctx.aligned()?, &options.transform)
                    .await
                    .map_err(PipelineError::ContentGeneration)?;
                ctx.generated = Some(generated);
            }
        }
        Ok(())
    }

    fn finalize_run(&self, ctx: &mut RunContext) -> Result<()> {
        let result = course_repo::finalize_job(&self.db, &ctx.job_id, ctx.generated()?)
            .map_err(PipelineError::Finalize)?;
        if let FinalizeResult::AlreadyFinalized(id) = &result {
            info!(course_id = %id, "Job already finalized");
        }
        ctx.course_id = Some(result.course_id().to_string());
        Ok(())
    }

    /// Loads the checkpoint the starting state depends on, unless already in memory.
    fn load_prior_output(
        &self,
        job: &UploadJob,
        start: PipelineState,
        ctx: &mut RunContext,
    ) -> std::result::Result<(), StateConflictError> {
        let needed = match start {
            PipelineState::Running(stage) => stage.previous(),
            PipelineState::Finalizing => Some(Stage::GenerateContent),
            _ => None,
        };
        let Some(stage) = needed else {
            return Ok(());
        };
        if ctx.has_output(stage) {
            return Ok(());
        }

        match stage {
            Stage::Parse => ctx.parsed = Some(self.checkpoints.load(job, stage)?),
            Stage::DetectStructure => ctx.structure = Some(self.checkpoints.load(job, stage)?),
            Stage::AlignPhilosophy => ctx.aligned = Some(self.checkpoints.load(job, stage)?),
            Stage::GenerateContent => ctx.generated = Some(self.checkpoints.load(job, stage)?),
        }
        Ok(())
    }

    fn checkpoint(&self, stage: Stage, ctx: &mut RunContext) {
        let saved = match stage {
            Stage::Parse => ctx
                .parsed
                .as_ref()
                .map(|v| self.checkpoints.save(&ctx.job_id, stage, v)),
            Stage::DetectStructure => ctx
                .structure
                .as_ref()
                .map(|v| self.checkpoints.save(&ctx.job_id, stage, v)),
            Stage::AlignPhilosophy => ctx
                .aligned
                .as_ref()
                .map(|v| self.checkpoints.save(&ctx.job_id, stage, v)),
            Stage::GenerateContent => ctx
                .generated
                .as_ref()
                .map(|v| self.checkpoints.save(&ctx.job_id, stage, v)),
        };
        if let Some(Err(w)) = saved {
            record_warning(ctx, w);
        }
    }

    fn report(&self, ctx: &mut RunContext, stage: Stage, percent: u8, label: &str) {
        if let Err(w) = self.progress.update(&ctx.job_id, stage, percent, label) {
            record_warning(ctx, w);
        }
    }

    fn record_failure(&self, ctx: &mut RunContext, stage: Stage, err: &PipelineError) -> StageFailure {
        let message = err.to_string();
        error!(stage = stage.number(), kind = err.kind(), error = %message, "Stage failed");

        if let Err(w) = self.checkpoints.mark_error(&ctx.job_id, stage, &message) {
            record_warning(ctx, w);
        }
        self.progress.notify_status(
            &ctx.job_id,
            JobStatus::Error,
            overall_percent(stage, 0),
            &message,
        );

        StageFailure {
            stage,
            kind: err.kind().to_string(),
            message,
        }
    }

    fn conclude(
        &self,
        ctx: RunContext,
        mut job: UploadJob,
        state: PipelineState,
        preview: Option<CoursePreview>,
        failure: Option<StageFailure>,
    ) -> PipelineOutcome {
        let job = match job_repo::find_by_id(&self.db, &ctx.job_id) {
            Ok(Some(stored)) => stored,
            Ok(None) | Err(_) => {
                job.status = state.job_status();
                job
            }
        };
        PipelineOutcome::build(ctx, &job, preview, failure)
    }
}
