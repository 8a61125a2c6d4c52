//! Test harness for isolated pipeline runs.
//!
//! Each `TestHarness` owns an in-memory database, a progress broadcaster and
//! an orchestrator whose transformation client and parser count their calls.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use coursegen::ai::{ChunkTag, StructureRequest};
use coursegen::content::AlignedContent;
use coursegen::db::{job_repo, Database};
use coursegen::processor::text::TextParser;
use coursegen::{
    AiTransformationClient, GeneratedContent, HeuristicTransformer, JobProgressBroadcaster,
    JobProgressEvent, ParseError, ParsedContent, ParserRegistry, PipelineConfig,
    PipelineOrchestrator, PipelineOutcome, ProcessOptions, SourceInput, SourceParser, SourceType,
    StructureResult, TransformError, TransformOptions, UploadJob,
};

/// Heuristic transformer with call counters and injectable failures.
#[derive(Default)]
pub struct ScriptedTransformer {
    inner: HeuristicTransformer,
    pub detect_calls: AtomicUsize,
    pub align_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    fail_detect: AtomicBool,
    fail_align: AtomicBool,
    fail_generate: AtomicBool,
    failing_chunks: Mutex<HashSet<usize>>,
    slow_chunks: Mutex<HashMap<usize, Duration>>,
    seen_chunks: Mutex<Vec<Option<ChunkTag>>>,
}

impl ScriptedTransformer {
    pub fn fail_detect(&self, fail: bool) {
        self.fail_detect.store(fail, Ordering::SeqCst);
    }

    pub fn fail_align(&self, fail: bool) {
        self.fail_align.store(fail, Ordering::SeqCst);
    }

    pub fn fail_generate(&self, fail: bool) {
        self.fail_generate.store(fail, Ordering::SeqCst);
    }

    pub fn fail_chunk(&self, index: usize) {
        self.failing_chunks.lock().unwrap().insert(index);
    }

    pub fn clear_chunk_failures(&self) {
        self.failing_chunks.lock().unwrap().clear();
    }

    /// Delays the detection call for chunk `index` by `delay`.
    pub fn delay_chunk(&self, index: usize, delay: Duration) {
        self.slow_chunks.lock().unwrap().insert(index, delay);
    }

    /// Chunk tags of every detection call, in call order.
    pub fn seen_chunks(&self) -> Vec<Option<ChunkTag>> {
        self.seen_chunks.lock().unwrap().clone()
    }

    pub fn detect_count(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    pub fn align_count(&self) -> usize {
        self.align_calls.load(Ordering::SeqCst)
    }

    pub fn generate_count(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiTransformationClient for ScriptedTransformer {
    async fn detect_structure(
        &self,
        request: StructureRequest,
    ) -> Result<StructureResult, TransformError> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_chunks.lock().unwrap().push(request.chunk);

        if self.fail_detect.load(Ordering::SeqCst) {
            return Err(TransformError::Unavailable("detection offline".into()));
        }
        if let Some(tag) = request.chunk {
            if self.failing_chunks.lock().unwrap().contains(&tag.index) {
                return Err(TransformError::Request(format!("chunk {} rejected", tag.index)));
            }
            let delay = self.slow_chunks.lock().unwrap().get(&tag.index).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }

        self.inner.detect_structure(request).await
    }

    async fn align_philosophy(
        &self,
        structure: &StructureResult,
        options: &TransformOptions,
    ) -> Result<AlignedContent, TransformError> {
        self.align_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_align.load(Ordering::SeqCst) {
            return Err(TransformError::Request("alignment rejected".into()));
        }
        self.inner.align_philosophy(structure, options).await
    }

    async fn generate_content(
        &self,
        aligned: &AlignedContent,
        options: &TransformOptions,
    ) -> Result<GeneratedContent, TransformError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(TransformError::Request("generation rejected".into()));
        }
        self.inner.generate_content(aligned, options).await
    }
}

/// Text parser that counts how often it runs.
struct CountingParser {
    inner: TextParser,
    calls: Arc<AtomicUsize>,
}

impl SourceParser for CountingParser {
    fn parse(
        &self,
        bytes: &[u8],
        source_type: SourceType,
        filename: &str,
    ) -> Result<ParsedContent, ParseError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.parse(bytes, source_type, filename)
    }

    fn supports(&self, source_type: SourceType) -> bool {
        self.inner.supports(source_type)
    }
}

/// Isolated pipeline environment for integration tests.
pub struct TestHarness {
    pub db: Database,
    pub client: Arc<ScriptedTransformer>,
    pub broadcaster: JobProgressBroadcaster,
    pub orchestrator: PipelineOrchestrator,
    parse_calls: Arc<AtomicUsize>,
}

impl TestHarness {
    /// Harness with default pipeline settings.
    pub fn new() -> Self {
        Self::with_config(PipelineConfig::default())
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let client = Arc::new(ScriptedTransformer::default());
        let broadcaster = JobProgressBroadcaster::new(256);
        let parse_calls = Arc::new(AtomicUsize::new(0));

        let mut parsers = ParserRegistry::new();
        parsers.register(Box::new(CountingParser {
            inner: TextParser::new(),
            calls: Arc::clone(&parse_calls),
        }));

        let orchestrator = PipelineOrchestrator::with_broadcaster(
            db.clone(),
            parsers,
            client.clone() as Arc<dyn AiTransformationClient>,
            config,
            broadcaster.clone(),
        );

        Self {
            db,
            client,
            broadcaster,
            orchestrator,
            parse_calls,
        }
    }

    pub fn options(&self) -> ProcessOptions {
        self.orchestrator.default_options()
    }

    pub fn parse_count(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<JobProgressEvent> {
        self.broadcaster.subscribe()
    }

    /// Submits `text` as a Markdown upload with default options.
    pub async fn submit_markdown(&self, text: &str) -> PipelineOutcome {
        self.submit_markdown_with(text, &self.options()).await
    }

    pub async fn submit_markdown_with(&self, text: &str, options: &ProcessOptions) -> PipelineOutcome {
        let source = SourceInput::new(SourceType::Markdown, "outline.md", text.as_bytes().to_vec());
        self.orchestrator
            .submit(source, options)
            .await
            .expect("submit failed")
    }

    pub async fn submit_text(&self, text: &str) -> PipelineOutcome {
        let source = SourceInput::new(SourceType::Text, "notes.txt", text.as_bytes().to_vec());
        self.orchestrator
            .submit(source, &self.options())
            .await
            .expect("submit failed")
    }

    /// Reloads a job from the database.
    pub fn job(&self, job_id: &str) -> UploadJob {
        job_repo::find_by_id(&self.db, job_id)
            .expect("Failed to load job")
            .expect("Job not found")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
