//! The four-stage ingestion pipeline and everything that keeps it resumable.

pub mod checkpoint;
pub mod chunker;
pub mod config;
pub mod context;
pub mod detector;
pub mod merge;
pub mod orchestrator;
pub mod outcome;
pub mod progress;
pub mod review;
pub mod state;

pub use checkpoint::CheckpointStore;
pub use chunker::{chunk_content, ContentChunk, DEFAULT_MAX_CHUNK_CHARS};
pub use config::{PipelineConfig, ProcessOptions};
pub use context::RunContext;
pub use detector::{ChunkingSummary, DetectionOutcome, ParallelStructureDetector};
pub use merge::{merge_chunk_results, ChunkRemap, IdRemapTable, MergedStructure};
pub use orchestrator::{PipelineOrchestrator, SourceInput};
pub use outcome::{OutcomeMetadata, PipelineOutcome, StageFailure, StageOutputs};
pub use progress::{overall_percent, ProgressTracker};
pub use review::{ReviewGate, ReviewPreview};
pub use state::PipelineState;
