pub mod ai;
pub mod broadcast;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod telemetry;

pub use ai::{AiTransformationClient, HeuristicTransformer, TransformOptions};
pub use broadcast::{JobProgressBroadcaster, JobProgressEvent};
pub use config::{load_config, IngestConfig};
pub use content::{CoursePreview, GeneratedContent, ParsedContent, StructureResult};
pub use db::Database;
pub use error::{
    ConfigError, ParseError, PersistenceWarning, PipelineError, Result, StateConflictError,
    StructureDetectionError, TransformError,
};
pub use job::{JobStatus, SourceType, Stage, UploadJob};
pub use pipeline::{PipelineConfig, PipelineOrchestrator, PipelineOutcome, ProcessOptions, SourceInput};
pub use processor::{ParserRegistry, SourceParser};
pub use telemetry::{init_tracing, LogFormat};
