//! Transformation client seam for stages 2–4.
//!
//! Model-backed clients live in the embedding application. The crate ships
//! [`HeuristicTransformer`], a deterministic client used offline and in tests.

pub mod heuristic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::TransformDefaults;
use crate::content::{AlignedContent, GeneratedContent, Section, StructureResult};
use crate::error::TransformError;

pub use heuristic::HeuristicTransformer;

/// Position of a chunk within a chunked detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkTag {
    /// 0-based.
    pub index: usize,
    pub total: usize,
}

/// Input to a single structure detection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRequest {
    pub text: String,
    pub sections: Vec<Section>,
    /// `None` on the single-call path.
    pub chunk: Option<ChunkTag>,
    pub title_hint: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformOptions {
    pub philosophy: Option<String>,
    pub audience: Option<String>,
    pub language: Option<String>,
}

impl From<&TransformDefaults> for TransformOptions {
    fn from(defaults: &TransformDefaults) -> Self {
        Self {
            philosophy: defaults.philosophy.clone(),
            audience: defaults.audience.clone(),
            language: defaults.language.clone(),
        }
    }
}

#[async_trait]
pub trait AiTransformationClient: Send + Sync {
    /// Detects course structure. IDs in the result are local to the request.
    async fn detect_structure(
        &self,
        request: StructureRequest,
    ) -> Result<StructureResult, TransformError>;

    async fn align_philosophy(
        &self,
        structure: &StructureResult,
        options: &TransformOptions,
    ) -> Result<AlignedContent, TransformError>;

    async fn generate_content(
        &self,
        aligned: &AlignedContent,
        options: &TransformOptions,
    ) -> Result<GeneratedContent, TransformError>;
}
