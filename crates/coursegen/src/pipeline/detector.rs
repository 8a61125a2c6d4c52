//! Stage 2: structure detection, chunked and run concurrently for large inputs.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ai::{AiTransformationClient, ChunkTag, StructureRequest};
use crate::content::{ParsedContent, StructureResult};
use crate::error::{StructureDetectionError, TransformError};
use crate::job::Stage;

use super::chunker::{chunk_content, ContentChunk};
use super::merge::{merge_chunk_results, IdRemapTable};
use super::progress::ProgressTracker;

/// Within-stage progress reserved for chunk completions (10% → 90%).
const CHUNK_PROGRESS_START: usize = 10;
const CHUNK_PROGRESS_SPAN: usize = 80;

#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub structure: StructureResult,
    /// Set only when more than one chunk was merged.
    pub remap: Option<IdRemapTable>,
    pub total_chunks: usize,
    /// 0-based indices of chunks that failed or timed out.
    pub failed_chunks: Vec<usize>,
}

/// Chunking facts surfaced in the pipeline outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkingSummary {
    pub total_chunks: usize,
    pub failed_chunks: Vec<usize>,
}

impl DetectionOutcome {
    pub fn is_degraded(&self) -> bool {
        !self.failed_chunks.is_empty()
    }

    pub fn summary(&self) -> ChunkingSummary {
        ChunkingSummary {
            total_chunks: self.total_chunks,
            failed_chunks: self.failed_chunks.clone(),
        }
    }
}

pub struct ParallelStructureDetector {
    client: Arc<dyn AiTransformationClient>,
    max_chunk_chars: usize,
    max_concurrency: usize,
    chunk_timeout: Duration,
}

impl ParallelStructureDetector {
    pub fn new(
        client: Arc<dyn AiTransformationClient>,
        max_chunk_chars: usize,
        max_concurrency: usize,
        chunk_timeout: Duration,
    ) -> Self {
        Self {
            client,
            max_chunk_chars,
            max_concurrency: max_concurrency.max(1),
            chunk_timeout,
        }
    }

    pub async fn detect_chunked(
        &self,
        parsed: &ParsedContent,
        job_id: &str,
        progress: &ProgressTracker,
    ) -> Result<DetectionOutcome, StructureDetectionError> {
        let chunks = chunk_content(parsed, self.max_chunk_chars);
        let title_hint = parsed.title_hint().map(str::to_string);

        if chunks.len() <= 1 {
            debug!(job_id, "Single chunk, detecting structure directly");
            let request = StructureRequest {
                text: parsed.raw_text.clone(),
                sections: parsed.sections.clone(),
                chunk: None,
                title_hint,
            };
            let structure = self.client.detect_structure(request).await?;
            return Ok(DetectionOutcome {
                structure,
                remap: None,
                total_chunks: 1,
                failed_chunks: Vec::new(),
            });
        }

        self.detect_parallel(chunks, title_hint, job_id, progress)
            .await
    }

    async fn detect_parallel(
        &self,
        chunks: Vec<ContentChunk>,
        title_hint: Option<String>,
        job_id: &str,
        progress: &ProgressTracker,
    ) -> Result<DetectionOutcome, StructureDetectionError> {
        let total = chunks.len();
        let timeout = self.chunk_timeout;
        let client = &self.client;

        debug!(
            job_id,
            total_chunks = total,
            concurrency = self.max_concurrency,
            "Detecting structure in parallel"
        );

        let mut pending = stream::iter(chunks.into_iter().enumerate().map(|(index, chunk)| {
            let request = StructureRequest {
                text: chunk.text,
                sections: chunk.sections,
                chunk: Some(ChunkTag { index, total }),
                title_hint: title_hint.clone(),
            };
            async move {
                let result = match tokio::time::timeout(timeout, client.detect_structure(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransformError::Timeout { after: timeout }),
                };
                (index, result)
            }
        }))
        .buffer_unordered(self.max_concurrency);

        let mut completed = 0usize;
        let mut succeeded: Vec<(usize, StructureResult)> = Vec::with_capacity(total);
        let mut failed_chunks = Vec::new();
        let mut last_error: Option<TransformError> = None;

        while let Some((index, result)) = pending.next().await {
            completed += 1;
            match result {
                Ok(structure) => succeeded.push((index, structure)),
                Err(e) => {
                    warn!(job_id, chunk = index, error = %e, "Chunk structure detection failed");
                    failed_chunks.push(index);
                    last_error = Some(e);
                }
            }

            let percent = CHUNK_PROGRESS_START + completed * CHUNK_PROGRESS_SPAN / total;
            let label = format!("Processed chunk {} of {}", completed, total);
            if let Err(w) = progress.update(job_id, Stage::DetectStructure, percent as u8, &label) {
                warn!(job_id, "{}", w);
            }
        }

        if succeeded.is_empty() {
            return Err(StructureDetectionError::AllChunksFailed {
                total,
                last_error: last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no result".to_string()),
            });
        }

        failed_chunks.sort_unstable();
        let merged = merge_chunk_results(succeeded);

        Ok(DetectionOutcome {
            structure: merged.structure,
            remap: Some(merged.remap),
            total_chunks: total,
            failed_chunks,
        })
    }
}
