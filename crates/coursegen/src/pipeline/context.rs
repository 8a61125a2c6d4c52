use crate::content::{AlignedContent, GeneratedContent, ParsedContent, StructureResult};
use crate::error::StateConflictError;
use crate::job::Stage;

use super::detector::ChunkingSummary;

/// In-memory state of one pipeline run.
pub struct RunContext {
    pub job_id: String,

    // Taken and dropped by stage 1.
    pub source: Option<Vec<u8>>,

    // Stage outputs, produced in this run or loaded from checkpoints
    pub parsed: Option<ParsedContent>,
    pub structure: Option<StructureResult>,
    pub aligned: Option<AlignedContent>,
    pub generated: Option<GeneratedContent>,

    pub chunking: Option<ChunkingSummary>,
    pub course_id: Option<String>,

    // Non-fatal warnings
    pub warnings: Vec<String>,
}

impl RunContext {
    pub fn new(job_id: &str, source: Option<Vec<u8>>) -> Self {
        Self {
            job_id: job_id.to_string(),
            source,
            parsed: None,
            structure: None,
            aligned: None,
            generated: None,
            chunking: None,
            course_id: None,
            warnings: Vec::new(),
        }
    }

    pub fn has_output(&self, stage: Stage) -> bool {
        match stage {
            Stage::Parse => self.parsed.is_some(),
            Stage::DetectStructure => self.structure.is_some(),
            Stage::AlignPhilosophy => self.aligned.is_some(),
            Stage::GenerateContent => self.generated.is_some(),
        }
    }

    fn missing(&self, stage: Stage) -> StateConflictError {
        StateConflictError::MissingCheckpoint {
            job_id: self.job_id.clone(),
            stage,
        }
    }

    pub fn parsed(&self) -> Result<&ParsedContent, StateConflictError> {
        self.parsed.as_ref().ok_or_else(|| self.missing(Stage::Parse))
    }

    pub fn structure(&self) -> Result<&StructureResult, StateConflictError> {
        self.structure
            .as_ref()
            .ok_or_else(|| self.missing(Stage::DetectStructure))
    }

    pub fn aligned(&self) -> Result<&AlignedContent, StateConflictError> {
        self.aligned
            .as_ref()
            .ok_or_else(|| self.missing(Stage::AlignPhilosophy))
    }

    pub fn generated(&self) -> Result<&GeneratedContent, StateConflictError> {
        self.generated
            .as_ref()
            .ok_or_else(|| self.missing(Stage::GenerateContent))
    }
}
