//! The upload job record and the enums that describe its lifecycle.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the four sequential pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    DetectStructure,
    AlignPhilosophy,
    GenerateContent,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Parse,
        Stage::DetectStructure,
        Stage::AlignPhilosophy,
        Stage::GenerateContent,
    ];

    /// 1-based stage number as stored in `current_stage`.
    pub fn number(self) -> u8 {
        match self {
            Stage::Parse => 1,
            Stage::DetectStructure => 2,
            Stage::AlignPhilosophy => 3,
            Stage::GenerateContent => 4,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Stage::Parse),
            2 => Some(Stage::DetectStructure),
            3 => Some(Stage::AlignPhilosophy),
            4 => Some(Stage::GenerateContent),
            _ => None,
        }
    }

    pub fn next(self) -> Option<Self> {
        Stage::from_number(self.number() + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.number().checked_sub(1).and_then(Stage::from_number)
    }

    /// Display name shown to pollers in `current_stage_name`.
    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Parse => "Parsing source",
            Stage::DetectStructure => "Detecting structure",
            Stage::AlignPhilosophy => "Aligning with philosophy",
            Stage::GenerateContent => "Generating content",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Control status of an upload job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    PausedForReview,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::PausedForReview => "paused_for_review",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown job status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "paused_for_review" => Ok(JobStatus::PausedForReview),
            "complete" => Ok(JobStatus::Complete),
            "error" => Ok(JobStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Kind of uploaded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Pdf,
    Docx,
    CoursePackage,
    Text,
    Markdown,
    /// A bare topic string instead of a document.
    Topic,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Docx => "docx",
            SourceType::CoursePackage => "course_package",
            SourceType::Text => "text",
            SourceType::Markdown => "markdown",
            SourceType::Topic => "topic",
        }
    }

    /// Detects the source type from a filename using its MIME type.
    /// Returns `None` for unknown extensions.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let path = Path::new(filename);
        // Markdown MIME registration varies between platforms' tables.
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown") {
                return Some(SourceType::Markdown);
            }
        }
        let mime = mime_guess::from_path(path).first()?;
        match mime.essence_str() {
            "application/pdf" => Some(SourceType::Pdf),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(SourceType::Docx)
            }
            "application/zip" | "application/x-zip-compressed" => Some(SourceType::CoursePackage),
            "text/markdown" | "text/x-markdown" => Some(SourceType::Markdown),
            "text/plain" => Some(SourceType::Text),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown source type '{0}'")]
pub struct UnknownSourceType(pub String);

impl FromStr for SourceType {
    type Err = UnknownSourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(SourceType::Pdf),
            "docx" => Ok(SourceType::Docx),
            "course_package" | "scorm" | "zip" => Ok(SourceType::CoursePackage),
            "text" | "txt" | "plain" => Ok(SourceType::Text),
            "markdown" | "md" => Ok(SourceType::Markdown),
            "topic" => Ok(SourceType::Topic),
            other => Err(UnknownSourceType(other.to_string())),
        }
    }
}

/// The persisted upload job. Mutated only through [`crate::db::job_repo`].
#[derive(Debug, Clone, PartialEq)]
pub struct UploadJob {
    pub id: String,
    pub source_type: SourceType,
    pub original_filename: String,
    pub status: JobStatus,
    pub current_stage: Stage,
    pub can_resume: bool,
    pub resume_from_stage: Option<Stage>,
    pub raw_content: Option<String>,
    pub structured_content: Option<String>,
    pub aligned_content: Option<String>,
    pub generated_content: Option<String>,
    pub stage_1_completed_at: Option<DateTime<Utc>>,
    pub stage_2_completed_at: Option<DateTime<Utc>>,
    pub stage_3_completed_at: Option<DateTime<Utc>>,
    pub stage_4_completed_at: Option<DateTime<Utc>>,
    pub progress_percent: u8,
    pub current_stage_name: Option<String>,
    pub current_item: Option<String>,
    pub error_message: Option<String>,
    pub created_course_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadJob {
    /// A freshly queued job, as created at upload time.
    pub fn new(source_type: SourceType, original_filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_type,
            original_filename: original_filename.into(),
            status: JobStatus::Queued,
            current_stage: Stage::Parse,
            can_resume: false,
            resume_from_stage: None,
            raw_content: None,
            structured_content: None,
            aligned_content: None,
            generated_content: None,
            stage_1_completed_at: None,
            stage_2_completed_at: None,
            stage_3_completed_at: None,
            stage_4_completed_at: None,
            progress_percent: 0,
            current_stage_name: None,
            current_item: None,
            error_message: None,
            created_course_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage_output(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Parse => self.raw_content.as_deref(),
            Stage::DetectStructure => self.structured_content.as_deref(),
            Stage::AlignPhilosophy => self.aligned_content.as_deref(),
            Stage::GenerateContent => self.generated_content.as_deref(),
        }
    }

    pub fn set_stage_output(&mut self, stage: Stage, output: String) {
        let slot = match stage {
            Stage::Parse => &mut self.raw_content,
            Stage::DetectStructure => &mut self.structured_content,
            Stage::AlignPhilosophy => &mut self.aligned_content,
            Stage::GenerateContent => &mut self.generated_content,
        };
        *slot = Some(output);
    }

    pub fn stage_completed_at(&self, stage: Stage) -> Option<DateTime<Utc>> {
        match stage {
            Stage::Parse => self.stage_1_completed_at,
            Stage::DetectStructure => self.stage_2_completed_at,
            Stage::AlignPhilosophy => self.stage_3_completed_at,
            Stage::GenerateContent => self.stage_4_completed_at,
        }
    }

    pub fn set_stage_completed_at(&mut self, stage: Stage, at: DateTime<Utc>) {
        let slot = match stage {
            Stage::Parse => &mut self.stage_1_completed_at,
            Stage::DetectStructure => &mut self.stage_2_completed_at,
            Stage::AlignPhilosophy => &mut self.stage_3_completed_at,
            Stage::GenerateContent => &mut self.stage_4_completed_at,
        };
        *slot = Some(at);
    }

    /// Highest stage with a completion timestamp.
    pub fn last_completed_stage(&self) -> Option<Stage> {
        Stage::ALL
            .iter()
            .rev()
            .copied()
            .find(|s| self.stage_completed_at(*s).is_some())
    }
}
