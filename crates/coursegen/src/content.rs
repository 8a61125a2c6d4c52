//! Stage payloads: what each stage produces and the next one consumes.

use serde::{Deserialize, Serialize};

/// Structural tag attached to a parsed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Module,
    Lesson,
    #[default]
    Section,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub kind: SectionKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

impl Section {
    pub fn new(kind: SectionKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            content: content.into(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// Stage 1 output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedContent {
    pub raw_text: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ParsedContent {
    pub fn total_chars(&self) -> usize {
        self.sections.iter().map(Section::char_count).sum()
    }

    /// A title hint for the course, from parser metadata when available.
    pub fn title_hint(&self) -> Option<&str> {
        self.metadata
            .get("title")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourseInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDraft {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDraft {
    pub id: String,
    #[serde(default)]
    pub parent_module: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub id: String,
    #[serde(default)]
    pub parent_lesson: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// Stage 2 output: the detected course skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StructureResult {
    #[serde(default)]
    pub course: CourseInfo,
    #[serde(default)]
    pub modules: Vec<ModuleDraft>,
    #[serde(default)]
    pub lessons: Vec<LessonDraft>,
    #[serde(default)]
    pub tasks: Vec<TaskDraft>,
}

impl StructureResult {
    pub fn lessons_in<'a>(&'a self, module_id: &'a str) -> impl Iterator<Item = &'a LessonDraft> {
        self.lessons
            .iter()
            .filter(move |l| l.parent_module.as_deref() == Some(module_id))
    }
}

/// Stage 3 output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlignedContent {
    pub structure: StructureResult,
    #[serde(default)]
    pub philosophy: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedModule {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedLesson {
    pub id: String,
    #[serde(default)]
    pub parent_module: Option<String>,
    pub title: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTask {
    pub id: String,
    #[serde(default)]
    pub parent_lesson: Option<String>,
    pub title: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub points: u32,
}

/// Stage 4 output, turned into course entities by finalize.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedContent {
    #[serde(default)]
    pub course: CourseInfo,
    #[serde(default)]
    pub modules: Vec<GeneratedModule>,
    #[serde(default)]
    pub lessons: Vec<GeneratedLesson>,
    #[serde(default)]
    pub tasks: Vec<GeneratedTask>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModulePreview {
    pub id: String,
    pub title: String,
    pub lesson_count: usize,
}

/// Compact summary returned to callers instead of the full payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoursePreview {
    pub title: String,
    pub description: String,
    pub module_count: usize,
    pub lesson_count: usize,
    pub task_count: usize,
    pub modules: Vec<ModulePreview>,
}

impl CoursePreview {
    pub fn from_structure(structure: &StructureResult) -> Self {
        Self {
            title: structure.course.title.clone(),
            description: structure.course.description.clone(),
            module_count: structure.modules.len(),
            lesson_count: structure.lessons.len(),
            task_count: structure.tasks.len(),
            modules: structure
                .modules
                .iter()
                .map(|m| ModulePreview {
                    id: m.id.clone(),
                    title: m.title.clone(),
                    lesson_count: structure.lessons_in(&m.id).count(),
                })
                .collect(),
        }
    }

    pub fn from_generated(content: &GeneratedContent) -> Self {
        Self {
            title: content.course.title.clone(),
            description: content.course.description.clone(),
            module_count: content.modules.len(),
            lesson_count: content.lessons.len(),
            task_count: content.tasks.len(),
            modules: content
                .modules
                .iter()
                .map(|m| ModulePreview {
                    id: m.id.clone(),
                    title: m.title.clone(),
                    lesson_count: content
                        .lessons
                        .iter()
                        .filter(|l| l.parent_module.as_deref() == Some(m.id.as_str()))
                        .count(),
                })
                .collect(),
        }
    }
}
