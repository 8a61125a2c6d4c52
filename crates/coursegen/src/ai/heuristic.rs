//! Deterministic transformer driven by section tags instead of a model.

use async_trait::async_trait;

use crate::ai::{AiTransformationClient, StructureRequest, TransformOptions};
use crate::content::{
    AlignedContent, CourseInfo, GeneratedContent, GeneratedLesson, GeneratedModule, GeneratedTask,
    LessonDraft, ModuleDraft, SectionKind, StructureResult, TaskDraft,
};
use crate::error::TransformError;

const DESCRIPTION_CHARS: usize = 200;
const DEFAULT_TASK_POINTS: u32 = 10;
const UNTITLED: &str = "Untitled course";

#[derive(Debug, Clone, Default)]
pub struct HeuristicTransformer;

impl HeuristicTransformer {
    pub fn new() -> Self {
        Self
    }
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(DESCRIPTION_CHARS) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn or_untitled(title: &str, fallback: &str) -> String {
    if title.trim().is_empty() {
        fallback.to_string()
    } else {
        title.trim().to_string()
    }
}

fn detect(request: &StructureRequest) -> StructureResult {
    let mut result = StructureResult::default();
    let mut current_module: Option<String> = None;
    let mut current_lesson: Option<String> = None;

    for section in &request.sections {
        match section.kind {
            SectionKind::Module => {
                let id = format!("module_{}", result.modules.len() + 1);
                result.modules.push(ModuleDraft {
                    id: id.clone(),
                    title: or_untitled(&section.title, "Module"),
                    description: excerpt(&section.content),
                });
                current_module = Some(id);
                current_lesson = None;
            }
            SectionKind::Lesson => {
                let id = format!("lesson_{}", result.lessons.len() + 1);
                result.lessons.push(LessonDraft {
                    id: id.clone(),
                    parent_module: current_module.clone(),
                    title: or_untitled(&section.title, "Lesson"),
                    summary: excerpt(&section.content),
                });
                current_lesson = Some(id);
            }
            SectionKind::Section | SectionKind::Other => match &current_lesson {
                Some(lesson) => result.tasks.push(TaskDraft {
                    id: format!("task_{}", result.tasks.len() + 1),
                    parent_lesson: Some(lesson.clone()),
                    title: or_untitled(&section.title, "Practice"),
                    description: excerpt(&section.content),
                }),
                None => result.lessons.push(LessonDraft {
                    id: format!("lesson_{}", result.lessons.len() + 1),
                    parent_module: current_module.clone(),
                    title: or_untitled(&section.title, "Overview"),
                    summary: excerpt(&section.content),
                }),
            },
        }
    }

    if result.lessons.is_empty() && result.modules.is_empty() {
        result.lessons.push(LessonDraft {
            id: "lesson_1".to_string(),
            parent_module: None,
            title: "Overview".to_string(),
            summary: excerpt(&request.text),
        });
    }

    // Loose lessons get a module of their own.
    if result.lessons.iter().any(|l| l.parent_module.is_none()) {
        let id = format!("module_{}", result.modules.len() + 1);
        for lesson in result.lessons.iter_mut().filter(|l| l.parent_module.is_none()) {
            lesson.parent_module = Some(id.clone());
        }
        result.modules.insert(
            0,
            ModuleDraft {
                id,
                title: "Introduction".to_string(),
                description: String::new(),
            },
        );
    }

    // Only the first chunk (or a single call) names the course.
    let names_course = request.chunk.map_or(true, |c| c.index == 0);
    if names_course {
        let title = request
            .title_hint
            .clone()
            .or_else(|| result.modules.iter().find(|m| m.title != "Introduction").map(|m| m.title.clone()))
            .unwrap_or_else(|| UNTITLED.to_string());
        result.course = CourseInfo {
            title,
            description: excerpt(&request.text),
        };
    }

    result
}

#[async_trait]
impl AiTransformationClient for HeuristicTransformer {
    async fn detect_structure(
        &self,
        request: StructureRequest,
    ) -> Result<StructureResult, TransformError> {
        if request.text.trim().is_empty() && request.sections.is_empty() {
            return Err(TransformError::InvalidResponse(
                "nothing to detect structure from".to_string(),
            ));
        }
        Ok(detect(&request))
    }

    async fn align_philosophy(
        &self,
        structure: &StructureResult,
        options: &TransformOptions,
    ) -> Result<AlignedContent, TransformError> {
        let mut notes = Vec::new();
        if let Some(philosophy) = &options.philosophy {
            notes.push(format!(
                "Applied '{}' across {} modules",
                philosophy,
                structure.modules.len()
            ));
        }
        for lesson in &structure.lessons {
            if !structure
                .tasks
                .iter()
                .any(|t| t.parent_lesson.as_deref() == Some(lesson.id.as_str()))
            {
                notes.push(format!("Lesson '{}' has no practice task", lesson.title));
            }
        }

        Ok(AlignedContent {
            structure: structure.clone(),
            philosophy: options.philosophy.clone(),
            notes,
        })
    }

    async fn generate_content(
        &self,
        aligned: &AlignedContent,
        options: &TransformOptions,
    ) -> Result<GeneratedContent, TransformError> {
        let structure = &aligned.structure;
        let audience = options.audience.as_deref().unwrap_or("learners");

        let modules = structure
            .modules
            .iter()
            .map(|m| GeneratedModule {
                id: m.id.clone(),
                title: m.title.clone(),
                description: m.description.clone(),
            })
            .collect();

        let lessons = structure
            .lessons
            .iter()
            .map(|l| GeneratedLesson {
                id: l.id.clone(),
                parent_module: l.parent_module.clone(),
                title: l.title.clone(),
                body: if l.summary.is_empty() {
                    format!("{} for {}.", l.title, audience)
                } else {
                    l.summary.clone()
                },
            })
            .collect();

        let mut tasks: Vec<GeneratedTask> = structure
            .tasks
            .iter()
            .map(|t| GeneratedTask {
                id: t.id.clone(),
                parent_lesson: t.parent_lesson.clone(),
                title: t.title.clone(),
                instructions: if t.description.is_empty() {
                    format!("Complete: {}", t.title)
                } else {
                    t.description.clone()
                },
                points: DEFAULT_TASK_POINTS,
            })
            .collect();

        for lesson in &structure.lessons {
            let has_task = tasks
                .iter()
                .any(|t| t.parent_lesson.as_deref() == Some(lesson.id.as_str()));
            if !has_task {
                tasks.push(GeneratedTask {
                    id: format!("{}_practice", lesson.id),
                    parent_lesson: Some(lesson.id.clone()),
                    title: format!("Reflect on {}", lesson.title),
                    instructions: format!("Summarize the key ideas of '{}'.", lesson.title),
                    points: DEFAULT_TASK_POINTS,
                });
            }
        }

        Ok(GeneratedContent {
            course: structure.course.clone(),
            modules,
            lessons,
            tasks,
        })
    }
}
