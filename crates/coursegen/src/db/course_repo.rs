//! Course entity persistence. Finalize turns a job's generated content into rows here.

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use super::job_repo::format_timestamp;
use super::{Database, DatabaseError};
use crate::content::GeneratedContent;
use crate::job::JobStatus;

const UNTITLED_COURSE: &str = "Untitled course";

/// What [`finalize_job`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeResult {
    /// A new course was created with this ID.
    Created(String),
    /// The job already had a course; nothing was written.
    AlreadyFinalized(String),
}

impl FinalizeResult {
    pub fn course_id(&self) -> &str {
        match self {
            FinalizeResult::Created(id) | FinalizeResult::AlreadyFinalized(id) => id,
        }
    }
}

/// Row counts for a persisted course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub id: String,
    pub upload_job_id: String,
    pub title: String,
    pub module_count: usize,
    pub lesson_count: usize,
    pub task_count: usize,
}

/// Creates the course, its modules, lessons and tasks, and marks the job
/// complete, all in one transaction.
///
/// A job that already has `created_course_id` set is left untouched and the
/// existing ID is returned. Lessons or tasks whose parent reference does not
/// match a generated module or lesson are stored without a parent.
pub fn finalize_job(
    db: &Database,
    job_id: &str,
    content: &GeneratedContent,
) -> Result<FinalizeResult, DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;

        let existing: Option<Option<String>> = tx
            .query_row(
                "SELECT created_course_id FROM upload_jobs WHERE id = ?1",
                params![job_id],
                |row| row.get(0),
            )
            .optional()?;
        match existing {
            None => return Err(DatabaseError::JobNotFound(job_id.to_string())),
            Some(Some(course_id)) => return Ok(FinalizeResult::AlreadyFinalized(course_id)),
            Some(None) => {}
        }

        let course_id = uuid::Uuid::new_v4().to_string();
        let now = format_timestamp(Utc::now());
        let title = if content.course.title.trim().is_empty() {
            UNTITLED_COURSE
        } else {
            content.course.title.as_str()
        };

        tx.execute(
            "INSERT INTO courses (id, upload_job_id, title, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![course_id, job_id, title, content.course.description, now],
        )?;

        let mut module_rows: HashMap<&str, i64> = HashMap::new();
        for (position, module) in content.modules.iter().enumerate() {
            tx.execute(
                "INSERT INTO course_modules (course_id, local_id, position, title, description)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    course_id,
                    module.id,
                    position as i64,
                    module.title,
                    module.description
                ],
            )?;
            module_rows
                .entry(module.id.as_str())
                .or_insert_with(|| tx.last_insert_rowid());
        }

        let mut lesson_rows: HashMap<&str, i64> = HashMap::new();
        for (position, lesson) in content.lessons.iter().enumerate() {
            let module_row = lesson
                .parent_module
                .as_deref()
                .and_then(|m| module_rows.get(m).copied());
            tx.execute(
                "INSERT INTO course_lessons (course_id, module_id, local_id, position, title, body)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    course_id,
                    module_row,
                    lesson.id,
                    position as i64,
                    lesson.title,
                    lesson.body
                ],
            )?;
            lesson_rows
                .entry(lesson.id.as_str())
                .or_insert_with(|| tx.last_insert_rowid());
        }

        for (position, task) in content.tasks.iter().enumerate() {
            let lesson_row = task
                .parent_lesson
                .as_deref()
                .and_then(|l| lesson_rows.get(l).copied());
            tx.execute(
                "INSERT INTO course_tasks
                 (course_id, lesson_id, local_id, position, title, instructions, points)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    course_id,
                    lesson_row,
                    task.id,
                    position as i64,
                    task.title,
                    task.instructions,
                    task.points
                ],
            )?;
        }

        tx.execute(
            "UPDATE upload_jobs SET status = ?2, created_course_id = ?3, can_resume = 0,
             resume_from_stage = NULL, progress_percent = 100, error_message = NULL,
             updated_at = ?4 WHERE id = ?1",
            params![job_id, JobStatus::Complete.as_str(), course_id, now],
        )?;

        tx.commit()?;
        Ok(FinalizeResult::Created(course_id))
    })
}

pub fn course_summary(db: &Database, course_id: &str) -> Result<Option<CourseSummary>, DatabaseError> {
    db.with_conn(|conn| {
        let head = conn
            .query_row(
                "SELECT id, upload_job_id, title FROM courses WHERE id = ?1",
                params![course_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()?;
        let Some((id, upload_job_id, title)) = head else {
            return Ok(None);
        };

        let count = |table: &str| -> Result<usize, DatabaseError> {
            let n: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {table} WHERE course_id = ?1"),
                params![course_id],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        Ok(Some(CourseSummary {
            id,
            upload_job_id,
            title,
            module_count: count("course_modules")?,
            lesson_count: count("course_lessons")?,
            task_count: count("course_tasks")?,
        }))
    })
}

/// Number of courses created from a given job. Finalize keeps this at most one.
pub fn count_for_job(db: &Database, job_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM courses WHERE upload_job_id = ?1",
            params![job_id],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{CourseInfo, GeneratedLesson, GeneratedModule, GeneratedTask};
    use crate::db::job_repo;
    use crate::job::{SourceType, UploadJob};

    fn setup() -> (Database, UploadJob) {
        let db = Database::open_in_memory().unwrap();
        let job = UploadJob::new(SourceType::Markdown, "course.md");
        job_repo::insert(&db, &job).unwrap();
        (db, job)
    }

    fn sample_content() -> GeneratedContent {
        GeneratedContent {
            course: CourseInfo {
                title: "Intro to Rust".into(),
                description: "Ownership and borrowing".into(),
            },
            modules: vec![GeneratedModule {
                id: "module_1".into(),
                title: "Basics".into(),
                description: String::new(),
            }],
            lessons: vec![
                GeneratedLesson {
                    id: "lesson_1".into(),
                    parent_module: Some("module_1".into()),
                    title: "Variables".into(),
                    body: "let x = 1;".into(),
                },
                GeneratedLesson {
                    id: "lesson_2".into(),
                    parent_module: Some("module_9".into()),
                    title: "Dangling".into(),
                    body: String::new(),
                },
            ],
            tasks: vec![GeneratedTask {
                id: "task_1".into(),
                parent_lesson: Some("lesson_1".into()),
                title: "Declare a variable".into(),
                instructions: "Write a let binding".into(),
                points: 10,
            }],
        }
    }

    #[test]
    fn test_finalize_creates_course_and_completes_job() {
        let (db, job) = setup();

        let result = finalize_job(&db, &job.id, &sample_content()).unwrap();
        let FinalizeResult::Created(course_id) = result else {
            panic!("expected a new course");
        };

        let summary = course_summary(&db, &course_id).unwrap().unwrap();
        assert_eq!(summary.title, "Intro to Rust");
        assert_eq!(summary.upload_job_id, job.id);
        assert_eq!(summary.module_count, 1);
        assert_eq!(summary.lesson_count, 2);
        assert_eq!(summary.task_count, 1);

        let stored = job_repo::find_by_id(&db, &job.id).unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Complete);
        assert_eq!(stored.created_course_id.as_deref(), Some(course_id.as_str()));
        assert!(!stored.can_resume);
        assert_eq!(stored.resume_from_stage, None);
    }

    #[test]
    fn test_finalize_twice_creates_one_course() {
        let (db, job) = setup();

        let first = finalize_job(&db, &job.id, &sample_content()).unwrap();
        let second = finalize_job(&db, &job.id, &sample_content()).unwrap();

        assert!(matches!(first, FinalizeResult::Created(_)));
        assert_eq!(
            second,
            FinalizeResult::AlreadyFinalized(first.course_id().to_string())
        );
        assert_eq!(count_for_job(&db, &job.id).unwrap(), 1);
    }

    #[test]
    fn test_unmatched_parent_is_stored_without_parent() {
        let (db, job) = setup();
        let course_id = finalize_job(&db, &job.id, &sample_content())
            .unwrap()
            .course_id()
            .to_string();

        db.with_conn(|conn| {
            let orphan: Option<i64> = conn.query_row(
                "SELECT module_id FROM course_lessons WHERE course_id = ?1 AND local_id = 'lesson_2'",
                params![course_id],
                |row| row.get(0),
            )?;
            assert_eq!(orphan, None);
            let task_parent: Option<i64> = conn.query_row(
                "SELECT lesson_id FROM course_tasks WHERE course_id = ?1",
                params![course_id],
                |row| row.get(0),
            )?;
            assert!(task_parent.is_some());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_empty_title_falls_back() {
        let (db, job) = setup();
        let content = GeneratedContent::default();
        let course_id = finalize_job(&db, &job.id, &content)
            .unwrap()
            .course_id()
            .to_string();
        let summary = course_summary(&db, &course_id).unwrap().unwrap();
        assert_eq!(summary.title, UNTITLED_COURSE);
    }

    #[test]
    fn test_finalize_missing_job() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            finalize_job(&db, "nope", &GeneratedContent::default()),
            Err(DatabaseError::JobNotFound(_))
        ));
    }
}
