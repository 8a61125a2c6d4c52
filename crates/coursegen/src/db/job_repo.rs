//! Job repository: the only code that reads or writes the `upload_jobs` table.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::job::{JobStatus, Stage, UploadJob};

#[derive(Debug, thiserror::Error)]
#[error("Invalid stage number {0}")]
struct InvalidStage(i64);

pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn parsed_column<T>(row: &Row<'_>, name: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let idx = row.as_ref().column_index(name)?;
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

fn timestamp_column(row: &Row<'_>, name: &str) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    let idx = row.as_ref().column_index(name)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

fn required_timestamp(row: &Row<'_>, name: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    timestamp_column(row, name)?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, name.to_string(), Type::Null)
    })
}

fn stage_column(row: &Row<'_>, name: &str) -> Result<Option<Stage>, rusqlite::Error> {
    let idx = row.as_ref().column_index(name)?;
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|n| {
        u8::try_from(n)
            .ok()
            .and_then(Stage::from_number)
            .ok_or_else(|| conversion_error(idx, InvalidStage(n)))
    })
    .transpose()
}

fn job_from_row(row: &Row<'_>) -> Result<UploadJob, rusqlite::Error> {
    let current_stage = stage_column(row, "current_stage")?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(0, "current_stage".to_string(), Type::Null)
    })?;
    let progress: i64 = row.get("progress_percent")?;

    Ok(UploadJob {
        id: row.get("id")?,
        source_type: parsed_column(row, "source_type")?,
        original_filename: row.get("original_filename")?,
        status: parsed_column(row, "status")?,
        current_stage,
        can_resume: row.get("can_resume")?,
        resume_from_stage: stage_column(row, "resume_from_stage")?,
        raw_content: row.get("raw_content")?,
        structured_content: row.get("structured_content")?,
        aligned_content: row.get("aligned_content")?,
        generated_content: row.get("generated_content")?,
        stage_1_completed_at: timestamp_column(row, "stage_1_completed_at")?,
        stage_2_completed_at: timestamp_column(row, "stage_2_completed_at")?,
        stage_3_completed_at: timestamp_column(row, "stage_3_completed_at")?,
        stage_4_completed_at: timestamp_column(row, "stage_4_completed_at")?,
        progress_percent: progress.clamp(0, 100) as u8,
        current_stage_name: row.get("current_stage_name")?,
        current_item: row.get("current_item")?,
        error_message: row.get("error_message")?,
        created_course_id: row.get("created_course_id")?,
        created_at: required_timestamp(row, "created_at")?,
        updated_at: required_timestamp(row, "updated_at")?,
    })
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &UploadJob) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO upload_jobs (id, source_type, original_filename, status, current_stage,
             can_resume, resume_from_stage, raw_content, structured_content, aligned_content,
             generated_content, stage_1_completed_at, stage_2_completed_at, stage_3_completed_at,
             stage_4_completed_at, progress_percent, current_stage_name, current_item,
             error_message, created_course_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
             ?18, ?19, ?20, ?21, ?22)",
            params![
                job.id,
                job.source_type.as_str(),
                job.original_filename,
                job.status.as_str(),
                job.current_stage.number(),
                job.can_resume,
                job.resume_from_stage.map(Stage::number),
                job.raw_content,
                job.structured_content,
                job.aligned_content,
                job.generated_content,
                job.stage_1_completed_at.map(format_timestamp),
                job.stage_2_completed_at.map(format_timestamp),
                job.stage_3_completed_at.map(format_timestamp),
                job.stage_4_completed_at.map(format_timestamp),
                job.progress_percent,
                job.current_stage_name,
                job.current_item,
                job.error_message,
                job.created_course_id,
                format_timestamp(job.created_at),
                format_timestamp(job.updated_at),
            ],
        )?;
        Ok(())
    })
}

/// Overwrites every column except `id` and `created_at`.
/// Returns [`DatabaseError::JobNotFound`] when no row matches.
pub fn update(db: &Database, job: &UploadJob) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE upload_jobs SET source_type=?2, original_filename=?3, status=?4,
             current_stage=?5, can_resume=?6, resume_from_stage=?7, raw_content=?8,
             structured_content=?9, aligned_content=?10, generated_content=?11,
             stage_1_completed_at=?12, stage_2_completed_at=?13, stage_3_completed_at=?14,
             stage_4_completed_at=?15, progress_percent=?16, current_stage_name=?17,
             current_item=?18, error_message=?19, created_course_id=?20, updated_at=?21
             WHERE id=?1",
            params![
                job.id,
                job.source_type.as_str(),
                job.original_filename,
                job.status.as_str(),
                job.current_stage.number(),
                job.can_resume,
                job.resume_from_stage.map(Stage::number),
                job.raw_content,
                job.structured_content,
                job.aligned_content,
                job.generated_content,
                job.stage_1_completed_at.map(format_timestamp),
                job.stage_2_completed_at.map(format_timestamp),
                job.stage_3_completed_at.map(format_timestamp),
                job.stage_4_completed_at.map(format_timestamp),
                job.progress_percent,
                job.current_stage_name,
                job.current_item,
                job.error_message,
                job.created_course_id,
                format_timestamp(job.updated_at),
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::JobNotFound(job.id.clone()));
        }
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<UploadJob>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM upload_jobs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], job_from_row)?;
        match rows.next() {
            Some(Ok(job)) => Ok(Some(job)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Updates only the polling fields. Leaves stage outputs and control state alone.
pub fn update_progress(
    db: &Database,
    id: &str,
    progress_percent: u8,
    stage_name: &str,
    item: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE upload_jobs SET progress_percent = ?2, current_stage_name = ?3,
             current_item = ?4, updated_at = ?5 WHERE id = ?1",
            params![
                id,
                progress_percent,
                stage_name,
                item,
                format_timestamp(Utc::now())
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::JobNotFound(id.to_string()));
        }
        Ok(())
    })
}

/// Updates only the status and updated_at of a job.
pub fn update_status(db: &Database, id: &str, status: JobStatus) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE upload_jobs SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status.as_str(), format_timestamp(Utc::now())],
        )?;
        if changed == 0 {
            return Err(DatabaseError::JobNotFound(id.to_string()));
        }
        Ok(())
    })
}

/// Lists jobs that failed and can be retried, oldest first.
pub fn list_resumable(db: &Database) -> Result<Vec<UploadJob>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM upload_jobs WHERE status = 'error' AND can_resume = 1
             ORDER BY created_at ASC",
        )?;
        let jobs = stmt
            .query_map([], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    })
}
