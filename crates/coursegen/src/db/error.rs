use std::path::PathBuf;
use thiserror::Error;

/// Failures of the job store.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the directory that holds the database file failed.
    #[error("Cannot create database directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No `database_path` configured and no home directory to default into.
    #[error("No database path configured and no home directory available")]
    NoDataDirectory,

    #[error("Schema migration {version} failed: {reason}")]
    Migration { version: u32, reason: String },

    /// A checkpoint or status write addressed a job that does not exist.
    #[error("Upload job {0} not found")]
    JobNotFound(String),

    #[error("Job store lock poisoned")]
    LockPoisoned,
}
