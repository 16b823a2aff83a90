//! Unified application error type.
//! All modules (db, config, cli) return AppError to keep the error
//! handling consistent and easy to manage.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // ---------------------------
    // IO
    // ---------------------------
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ---------------------------
    // Store lifecycle
    // ---------------------------
    #[error("Store connection error: {0}")]
    Connection(String),

    #[error("Store access is disabled")]
    ConnectionDisabled,

    #[error("Schema error: {0}")]
    Schema(String),

    #[error(
        "Migration failed at version {last_good_version}: {message}{}",
        .backup_path.as_ref().map(|p| format!(" (backup: {})", p.display())).unwrap_or_default()
    )]
    Migration {
        message: String,
        last_good_version: i64,
        backup_path: Option<PathBuf>,
    },

    #[error("Status transition affected {actual} rows, expected {expected}")]
    Consistency { expected: usize, actual: usize },

    // ---------------------------
    // Database-related
    // ---------------------------
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    // ---------------------------
    // Parsing errors
    // ---------------------------
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    #[error("Invalid duration: {0} (expected 0.25..=24.0 in quarter-hour steps)")]
    InvalidDuration(f64),

    #[error("Invalid status value: {0}")]
    InvalidStatus(String),

    // ---------------------------
    // Config errors
    // ---------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // ---------------------------
    // Generic fallback
    // ---------------------------
    #[error("Internal error: {0}")]
    Other(String),
}

pub type AppResult<T> = Result<T, AppError>;
