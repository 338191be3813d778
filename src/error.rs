use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Report aggregation failed during {stage}: {message}")]
    Aggregation { stage: &'static str, message: String },

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Import error on line {line}: {message}")]
    Import { line: usize, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a query failure raised while building a report.
    pub(crate) fn aggregation(stage: &'static str, e: impl fmt::Display) -> Self {
        Error::Aggregation {
            stage,
            message: e.to_string(),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Database(e.to_string())
    }
}

impl From<rusqlite_migration::Error> for Error {
    fn from(e: rusqlite_migration::Error) -> Self {
        Error::Migration(e.to_string())
    }
}

impl<E: fmt::Display> From<tokio_rusqlite::Error<E>> for Error {
    fn from(e: tokio_rusqlite::Error<E>) -> Self {
        Error::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
