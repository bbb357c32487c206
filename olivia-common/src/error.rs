// ================================================================
// File: olivia-common/src/error.rs
// ================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Session (or other referenced record) does not exist or is not bookable.
    #[error("Not found error: {0}")]
    NotFound(String),

    /// Capacity exhausted at enrollment time.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed date, ordinal or branch reference coming from a caller.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Planner/narrator timeout, transport failure or unusable payload.
    /// Always recovered locally by the dialogue layer.
    #[error("External capability error: {0}")]
    ExternalCapability(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout error: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for the two outcomes the enrollment surface reports as explicit failures.
    pub fn is_enrollment_failure(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Conflict(_))
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Parse(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Parse(s.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<chrono::format::ParseError> for Error {
    fn from(err: chrono::format::ParseError) -> Self {
        Error::Parse(err.to_string())
    }
}
