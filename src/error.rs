//! Error types for tubeqa.

use thiserror::Error;

/// Library-level error type for tubeqa operations.
#[derive(Error, Debug)]
pub enum TubeqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Video already ingested: {0}")]
    DuplicateVideo(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Exchange cancelled: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),
}

/// Coarse classification of a [`TubeqaError`], used by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Duplicate,
    Upstream,
    Ingestion,
    Persistence,
    Cancelled,
    Internal,
}

impl TubeqaError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TubeqaError::Validation(_) => ErrorKind::Validation,
            TubeqaError::NotFound(_) => ErrorKind::NotFound,
            TubeqaError::DuplicateVideo(_) => ErrorKind::Duplicate,
            TubeqaError::Upstream(_)
            | TubeqaError::Embedding(_)
            | TubeqaError::OpenAI(_)
            | TubeqaError::Http(_) => ErrorKind::Upstream,
            TubeqaError::Ingestion(_) => ErrorKind::Ingestion,
            TubeqaError::Persistence(_)
            | TubeqaError::Database(_)
            | TubeqaError::DimensionMismatch { .. } => ErrorKind::Persistence,
            TubeqaError::Cancelled(_) => ErrorKind::Cancelled,
            TubeqaError::Config(_)
            | TubeqaError::Io(_)
            | TubeqaError::Json(_)
            | TubeqaError::TomlParse(_) => ErrorKind::Internal,
        }
    }

    /// Message that is safe to show to an API caller.
    ///
    /// User-caused errors carry their own text; everything else is reduced to a
    /// generic sentence so provider response bodies stay in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::NotFound | ErrorKind::Duplicate => self.to_string(),
            ErrorKind::Upstream => "An upstream model or provider call failed".to_string(),
            ErrorKind::Ingestion => "Video ingestion failed".to_string(),
            ErrorKind::Persistence => "Failed to read or write storage".to_string(),
            ErrorKind::Cancelled => "Request was cancelled".to_string(),
            ErrorKind::Internal => "Internal server error".to_string(),
        }
    }
}

/// Result type alias for tubeqa operations.
pub type Result<T> = std::result::Result<T, TubeqaError>;
