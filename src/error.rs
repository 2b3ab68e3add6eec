use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Input file not found: {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Decode error at line {line}: {message}")]
    Decode { line: u64, message: String },

    #[error("Persist error: {0}")]
    Persist(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for IngestError {
    fn from(err: rusqlite::Error) -> Self {
        IngestError::Persist(err.to_string())
    }
}

impl IngestError {
    /// Short machine-friendly name of the failure kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::NotFound { .. } => "not_found",
            IngestError::Decode { .. } => "decode_failure",
            IngestError::Persist(_) => "persist_failure",
            IngestError::Config(_) => "config",
            IngestError::Io(_) => "io",
            IngestError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
