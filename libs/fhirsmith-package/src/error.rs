use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid package structure: {0}")]
    InvalidStructure(String),

    #[error("missing file: {0}")]
    MissingFile(String),

    #[error("manifest validation failed: {0}")]
    ValidationError(String),

    #[error("index corrupt at {path}: {reason}")]
    IndexCorrupt { path: PathBuf, reason: String },

    #[error("failed to load {path}: {reason}")]
    LoadFailed { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
