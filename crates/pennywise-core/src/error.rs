//! Error types for Pennywise

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not a directory: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Unreadable file {}: {reason}", path.display())]
    UnreadableFile { path: PathBuf, reason: String },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Wrap a per-file failure so the directory scan can report which file it was
    pub fn unreadable(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Self::UnreadableFile {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
