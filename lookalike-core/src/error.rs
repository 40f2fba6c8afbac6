use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookalikeError {
    #[error("Failed to decode image: {0}")]
    DecodeFailure(String),

    #[error("Malformed hash: {0}")]
    MalformedHash(String),

    #[error("Corrupt hash store {}: {reason}", path.display())]
    CorruptStore { path: PathBuf, reason: String },

    #[error("Hash length mismatch: {left} bits vs {right} bits")]
    LengthMismatch { left: usize, right: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dataset unavailable at {}: {reason}", path.display())]
    DatasetUnavailable { path: PathBuf, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LookalikeError>;
