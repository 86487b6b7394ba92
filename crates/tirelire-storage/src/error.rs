//! Error types for tirelire-storage

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Corrupt value for key '{key}': {message}")]
    Corrupt { key: String, message: String },

    #[error("Invalid storage key: {key}")]
    InvalidKey { key: String },

    #[error("Serialization error: {message}")]
    Serialize { message: String },

    #[error("IO error")]
    IoError(#[from] io::Error),
}

/// Result type with StorageError
pub type StorageResult<T> = Result<T, StorageError>;
