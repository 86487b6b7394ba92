//! Error types for tirelire-sync

use std::io;
use thiserror::Error;
use tirelire_core::CoreError;
use tirelire_storage::StorageError;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Remote store error: {message}")]
    Remote { message: String },

    #[error("Invalid remote document: {message}")]
    InvalidDocument { message: String },

    #[error("Household error: {0}")]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error")]
    IoError(#[from] io::Error),
}

/// Result type with SyncError
pub type SyncResult<T> = Result<T, SyncError>;
