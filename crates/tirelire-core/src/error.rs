//! Error types for tirelire-core
//!
//! Error codes, severities and suggestion-carrying details for everything
//! the household engine can reject.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tirelire_storage::StorageError;

use crate::types::CategoryType;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Category not in the registry
    CategoryNotFound,
    /// Transaction not found
    TransactionNotFound,
    /// Validation error
    ValidationError,
    /// Month index out of range
    InvalidMonth,
    /// Duplicate entry
    DuplicateEntry,
    /// Nothing to export for the requested year
    NothingToExport,
    /// Invalid data format
    InvalidFormat,
    /// Storage error
    StorageError,
    /// Internal error
    InternalError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::CategoryNotFound => write!(f, "CATEGORY_NOT_FOUND"),
            ErrorCode::TransactionNotFound => write!(f, "TRANSACTION_NOT_FOUND"),
            ErrorCode::ValidationError => write!(f, "VALIDATION_ERROR"),
            ErrorCode::InvalidMonth => write!(f, "INVALID_MONTH"),
            ErrorCode::DuplicateEntry => write!(f, "DUPLICATE_ENTRY"),
            ErrorCode::NothingToExport => write!(f, "NOTHING_TO_EXPORT"),
            ErrorCode::InvalidFormat => write!(f, "INVALID_FORMAT"),
            ErrorCode::StorageError => write!(f, "STORAGE_ERROR"),
            ErrorCode::InternalError => write!(f, "INTERNAL_ERROR"),
        }
    }
}

/// Detailed error information for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Informational
    Info,
    /// Warning - operation rejected, state untouched
    Warning,
    /// Error - operation failed
    Error,
    /// Critical - application may be unstable
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "info"),
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for tirelire-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Category not found: {category_type}/{name}")]
    CategoryNotFound {
        category_type: CategoryType,
        name: String,
    },

    #[error("Transaction not found: {id}")]
    TransactionNotFound { id: u64 },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Invalid month: {month} (expected 0-11)")]
    InvalidMonth { month: u32 },

    #[error("Duplicate entry: {entry}")]
    DuplicateEntry { entry: String },

    #[error("No transactions to export for {year}")]
    NothingToExport { year: i32 },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl CoreError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError {
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::CategoryNotFound { .. } => ErrorCode::CategoryNotFound,
            CoreError::TransactionNotFound { .. } => ErrorCode::TransactionNotFound,
            CoreError::ValidationError { .. } => ErrorCode::ValidationError,
            CoreError::InvalidMonth { .. } => ErrorCode::InvalidMonth,
            CoreError::DuplicateEntry { .. } => ErrorCode::DuplicateEntry,
            CoreError::NothingToExport { .. } => ErrorCode::NothingToExport,
            CoreError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            CoreError::Storage(_) => ErrorCode::StorageError,
            CoreError::InternalError { .. } => ErrorCode::InternalError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::CategoryNotFound { .. } => ErrorSeverity::Warning,
            CoreError::TransactionNotFound { .. } => ErrorSeverity::Info,
            CoreError::ValidationError { .. } => ErrorSeverity::Warning,
            CoreError::InvalidMonth { .. } => ErrorSeverity::Warning,
            CoreError::DuplicateEntry { .. } => ErrorSeverity::Warning,
            CoreError::NothingToExport { .. } => ErrorSeverity::Info,
            CoreError::InvalidFormat { .. } => ErrorSeverity::Error,
            CoreError::Storage(_) => ErrorSeverity::Error,
            CoreError::InternalError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::CategoryNotFound {
                category_type,
                name,
            } => {
                details = details.with_suggestion(format!(
                    "Check that '{}' is listed under {}.",
                    name,
                    category_type.label()
                ));
                details = details.with_suggestion(
                    "Use `tirelire category list` to see the registered categories.".to_string(),
                );
            }
            CoreError::TransactionNotFound { .. } => {
                details = details
                    .with_suggestion("Check if the transaction ID is correct.".to_string());
                details = details.with_suggestion(
                    "Use `tirelire list` to see transaction IDs.".to_string(),
                );
            }
            CoreError::ValidationError { message } => {
                details =
                    details.with_detail(serde_json::json!({ "validation_message": message }));
                details = details.with_suggestion(
                    "Review the validation message for specific requirements.".to_string(),
                );
            }
            CoreError::InvalidMonth { .. } => {
                details = details
                    .with_suggestion("Months are numbered 1 to 12 on the command line.".to_string());
            }
            CoreError::DuplicateEntry { entry } => {
                details = details.with_suggestion(format!(
                    "Pick a name other than '{}' or rename the existing entry.",
                    entry
                ));
            }
            CoreError::NothingToExport { year } => {
                details = details.with_suggestion(format!(
                    "Add transactions dated {} or export another year.",
                    year
                ));
            }
            CoreError::InvalidFormat { message } => {
                details = details.with_detail(serde_json::json!({ "format_message": message }));
                details = details.with_suggestion(
                    "Make sure the file is a tirelire JSON export.".to_string(),
                );
            }
            CoreError::Storage(_) => {
                details = details.with_suggestion(
                    "Check that the data directory exists and is writable.".to_string(),
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

/// Log an error with its code and suggestions
pub fn log_error(error: &CoreError, operation: &str) {
    match error.severity() {
        ErrorSeverity::Info => log::info!(
            "[{}] {} - Operation: {}",
            error.code(),
            error,
            operation
        ),
        ErrorSeverity::Warning => log::warn!(
            "[{}] {} - Operation: {}",
            error.code(),
            error,
            operation
        ),
        ErrorSeverity::Error | ErrorSeverity::Critical => log::error!(
            "ERROR {} - Operation: {}",
            error.to_details(),
            operation
        ),
    }
}
