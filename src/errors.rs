use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed for {name}: {}", .reasons.join(", "))]
    Validation { name: String, reasons: Vec<String> },

    #[error("{name} is already in the queue")]
    Duplicate { name: String },

    #[error("Upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Cannot remove {name} while it is uploading")]
    RemovalConflict { name: String },

    #[error("No upload item with id {id}")]
    UnknownItem { id: Uuid },

    #[error("History persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(name: &str, reasons: Vec<String>) -> Self {
        Self::Validation {
            name: name.to_string(),
            reasons,
        }
    }

    pub fn duplicate(name: &str) -> Self {
        Self::Duplicate {
            name: name.to_string(),
        }
    }

    pub fn upload_failed(reason: impl Into<String>) -> Self {
        Self::UploadFailed {
            reason: reason.into(),
        }
    }

    pub fn removal_conflict(name: &str) -> Self {
        Self::RemovalConflict {
            name: name.to_string(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Whether a retry could plausibly change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::UploadFailed { .. }
                | AppError::Database(_)
                | AppError::Io(_)
                | AppError::Persistence(_)
        )
    }

    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. } | AppError::Duplicate { .. } | AppError::Config(_)
        )
    }
}
