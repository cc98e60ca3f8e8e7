use thiserror::Error;

/// Core error types for intake operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("Unknown gender: {0}")]
    UnknownGender(String),

    #[error("Unknown identification type: {0}")]
    UnknownIdentificationType(String),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time formatting error: {0}")]
    TimeFormat(#[from] time::error::Format),
}

impl CoreError {
    /// Create a new InvalidId error
    pub fn invalid_id(id: impl Into<String>) -> Self {
        Self::InvalidId(id.into())
    }

    /// Create a new InvalidDate error
    pub fn invalid_date(date: impl Into<String>) -> Self {
        Self::InvalidDate(date.into())
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
