use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    NotFound,
    Validation,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        self.code == ErrorCode::Validation
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Input rejected before any write. Messages name the class of missing
/// input, never the individual field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields, add at least one event, and add capabilities")]
    IncompleteProfile,
    #[error("Please fill in the event name and points")]
    IncompleteEvent,
    #[error("Event dates must use the YYYY-MM-DD format")]
    MalformedDate,
    #[error("Please enter a comment and select a rating.")]
    IncompleteComment,
}

impl From<ValidationError> for ApiError {
    fn from(value: ValidationError) -> Self {
        Self::new(ErrorCode::Validation, value.to_string())
    }
}
