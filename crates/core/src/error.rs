//! Error types for Pigeon.
//!
//! A single error enum covers configuration, I/O, provider, index, store,
//! prompt and lookup failures. Model-quality problems (unparseable splits,
//! empty generations) are not errors and never reach this type.

use thiserror::Error;

/// Unified error type for Pigeon.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Completion provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding and retrieval errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Vector index unavailable or inconsistent
    #[error("Index error: {0}")]
    Index(String),

    /// Relational store errors
    #[error("Store error: {0}")]
    Store(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// A document, thread, email or response referenced by the caller does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// An operation exceeded its deadline
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// True for lookups that failed because the caller named a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = AppError::NotFound("thread 7".to_string());
        assert_eq!(err.to_string(), "thread 7 not found");
        assert!(err.is_not_found());
        assert!(!AppError::Timeout("index build".to_string()).is_not_found());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: AppError = serde_json::from_str::<Vec<String>>("not json")
            .unwrap_err()
            .into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
