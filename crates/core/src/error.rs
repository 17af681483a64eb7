//! Error types for the Ratewise CLI.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application, including configuration, I/O, store, LLM, and
//! serialization errors.

use thiserror::Error;

/// Unified error type for the Ratewise CLI.
///
/// All functions in the application return `Result<T, AppError>`.
/// We never panic — errors must be represented and propagated.
///
/// Note that most query-resolution "failures" (instructor not found,
/// ambiguous name, no review data) are NOT errors: they are typed outcomes
/// carried by the pipeline result. Only genuine faults end up here.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog store (SQLite) errors
    #[error("Store error: {0}")]
    Store(String),

    /// LLM transport or provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// LLM call exceeded its configured deadline
    #[error("LLM call timed out after {0}s")]
    LlmTimeout(u64),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error originated at the model-call boundary.
    ///
    /// The pipeline maps these to the `SynthesisFailed` outcome instead of
    /// propagating them, so a model outage degrades to a reportable result.
    pub fn is_model_failure(&self) -> bool {
        matches!(self, AppError::Llm(_) | AppError::LlmTimeout(_))
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
    fn test_model_failure_classification() {
        assert!(AppError::Llm("connection refused".to_string()).is_model_failure());
        assert!(AppError::LlmTimeout(30).is_model_failure());
        assert!(!AppError::Config("bad".to_string()).is_model_failure());
        assert!(!AppError::Store("locked".to_string()).is_model_failure());
    }

    #[test]
    fn test_timeout_message() {
        let err = AppError::LlmTimeout(30);
        assert_eq!(err.to_string(), "LLM call timed out after 30s");
    }
}
