//! Error types for listing preparation

use thiserror::Error;

/// Result type alias for preparation operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Main error type for the preparation steps
#[derive(Error, Debug)]
pub enum PrepError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Column has no observed values: {0}")]
    EmptyColumn(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl PrepError {
    pub(crate) fn invalid(name: &str, value: impl ToString, reason: &str) -> Self {
        PrepError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<polars::error::PolarsError> for PrepError {
    fn from(err: polars::error::PolarsError) -> Self {
        PrepError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PrepError {
    fn from(err: serde_json::Error) -> Self {
        PrepError::SerializationError(err.to_string())
    }
}
