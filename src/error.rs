//! Error types for the filter expression engine

use thiserror::Error;

/// Main error type for the filter expression engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid expression format: {0}")]
    Format(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Cannot convert '{value}' to {target}")]
    ConversionFailed { value: String, target: String },

    #[error("Unknown property: {0}")]
    UnknownProperty(String),

    #[error("Invalid expression tree: {0}")]
    InvalidTree(String),

    #[error("Division by zero")]
    DivisionByZero,
}

/// Result type alias for the filter expression engine
pub type Result<T> = std::result::Result<T, FilterError>;
