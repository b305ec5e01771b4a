//! Error types for fundamentals operations.
//!
//! [`FundamentalsError`] is the fatal channel only. Missing data ("no value")
//! is modelled as `Option::None` and never reaches this type.

use thiserror::Error;

/// Errors that can occur while storing, loading or analysing statement data.
#[derive(Error, Debug)]
pub enum FundamentalsError {
    /// The backing store failed (connection, schema, lock poisoning, ...).
    #[error("Storage error: {0}")]
    Storage(String),

    /// A stored or supplied value could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration could not be read or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`FundamentalsError`].
pub type Result<T> = std::result::Result<T, FundamentalsError>;
