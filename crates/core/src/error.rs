//! Error types for the ADL visualizer export.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the export pipelines.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (invalid value in a mandatory column).
    #[error("Data error: {0}")]
    Data(String),

    /// A mandatory column is absent for a row.
    #[error("Missing field `{column}` in row {row}")]
    MissingField { row: usize, column: &'static str },

    /// Input source could not be resolved or fetched.
    #[error("Source error: {0}")]
    Source(String),

    /// CSV decoding error.
    #[error("CSV error: {0}")]
    Csv(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a missing field error.
    pub fn missing_field(row: usize, column: &'static str) -> Self {
        Error::MissingField { row, column }
    }

    /// Create a source error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Error::Source(msg.into())
    }

    /// Create a CSV error.
    pub fn csv(msg: impl Into<String>) -> Self {
        Error::Csv(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = Error::missing_field(7, "coin");
        assert_eq!(err.to_string(), "Missing field `coin` in row 7");
    }
}
