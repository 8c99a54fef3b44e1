//! Error types for the fixture runner

use thiserror::Error;

/// Fixture runner error
#[derive(Error, Debug)]
pub enum TestError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Hex decoding error
    #[error("Hex error: {0}")]
    Hex(String),

    /// Fixture content that cannot be turned into an execution
    #[error("Parse error: {0}")]
    Parse(String),

    /// Execution disagreed with the fixture
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// Unknown fork or fixture format
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl From<hex::FromHexError> for TestError {
    fn from(e: hex::FromHexError) -> Self {
        TestError::Hex(e.to_string())
    }
}

/// Test result type
pub type TestResult<T> = Result<T, TestError>;
