//! State error types

use ember_primitives::U256;
use thiserror::Error;

/// State errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// Snapshot id was never issued or has already been reverted past
    #[error("unknown snapshot id: {0}")]
    InvalidSnapshot(usize),

    /// Balance would go below zero
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Amount requested
        required: U256,
        /// Balance held
        available: U256,
    },
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
