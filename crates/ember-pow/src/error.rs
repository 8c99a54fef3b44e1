//! Nonce verifier errors

use thiserror::Error;

/// Nonce verifier errors
#[derive(Debug, Error)]
pub enum PowError {
    /// A worker or feeder thread could not be started
    #[error("failed to spawn verifier thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Result type for the nonce verifier
pub type PowResult<T> = Result<T, PowError>;
