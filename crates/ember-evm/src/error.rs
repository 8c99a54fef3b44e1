//! EVM error types

use primitive_types::U256;
use thiserror::Error;

/// Reasons a call frame can fail.
///
/// Every kind is recoverable at the call/create boundary: the orchestrator
/// reverts the frame's state changes, forfeits its gas and reports the
/// failure to the calling frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Call or create attempted beyond the maximum depth
    #[error("max call depth exceeded")]
    MaxCallDepthExceeded,

    /// Caller cannot cover the transferred value
    #[error("insufficient balance for transfer: required {required}, available {available}")]
    InsufficientBalance {
        /// Value to transfer
        required: U256,
        /// Caller balance
        available: U256,
    },

    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Jump target is not a JUMPDEST
    #[error("invalid jump destination: {0}")]
    InvalidJumpDestination(U256),

    /// Opcode is undefined under the active rule set
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow (max 1024)")]
    StackOverflow,

    /// Returned contract code cannot pay for its deposit
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,
}

impl EvmError {
    /// Whether the enclosing frame may continue after this error.
    /// No kind is fatal to the transaction or the process.
    pub fn is_recoverable(&self) -> bool {
        true
    }
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;
