//! State transition errors

use ember_primitives::U256;
use thiserror::Error;

/// Reasons a message cannot be applied at all. The state is left
/// untouched when one of these is returned; failures inside the EVM are
/// reported through the outcome instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Message nonce differs from the sender's account nonce
    #[error("nonce mismatch: expected {expected}, got {got}")]
    NonceMismatch {
        /// Account nonce
        expected: u64,
        /// Message nonce
        got: u64,
    },

    /// Sender cannot pay for gas and value up front
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// `gas_limit * gas_price + value`
        required: U256,
        /// Sender balance
        available: U256,
    },

    /// Gas limit does not cover the intrinsic cost
    #[error("intrinsic gas too low: required {required}, limit {limit}")]
    IntrinsicGas {
        /// Intrinsic cost
        required: u64,
        /// Message gas limit
        limit: u64,
    },

    /// Message gas limit exceeds what is left in the block
    #[error("block gas limit exceeded: requested {requested}, available {available}")]
    BlockGasLimitExceeded {
        /// Message gas limit
        requested: u64,
        /// Gas left in the block
        available: u64,
    },
}

/// Result type for state transitions
pub type CoreResult<T> = Result<T, CoreError>;
