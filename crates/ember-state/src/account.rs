//! Account header

use ember_crypto::KECCAK_EMPTY;
use ember_primitives::{H256, U256};

/// Account data as seen through the [`State`](crate::State) capability.
/// Code and storage are addressed separately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account nonce
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// Code hash (keccak256 of code, or `KECCAK_EMPTY` if no code)
    pub code_hash: H256,
    /// Set by SUICIDE; the account is removed when the state is finalised
    pub suicided: bool,
}

impl Default for Account {
    fn default() -> Self {
        Self::new()
    }
}

impl Account {
    /// Create a new empty account
    pub fn new() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            code_hash: KECCAK_EMPTY,
            suicided: false,
        }
    }

    /// No nonce, no balance and no code
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == KECCAK_EMPTY
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        self.code_hash != KECCAK_EMPTY
    }
}
