//! State capability consumed by the execution core

use bytes::Bytes;
use ember_primitives::{Address, H256, U256};

use crate::account::Account;

/// Opaque checkpoint handle returned by [`State::snapshot`]
pub type SnapshotId = usize;

/// Read/write access to world state.
///
/// Snapshots nest with call depth: reverting to an id undoes every
/// mutation made after it was taken and invalidates every later id.
/// Implementations are used by one execution at a time.
pub trait State {
    /// Whether the account exists (suicided accounts still exist until
    /// the state is finalised)
    fn exists(&self, address: &Address) -> bool;

    /// Get account header
    fn get_account(&self, address: &Address) -> Option<Account>;

    /// Create a fresh account, carrying over the balance of any account
    /// already at `address` and resetting everything else
    fn create_account(&mut self, address: Address);

    /// Get account balance (zero for missing accounts)
    fn get_balance(&self, address: &Address) -> U256;

    /// Credit `amount`, creating the account if needed
    fn add_balance(&mut self, address: &Address, amount: U256);

    /// Debit `amount`. Callers check the balance first.
    fn sub_balance(&mut self, address: &Address, amount: U256);

    /// Get account nonce
    fn get_nonce(&self, address: &Address) -> u64;

    /// Set account nonce
    fn set_nonce(&mut self, address: &Address, nonce: u64);

    /// Get contract code
    fn get_code(&self, address: &Address) -> Bytes;

    /// Get code hash (zero for missing accounts)
    fn get_code_hash(&self, address: &Address) -> H256;

    /// Get code length
    fn get_code_size(&self, address: &Address) -> usize {
        self.get_code(address).len()
    }

    /// Replace the account's code
    fn set_code(&mut self, address: &Address, code: Bytes);

    /// Get storage slot (zero when unset)
    fn get_storage(&self, address: &Address, key: &H256) -> H256;

    /// Set storage slot; writing zero clears it
    fn set_storage(&mut self, address: &Address, key: H256, value: H256);

    /// Mark the account for removal and zero its balance. Returns false
    /// when the account does not exist.
    fn suicide(&mut self, address: &Address) -> bool;

    /// Whether SUICIDE already ran for this account
    fn has_suicided(&self, address: &Address) -> bool;

    /// Add to the transaction's gas refund counter
    fn add_refund(&mut self, gas: u64);

    /// Get the transaction's gas refund counter
    fn get_refund(&self) -> u64;

    /// Take a checkpoint
    fn snapshot(&mut self) -> SnapshotId;

    /// Roll back to a checkpoint
    fn revert_to_snapshot(&mut self, id: SnapshotId);
}
