//! Journaled in-memory world state

use std::collections::{BTreeMap, HashMap};

use bytes::Bytes;
use ember_crypto::keccak256;
use ember_primitives::{Address, H256, U256};
use tracing::{debug, warn};

use crate::account::Account;
use crate::error::{StateError, StateResult};
use crate::journal::{Journal, JournalEntry};
use crate::traits::{SnapshotId, State};

/// Account header plus its code and storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StateObject {
    pub(crate) account: Account,
    pub(crate) code: Bytes,
    pub(crate) storage: BTreeMap<H256, H256>,
}

/// In-memory [`State`] with journal-based snapshots.
///
/// Every mutation through the [`State`] trait is recorded in an undo log,
/// so `revert_to_snapshot` restores balances, nonces, code, storage,
/// suicide flags and the refund counter exactly.
#[derive(Debug, Default, Clone)]
pub struct MemoryState {
    objects: HashMap<Address, StateObject>,
    refund: u64,
    journal: Journal,
}

impl MemoryState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account outside the journal (genesis / fixture pre-state)
    pub fn insert_account(
        &mut self,
        address: Address,
        balance: U256,
        nonce: u64,
        code: Bytes,
        storage: impl IntoIterator<Item = (H256, H256)>,
    ) {
        let code_hash = keccak256(&code);
        let object = StateObject {
            account: Account {
                nonce,
                balance,
                code_hash,
                suicided: false,
            },
            code,
            storage: storage.into_iter().filter(|(_, v)| !v.is_zero()).collect(),
        };
        self.objects.insert(address, object);
    }

    /// Roll back to snapshot `id`, reporting ids that are not live
    pub fn revert(&mut self, id: SnapshotId) -> StateResult<()> {
        let undone = self.journal.unwind(id).ok_or(StateError::InvalidSnapshot(id))?;
        debug!(snapshot = id, entries = undone.len(), "reverting state");
        for entry in undone {
            self.undo(entry);
        }
        Ok(())
    }

    /// Debit `amount`, failing instead of going negative
    pub fn try_sub_balance(&mut self, address: &Address, amount: U256) -> StateResult<()> {
        let available = self.get_balance(address);
        if available < amount {
            return Err(StateError::InsufficientBalance {
                required: amount,
                available,
            });
        }
        self.sub_balance(address, amount);
        Ok(())
    }

    /// End-of-transaction commit: remove suicided accounts, reset the
    /// refund counter and drop the undo log.
    pub fn finalise(&mut self) {
        self.objects.retain(|_, object| !object.account.suicided);
        self.refund = 0;
        self.journal.clear();
    }

    /// Iterate over all accounts
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Account)> {
        self.objects.iter().map(|(addr, obj)| (addr, &obj.account))
    }

    /// Non-zero storage of an account, ordered by key
    pub fn storage(&self, address: &Address) -> Vec<(H256, H256)> {
        self.objects
            .get(address)
            .map(|obj| obj.storage.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    /// Number of accounts
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the state holds no accounts
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    fn object_mut(&mut self, address: &Address) -> &mut StateObject {
        if !self.objects.contains_key(address) {
            self.journal.record(JournalEntry::AccountCreated {
                address: *address,
                prev: None,
            });
        }
        self.objects.entry(*address).or_default()
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::AccountCreated { address, prev } => match prev {
                Some(prev) => {
                    self.objects.insert(address, *prev);
                }
                None => {
                    self.objects.remove(&address);
                }
            },
            JournalEntry::BalanceChanged { address, prev } => {
                if let Some(obj) = self.objects.get_mut(&address) {
                    obj.account.balance = prev;
                }
            }
            JournalEntry::NonceChanged { address, prev } => {
                if let Some(obj) = self.objects.get_mut(&address) {
                    obj.account.nonce = prev;
                }
            }
            JournalEntry::CodeChanged {
                address,
                prev_code,
                prev_hash,
            } => {
                if let Some(obj) = self.objects.get_mut(&address) {
                    obj.code = prev_code;
                    obj.account.code_hash = prev_hash;
                }
            }
            JournalEntry::StorageChanged { address, key, prev } => {
                if let Some(obj) = self.objects.get_mut(&address) {
                    if prev.is_zero() {
                        obj.storage.remove(&key);
                    } else {
                        obj.storage.insert(key, prev);
                    }
                }
            }
            JournalEntry::Suicided {
                address,
                prev_suicided,
                prev_balance,
            } => {
                if let Some(obj) = self.objects.get_mut(&address) {
                    obj.account.suicided = prev_suicided;
                    obj.account.balance = prev_balance;
                }
            }
            JournalEntry::RefundChanged { prev } => self.refund = prev,
        }
    }
}

impl State for MemoryState {
    fn exists(&self, address: &Address) -> bool {
        self.objects.contains_key(address)
    }

    fn get_account(&self, address: &Address) -> Option<Account> {
        self.objects.get(address).map(|obj| obj.account.clone())
    }

    fn create_account(&mut self, address: Address) {
        let prev = self.objects.remove(&address);
        let balance = prev.as_ref().map(|p| p.account.balance).unwrap_or_default();
        self.journal.record(JournalEntry::AccountCreated {
            address,
            prev: prev.map(Box::new),
        });
        let mut object = StateObject::default();
        object.account.balance = balance;
        self.objects.insert(address, object);
    }

    fn get_balance(&self, address: &Address) -> U256 {
        self.objects
            .get(address)
            .map(|obj| obj.account.balance)
            .unwrap_or_default()
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        let obj = self.object_mut(address);
        let prev = obj.account.balance;
        obj.account.balance = prev.saturating_add(amount);
        self.journal.record(JournalEntry::BalanceChanged {
            address: *address,
            prev,
        });
    }

    fn sub_balance(&mut self, address: &Address, amount: U256) {
        let obj = self.object_mut(address);
        let prev = obj.account.balance;
        if prev < amount {
            warn!(%address, %amount, balance = %prev, "balance debit exceeds balance");
        }
        obj.account.balance = prev.saturating_sub(amount);
        self.journal.record(JournalEntry::BalanceChanged {
            address: *address,
            prev,
        });
    }

    fn get_nonce(&self, address: &Address) -> u64 {
        self.objects
            .get(address)
            .map(|obj| obj.account.nonce)
            .unwrap_or(0)
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        let obj = self.object_mut(address);
        let prev = obj.account.nonce;
        obj.account.nonce = nonce;
        self.journal.record(JournalEntry::NonceChanged {
            address: *address,
            prev,
        });
    }

    fn get_code(&self, address: &Address) -> Bytes {
        self.objects
            .get(address)
            .map(|obj| obj.code.clone())
            .unwrap_or_default()
    }

    fn get_code_hash(&self, address: &Address) -> H256 {
        self.objects
            .get(address)
            .map(|obj| obj.account.code_hash)
            .unwrap_or(H256::ZERO)
    }

    fn get_code_size(&self, address: &Address) -> usize {
        self.objects.get(address).map(|obj| obj.code.len()).unwrap_or(0)
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        let code_hash = keccak256(&code);
        let obj = self.object_mut(address);
        let prev_code = std::mem::replace(&mut obj.code, code);
        let prev_hash = std::mem::replace(&mut obj.account.code_hash, code_hash);
        self.journal.record(JournalEntry::CodeChanged {
            address: *address,
            prev_code,
            prev_hash,
        });
    }

    fn get_storage(&self, address: &Address, key: &H256) -> H256 {
        self.objects
            .get(address)
            .and_then(|obj| obj.storage.get(key).copied())
            .unwrap_or(H256::ZERO)
    }

    fn set_storage(&mut self, address: &Address, key: H256, value: H256) {
        let obj = self.object_mut(address);
        let prev = if value.is_zero() {
            obj.storage.remove(&key)
        } else {
            obj.storage.insert(key, value)
        }
        .unwrap_or(H256::ZERO);
        self.journal.record(JournalEntry::StorageChanged {
            address: *address,
            key,
            prev,
        });
    }

    fn suicide(&mut self, address: &Address) -> bool {
        let Some(obj) = self.objects.get_mut(address) else {
            return false;
        };
        let prev_suicided = obj.account.suicided;
        let prev_balance = obj.account.balance;
        obj.account.suicided = true;
        obj.account.balance = U256::zero();
        self.journal.record(JournalEntry::Suicided {
            address: *address,
            prev_suicided,
            prev_balance,
        });
        true
    }

    fn has_suicided(&self, address: &Address) -> bool {
        self.objects
            .get(address)
            .map(|obj| obj.account.suicided)
            .unwrap_or(false)
    }

    fn add_refund(&mut self, gas: u64) {
        self.journal.record(JournalEntry::RefundChanged { prev: self.refund });
        self.refund = self.refund.saturating_add(gas);
    }

    fn get_refund(&self) -> u64 {
        self.refund
    }

    fn snapshot(&mut self) -> SnapshotId {
        self.journal.snapshot()
    }

    fn revert_to_snapshot(&mut self, id: SnapshotId) {
        if let Err(e) = self.revert(id) {
            warn!(error = %e, "ignoring revert to stale snapshot");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_crypto::KECCAK_EMPTY;
    use proptest::prelude::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn word(n: u64) -> H256 {
        H256::from_word(U256::from(n))
    }

    fn setup_state() -> MemoryState {
        let mut state = MemoryState::new();
        state.insert_account(
            addr(1),
            U256::from(1_000u64),
            5,
            Bytes::from_static(&[0x60, 0x00]),
            vec![(word(1), word(11))],
        );
        state
    }

    #[test]
    fn test_missing_account_defaults() {
        let state = MemoryState::new();
        assert!(!state.exists(&addr(9)));
        assert_eq!(state.get_balance(&addr(9)), U256::zero());
        assert_eq!(state.get_nonce(&addr(9)), 0);
        assert_eq!(state.get_code_hash(&addr(9)), H256::ZERO);
        assert!(state.get_code(&addr(9)).is_empty());
        assert!(state.get_storage(&addr(9), &word(1)).is_zero());
    }

    #[test]
    fn test_insert_account_hashes_code() {
        let state = setup_state();
        assert_eq!(state.get_code_hash(&addr(1)), keccak256(&[0x60, 0x00]));
        assert_eq!(state.get_code_size(&addr(1)), 2);
        assert_eq!(state.get_storage(&addr(1), &word(1)), word(11));
    }

    #[test]
    fn test_create_account_keeps_balance_only() {
        let mut state = setup_state();
        state.create_account(addr(1));
        assert_eq!(state.get_balance(&addr(1)), U256::from(1_000u64));
        assert_eq!(state.get_nonce(&addr(1)), 0);
        assert_eq!(state.get_code_hash(&addr(1)), KECCAK_EMPTY);
        assert!(state.get_storage(&addr(1), &word(1)).is_zero());
    }

    #[test]
    fn test_revert_restores_everything() {
        let mut state = setup_state();
        let before = state.clone();
        let snap = state.snapshot();

        state.add_balance(&addr(2), U256::from(7u64));
        state.sub_balance(&addr(1), U256::from(7u64));
        state.set_nonce(&addr(1), 6);
        state.set_code(&addr(1), Bytes::from_static(&[0x00]));
        state.set_storage(&addr(1), word(1), H256::ZERO);
        state.set_storage(&addr(1), word(2), word(22));
        state.add_refund(15_000);
        assert!(state.suicide(&addr(1)));
        state.create_account(addr(3));

        state.revert_to_snapshot(snap);

        assert_eq!(state.objects, before.objects);
        assert_eq!(state.get_refund(), 0);
        assert!(!state.exists(&addr(2)));
        assert!(!state.exists(&addr(3)));
    }

    #[test]
    fn test_nested_snapshots() {
        let mut state = setup_state();
        let outer = state.snapshot();
        state.set_storage(&addr(1), word(5), word(50));
        let inner = state.snapshot();
        state.set_storage(&addr(1), word(5), word(51));

        state.revert_to_snapshot(inner);
        assert_eq!(state.get_storage(&addr(1), &word(5)), word(50));

        state.revert_to_snapshot(outer);
        assert!(state.get_storage(&addr(1), &word(5)).is_zero());
    }

    #[test]
    fn test_revert_invalidates_later_snapshots() {
        let mut state = setup_state();
        let outer = state.snapshot();
        let inner = state.snapshot();
        state.revert_to_snapshot(outer);
        assert_eq!(state.revert(inner), Err(StateError::InvalidSnapshot(inner)));
    }

    #[test]
    fn test_suicide_and_finalise() {
        let mut state = setup_state();
        assert!(!state.suicide(&addr(42)));
        assert!(state.suicide(&addr(1)));
        assert!(state.has_suicided(&addr(1)));
        assert!(state.exists(&addr(1)));
        assert_eq!(state.get_balance(&addr(1)), U256::zero());

        state.add_refund(24_000);
        state.finalise();
        assert!(!state.exists(&addr(1)));
        assert_eq!(state.get_refund(), 0);
    }

    #[test]
    fn test_try_sub_balance() {
        let mut state = setup_state();
        assert!(state.try_sub_balance(&addr(1), U256::from(400u64)).is_ok());
        assert_eq!(state.get_balance(&addr(1)), U256::from(600u64));
        assert!(matches!(
            state.try_sub_balance(&addr(1), U256::from(601u64)),
            Err(StateError::InsufficientBalance { .. })
        ));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u8, u64),
        Nonce(u8, u64),
        Store(u8, u8, u64),
        Code(u8, Vec<u8>),
        Create(u8),
        Suicide(u8),
        Snapshot,
        RevertLast,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..4, 0u64..1000).prop_map(|(a, v)| Op::Add(a, v)),
            (0u8..4, 0u64..10).prop_map(|(a, n)| Op::Nonce(a, n)),
            (0u8..4, 0u8..4, 0u64..3).prop_map(|(a, k, v)| Op::Store(a, k, v)),
            (0u8..4, proptest::collection::vec(any::<u8>(), 0..4)).prop_map(|(a, c)| Op::Code(a, c)),
            (0u8..4).prop_map(Op::Create),
            (0u8..4).prop_map(Op::Suicide),
            Just(Op::Snapshot),
            Just(Op::RevertLast),
        ]
    }

    proptest! {
        #[test]
        fn prop_revert_restores_pre_snapshot_state(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let mut state = setup_state();
            let before = state.objects.clone();
            let root = state.snapshot();
            let mut live = vec![];

            for op in ops {
                match op {
                    Op::Add(a, v) => state.add_balance(&addr(a as u64), U256::from(v)),
                    Op::Nonce(a, n) => state.set_nonce(&addr(a as u64), n),
                    Op::Store(a, k, v) => state.set_storage(&addr(a as u64), word(k as u64), word(v)),
                    Op::Code(a, c) => state.set_code(&addr(a as u64), Bytes::from(c)),
                    Op::Create(a) => state.create_account(addr(a as u64)),
                    Op::Suicide(a) => { state.suicide(&addr(a as u64)); }
                    Op::Snapshot => live.push(state.snapshot()),
                    Op::RevertLast => {
                        if let Some(id) = live.pop() {
                            state.revert_to_snapshot(id);
                        }
                    }
                }
            }

            state.revert_to_snapshot(root);
            prop_assert_eq!(state.objects, before);
        }
    }
}
