//! Undo log backing snapshot/revert

use bytes::Bytes;
use ember_primitives::{Address, H256, U256};

use crate::memory::StateObject;

/// One reversible mutation. Each entry records what is needed to restore
/// the value it overwrote.
#[derive(Debug, Clone)]
pub(crate) enum JournalEntry {
    /// Account created or replaced; `prev` is what was there before
    AccountCreated {
        address: Address,
        prev: Option<Box<StateObject>>,
    },
    BalanceChanged {
        address: Address,
        prev: U256,
    },
    NonceChanged {
        address: Address,
        prev: u64,
    },
    CodeChanged {
        address: Address,
        prev_code: Bytes,
        prev_hash: H256,
    },
    StorageChanged {
        address: Address,
        key: H256,
        prev: H256,
    },
    Suicided {
        address: Address,
        prev_suicided: bool,
        prev_balance: U256,
    },
    RefundChanged {
        prev: u64,
    },
}

/// Ordered undo log with the journal length at each live snapshot
#[derive(Debug, Default, Clone)]
pub(crate) struct Journal {
    entries: Vec<JournalEntry>,
    /// (snapshot id, journal length when taken), ascending by id
    revisions: Vec<(usize, usize)>,
    next_id: usize,
}

impl Journal {
    pub(crate) fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn snapshot(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.revisions.push((id, self.entries.len()));
        id
    }

    /// Remove and return the entries recorded since snapshot `id`, newest
    /// first, dropping `id` and every later snapshot. `None` if `id` is
    /// not live.
    pub(crate) fn unwind(&mut self, id: usize) -> Option<Vec<JournalEntry>> {
        let pos = self.revisions.iter().position(|(rid, _)| *rid == id)?;
        let (_, len) = self.revisions[pos];
        self.revisions.truncate(pos);
        let mut undone = self.entries.split_off(len);
        undone.reverse();
        Some(undone)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.revisions.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
