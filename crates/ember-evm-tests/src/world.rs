//! Seeding and checking world state and logs

use std::collections::BTreeMap;

use ember_crypto::keccak256;
use ember_primitives::{Address, H256};
use ember_state::{MemoryState, State};
use ember_types::Log;

use crate::error::{TestError, TestResult};
use crate::types::{LogsExpectation, WorldState};

/// Ancestors visible to BLOCKHASH: fixtures define the hash of block `n`
/// as the Keccak-256 of its decimal representation
pub fn fixture_block_hashes(number: u64) -> BTreeMap<u64, H256> {
    (number.saturating_sub(256)..number)
        .map(|n| (n, keccak256(n.to_string().as_bytes())))
        .collect()
}

/// Build a state holding exactly the accounts of `world`
pub fn build_state(world: &WorldState) -> MemoryState {
    let mut state = MemoryState::new();
    for (address, account) in world {
        let storage = account
            .storage
            .iter()
            .map(|(key, value)| (H256::from_word(key.0), H256::from_word(value.0)));
        state.insert_account(
            address.0,
            account.balance.0,
            account.nonce.0,
            account.code.0.clone(),
            storage,
        );
    }
    state
}

/// Compare `state` against an expected world: every listed account
/// must match and no other account may exist
pub fn check_post_state(state: &MemoryState, expected: &WorldState) -> TestResult<()> {
    for (address, account) in expected {
        let address = &address.0;
        let balance = state.get_balance(address);
        if balance != account.balance.0 {
            return Err(mismatch(address, "balance", account.balance.0, balance));
        }
        let nonce = state.get_nonce(address);
        if nonce != account.nonce.0 {
            return Err(mismatch(address, "nonce", account.nonce.0, nonce));
        }
        let code = state.get_code(address);
        if code != account.code.0 {
            return Err(mismatch(
                address,
                "code",
                hex::encode(&account.code.0),
                hex::encode(&code),
            ));
        }

        let want: BTreeMap<H256, H256> = account
            .storage
            .iter()
            .filter(|(_, value)| !value.0.is_zero())
            .map(|(key, value)| (H256::from_word(key.0), H256::from_word(value.0)))
            .collect();
        let got: BTreeMap<H256, H256> = state.storage(address).into_iter().collect();
        if want != got {
            return Err(mismatch(address, "storage", format!("{:?}", want), format!("{:?}", got)));
        }
    }

    let listed: Vec<Address> = expected.keys().map(|a| a.0).collect();
    if let Some((extra, _)) = state.accounts().find(|(address, _)| !listed.contains(address)) {
        return Err(TestError::Assertion(format!("unexpected account {}", extra)));
    }
    Ok(())
}

/// Keccak-256 of the RLP list of logs, as fixtures hash them
pub fn logs_hash(logs: &[Log]) -> H256 {
    keccak256(&rlp::encode_list::<Log, _>(logs))
}

/// Compare emitted logs against the fixture's expectation
pub fn check_logs(logs: &[Log], expected: &LogsExpectation) -> TestResult<()> {
    match expected {
        LogsExpectation::Hash(hash) => {
            let got = logs_hash(logs);
            if got != hash.0 {
                return Err(TestError::Assertion(format!(
                    "logs hash mismatch: expected {}, got {} ({} logs)",
                    hash.0,
                    got,
                    logs.len()
                )));
            }
        }
        LogsExpectation::Entries(entries) => {
            if entries.len() != logs.len() {
                return Err(TestError::Assertion(format!(
                    "log count mismatch: expected {}, got {}",
                    entries.len(),
                    logs.len()
                )));
            }
            for (i, (entry, log)) in entries.iter().zip(logs).enumerate() {
                let topics: Vec<H256> = entry.topics.iter().map(|t| t.0).collect();
                if entry.address.0 != log.address || topics != log.topics || entry.data.0 != log.data {
                    return Err(TestError::Assertion(format!(
                        "log {} mismatch: expected {} {:?} 0x{}, got {} {:?} 0x{}",
                        i,
                        entry.address.0,
                        topics,
                        hex::encode(&entry.data.0),
                        log.address,
                        log.topics,
                        hex::encode(&log.data)
                    )));
                }
            }
        }
    }
    Ok(())
}

fn mismatch(address: &Address, field: &str, want: impl std::fmt::Display, got: impl std::fmt::Display) -> TestError {
    TestError::Assertion(format!("{} {}: expected {}, got {}", address, field, want, got))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountState, HexAddress, HexBytes, HexH256, HexU256, HexU64, LogEntry};
    use bytes::Bytes;
    use ember_primitives::U256;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    fn world() -> WorldState {
        let mut storage = BTreeMap::new();
        storage.insert(HexU256(U256::one()), HexU256(U256::from(7)));
        storage.insert(HexU256(U256::from(2)), HexU256(U256::zero()));
        let mut world = WorldState::new();
        world.insert(
            HexAddress(addr(1)),
            AccountState {
                balance: HexU256(U256::from(100)),
                code: HexBytes(Bytes::from_static(&[0x00])),
                nonce: HexU64(3),
                storage,
            },
        );
        world
    }

    #[test]
    fn test_build_then_check_matches() {
        let world = world();
        let state = build_state(&world);
        assert_eq!(state.get_storage(&addr(1), &H256::from_word(U256::one())), H256::from_word(U256::from(7)));
        check_post_state(&state, &world).unwrap();
    }

    #[test]
    fn test_check_reports_field_and_extra_account() {
        let world = world();
        let mut state = build_state(&world);
        state.add_balance(&addr(1), U256::one());
        let err = check_post_state(&state, &world).unwrap_err().to_string();
        assert!(err.contains("balance"), "{}", err);

        let mut state = build_state(&world);
        state.create_account(addr(9));
        let err = check_post_state(&state, &world).unwrap_err().to_string();
        assert!(err.contains("unexpected account"), "{}", err);
    }

    #[test]
    fn test_empty_logs_hash() {
        // keccak256(rlp([]))
        let expected = H256::from_hex("1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347").unwrap();
        assert_eq!(logs_hash(&[]), expected);
        check_logs(&[], &LogsExpectation::Hash(HexH256(expected))).unwrap();
    }

    #[test]
    fn test_log_entries_compared_in_order() {
        let log = Log::new(addr(5), vec![H256::from_word(U256::one())], vec![0xaa]);
        let entry = LogEntry {
            address: HexAddress(addr(5)),
            data: HexBytes(Bytes::from_static(&[0xaa])),
            topics: vec![HexH256(H256::from_word(U256::one()))],
        };
        check_logs(std::slice::from_ref(&log), &LogsExpectation::Entries(vec![entry.clone()])).unwrap();

        let other = Log::new(addr(6), vec![], vec![]);
        assert!(check_logs(&[other], &LogsExpectation::Entries(vec![entry])).is_err());
    }

    #[test]
    fn test_block_hashes_window() {
        let hashes = fixture_block_hashes(300);
        assert_eq!(hashes.len(), 256);
        assert_eq!(hashes[&299], keccak256(b"299"));
        assert!(!hashes.contains_key(&43));
        assert!(fixture_block_hashes(0).is_empty());
    }
}
