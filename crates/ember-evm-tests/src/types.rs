//! Serde model of the JSON fixture formats
//!
//! Quantities follow the fixture convention: a `0x` prefix means hex,
//! anything else is decimal. Older fixtures mix both in one file.

use std::collections::BTreeMap;

use bytes::Bytes;
use ember_primitives::{Address, H256, U256};
use serde::{Deserialize, Deserializer};

fn parse_quantity(s: &str) -> Result<U256, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some("") => Ok(U256::zero()),
        Some(digits) => U256::from_str_radix(digits, 16).map_err(|e| format!("invalid hex quantity {:?}: {:?}", s, e)),
        None if s.is_empty() => Ok(U256::zero()),
        None => U256::from_dec_str(s).map_err(|e| format!("invalid decimal quantity {:?}: {:?}", s, e)),
    }
}

/// Hex-encoded bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HexBytes(pub Bytes);

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        if s.is_empty() {
            return Ok(HexBytes(Bytes::new()));
        }
        hex::decode(s)
            .map(|bytes| HexBytes(Bytes::from(bytes)))
            .map_err(serde::de::Error::custom)
    }
}

/// 256-bit quantity, hex or decimal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexU256(pub U256);

impl<'de> Deserialize<'de> for HexU256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        parse_quantity(&s).map(HexU256).map_err(serde::de::Error::custom)
    }
}

/// 64-bit quantity, hex or decimal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HexU64(pub u64);

impl<'de> Deserialize<'de> for HexU64 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let value = parse_quantity(&s).map_err(serde::de::Error::custom)?;
        if value > U256::from(u64::MAX) {
            return Err(serde::de::Error::custom(format!("quantity {} does not fit in 64 bits", s)));
        }
        Ok(HexU64(value.low_u64()))
    }
}

/// Address, with or without `0x`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HexAddress(pub Address);

impl<'de> Deserialize<'de> for HexAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        Address::from_hex(&s).map(HexAddress).map_err(serde::de::Error::custom)
    }
}

/// 32-byte hash; shorter values are left-padded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HexH256(pub H256);

impl<'de> Deserialize<'de> for HexH256 {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        let bytes = hex::decode(s).map_err(serde::de::Error::custom)?;
        if bytes.len() > 32 {
            return Err(serde::de::Error::custom(format!("hash too long: {} bytes", bytes.len())));
        }
        let mut result = [0u8; 32];
        result[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(HexH256(H256::from_bytes(result)))
    }
}

/// A single value or a list indexed by the post-state selectors
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    /// Scalar field of the older format
    One(T),
    /// Variants selected by index
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Value at `index`; a scalar only answers index 0
    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            OneOrMany::One(value) => (index == 0).then_some(value),
            OneOrMany::Many(values) => values.get(index),
        }
    }
}

// =============================================================================
// Shared
// =============================================================================

/// World state keyed by address
pub type WorldState = BTreeMap<HexAddress, AccountState>;

/// Account in a pre or post state
#[derive(Debug, Clone, Deserialize)]
pub struct AccountState {
    /// Balance
    pub balance: HexU256,
    /// Code
    pub code: HexBytes,
    /// Nonce
    pub nonce: HexU64,
    /// Storage
    #[serde(default)]
    pub storage: BTreeMap<HexU256, HexU256>,
}

/// One expected log
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    /// Emitting contract
    pub address: HexAddress,
    /// Payload
    pub data: HexBytes,
    /// Topics in order
    pub topics: Vec<HexH256>,
}

/// Expected logs: newer fixtures hash the RLP list, older ones spell
/// the entries out
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LogsExpectation {
    /// Keccak-256 of the RLP encoded log list
    Hash(HexH256),
    /// Entries in emission order
    Entries(Vec<LogEntry>),
}

// =============================================================================
// VM tests
// =============================================================================

/// VM test file: test name to case
pub type VmTestFile = BTreeMap<String, VmTestCase>;

/// A call or create made by the frame under test. VM tests record
/// these instead of running the callee.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallCreate {
    /// Call data, or the init code of a create
    pub data: HexBytes,
    /// Callee; empty for a create
    pub destination: HexBytes,
    /// Gas handed to the callee, stipend included
    pub gas_limit: HexU64,
    /// Value sent along
    pub value: HexU256,
}

/// Single VM test case
#[derive(Debug, Clone, Deserialize)]
pub struct VmTestCase {
    /// Block environment
    pub env: VmEnv,
    /// Frame to run
    pub exec: VmExec,
    /// Calls and creates the frame makes, in order
    pub callcreates: Option<Vec<CallCreate>>,
    /// Gas left afterwards; absent when the frame must fail
    pub gas: Option<HexU64>,
    /// Expected logs
    pub logs: Option<LogsExpectation>,
    /// Expected output
    pub out: Option<HexBytes>,
    /// State before execution
    pub pre: WorldState,
    /// State afterwards; absent when the frame must fail
    pub post: Option<WorldState>,
}

/// Block environment of a VM test
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmEnv {
    /// Current coinbase
    pub current_coinbase: HexAddress,
    /// Current difficulty
    pub current_difficulty: HexU256,
    /// Current gas limit
    pub current_gas_limit: HexU64,
    /// Current block number
    pub current_number: HexU64,
    /// Current timestamp
    pub current_timestamp: HexU64,
}

/// Frame parameters of a VM test
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmExec {
    /// Account the code runs against
    pub address: HexAddress,
    /// Caller
    pub caller: HexAddress,
    /// Code to run
    pub code: HexBytes,
    /// Call data
    pub data: HexBytes,
    /// Gas provided
    pub gas: HexU64,
    /// Gas price
    pub gas_price: HexU256,
    /// Transaction origin
    pub origin: HexAddress,
    /// Call value
    pub value: HexU256,
}

// =============================================================================
// State tests
// =============================================================================

/// State test file: test name to case
pub type StateTestFile = BTreeMap<String, StateTestCase>;

/// Single state test case
#[derive(Debug, Clone, Deserialize)]
pub struct StateTestCase {
    /// Block environment
    pub env: StateEnv,
    /// State before the transaction
    pub pre: WorldState,
    /// The transaction, possibly with indexed variants
    pub transaction: StateTransaction,
    /// Expected outcome
    pub post: StatePost,
    /// Expected output (older format)
    pub out: Option<HexBytes>,
    /// Expected logs (older format)
    pub logs: Option<LogsExpectation>,
}

/// Block environment of a state test
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEnv {
    /// Current coinbase
    pub current_coinbase: HexAddress,
    /// Current difficulty
    pub current_difficulty: HexU256,
    /// Current gas limit
    pub current_gas_limit: HexU64,
    /// Current block number
    pub current_number: HexU64,
    /// Current timestamp
    pub current_timestamp: HexU64,
    /// Parent hash
    pub previous_hash: Option<HexH256>,
}

/// State test transaction
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransaction {
    /// Call data or init code variants
    pub data: OneOrMany<HexBytes>,
    /// Gas limit variants
    pub gas_limit: OneOrMany<HexU64>,
    /// Gas price
    pub gas_price: HexU256,
    /// Sender nonce
    pub nonce: HexU64,
    /// Sender key
    pub secret_key: HexH256,
    /// Recipient, empty for contract creation
    #[serde(default)]
    pub to: String,
    /// Value variants
    pub value: OneOrMany<HexU256>,
}

/// Expected post state: the full world (older format) or, per fork, a
/// list of results keyed by transaction variant
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatePost {
    /// Full post state
    Accounts(WorldState),
    /// Fork name to results
    Forks(BTreeMap<String, Vec<PostStateResult>>),
}

/// Expected result for one transaction variant
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostStateResult {
    /// State root
    pub hash: HexH256,
    /// Variant selector
    pub indexes: IndexSelector,
    /// Hash of the RLP encoded logs
    pub logs: Option<HexH256>,
    /// Set when the transaction must be rejected
    pub expect_exception: Option<String>,
}

/// Index selector for transaction variants
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct IndexSelector {
    /// Data index
    pub data: usize,
    /// Gas index
    pub gas: usize,
    /// Value index
    pub value: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_bytes_deserialize() {
        let bytes: HexBytes = serde_json::from_str(r#""0x1234""#).unwrap();
        assert_eq!(bytes.0.as_ref(), &[0x12, 0x34]);

        let empty: HexBytes = serde_json::from_str(r#""0x""#).unwrap();
        assert!(empty.0.is_empty());
    }

    #[test]
    fn test_quantities_hex_or_decimal() {
        let hex: HexU256 = serde_json::from_str(r#""0x100""#).unwrap();
        let dec: HexU256 = serde_json::from_str(r#""256""#).unwrap();
        assert_eq!(hex, dec);
        assert_eq!(hex.0, U256::from(256));

        let gas: HexU64 = serde_json::from_str(r#""1000000""#).unwrap();
        assert_eq!(gas.0, 1_000_000);
        let odd: HexU64 = serde_json::from_str(r#""0x1""#).unwrap();
        assert_eq!(odd.0, 1);
    }

    #[test]
    fn test_u64_overflow_rejected() {
        assert!(serde_json::from_str::<HexU64>(r#""0x10000000000000000""#).is_err());
    }

    #[test]
    fn test_address_with_and_without_prefix() {
        let a: HexAddress = serde_json::from_str(r#""0x0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6""#).unwrap();
        let b: HexAddress = serde_json::from_str(r#""0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6""#).unwrap();
        assert_eq!(a, b);
        assert!(serde_json::from_str::<HexAddress>(r#""0x1234""#).is_err());
    }

    #[test]
    fn test_short_hash_left_padded() {
        let h: HexH256 = serde_json::from_str(r#""0x01""#).unwrap();
        assert_eq!(h.0, H256::from_word(U256::one()));
    }

    #[test]
    fn test_logs_hash_or_entries() {
        let hash: LogsExpectation =
            serde_json::from_str(r#""0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347""#).unwrap();
        assert!(matches!(hash, LogsExpectation::Hash(_)));

        let entries: LogsExpectation = serde_json::from_str(
            r#"[{"address": "0x0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6", "bloom": "00", "data": "0x", "topics": []}]"#,
        )
        .unwrap();
        assert!(matches!(entries, LogsExpectation::Entries(ref e) if e.len() == 1));
    }

    #[test]
    fn test_callcreate_with_empty_destination() {
        let create: CallCreate = serde_json::from_str(
            r#"{"data": "0x600160005401", "destination": "", "gasLimit": "0x0186a0", "value": "0x17"}"#,
        )
        .unwrap();
        assert!(create.destination.0.is_empty());
        assert_eq!(create.gas_limit, HexU64(100_000));
        assert_eq!(create.value, HexU256(U256::from(0x17)));
        assert_eq!(create.data.0.len(), 6);
    }

    #[test]
    fn test_state_post_formats() {
        let accounts: StatePost = serde_json::from_str(
            r#"{"0x0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6": {"balance": "1", "code": "0x", "nonce": "0", "storage": {}}}"#,
        )
        .unwrap();
        assert!(matches!(accounts, StatePost::Accounts(_)));

        let forks: StatePost = serde_json::from_str(
            r#"{"Homestead": [{"hash": "0x00", "indexes": {"data": 0, "gas": 0, "value": 0}}]}"#,
        )
        .unwrap();
        assert!(matches!(forks, StatePost::Forks(ref f) if f["Homestead"].len() == 1));
    }

    #[test]
    fn test_one_or_many() {
        let one: OneOrMany<HexU64> = serde_json::from_str(r#""0x5""#).unwrap();
        assert_eq!(one.get(0).map(|v| v.0), Some(5));
        assert!(one.get(1).is_none());

        let many: OneOrMany<HexU64> = serde_json::from_str(r#"["0x5", "0x6"]"#).unwrap();
        assert_eq!(many.get(1).map(|v| v.0), Some(6));
    }
}
