//! Messages and block environment

use std::collections::BTreeMap;

use bytes::Bytes;
use ember_evm::BlockContext;
use ember_primitives::{Address, H256, U256};

/// A transaction with its sender already resolved
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Sender
    pub from: Address,
    /// Recipient, `None` for contract creation
    pub to: Option<Address>,
    /// Sender nonce the message was signed with
    pub nonce: u64,
    /// Value transferred
    pub value: U256,
    /// Gas limit
    pub gas_limit: u64,
    /// Gas price
    pub gas_price: U256,
    /// Call data, or init code for a creation
    pub data: Bytes,
}

impl Message {
    /// Plain call
    pub fn call(from: Address, to: Address, nonce: u64, gas_limit: u64, gas_price: U256) -> Self {
        Self {
            from,
            to: Some(to),
            nonce,
            value: U256::zero(),
            gas_limit,
            gas_price,
            data: Bytes::new(),
        }
    }

    /// Contract creation running `init_code`
    pub fn create(from: Address, nonce: u64, gas_limit: u64, gas_price: U256, init_code: Bytes) -> Self {
        Self {
            from,
            to: None,
            nonce,
            value: U256::zero(),
            gas_limit,
            gas_price,
            data: init_code,
        }
    }

    /// Set value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set call data
    pub fn with_data(mut self, data: Bytes) -> Self {
        self.data = data;
        self
    }

    /// Whether this creates a contract
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }
}

/// Block the messages execute in
#[derive(Clone, Debug, Default)]
pub struct BlockEnv {
    /// Block number
    pub number: u64,
    /// Hash of this block, stamped on receipts' logs
    pub hash: H256,
    /// Miner paid for gas
    pub coinbase: Address,
    /// Timestamp
    pub timestamp: u64,
    /// Difficulty
    pub difficulty: U256,
    /// Block gas limit
    pub gas_limit: u64,
    /// Recent ancestor hashes for BLOCKHASH
    pub hashes: BTreeMap<u64, H256>,
}

impl BlockEnv {
    /// Interpreter view of the block
    pub fn context(&self) -> BlockContext {
        BlockContext {
            number: self.number,
            coinbase: self.coinbase,
            timestamp: self.timestamp,
            difficulty: self.difficulty,
            gas_limit: self.gas_limit,
            hashes: self.hashes.clone(),
        }
    }
}
