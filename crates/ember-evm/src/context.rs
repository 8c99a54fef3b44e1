//! Execution context for EVM

use std::collections::BTreeMap;

use bytes::Bytes;
use ember_primitives::{Address, H256};
use primitive_types::U256;

/// One nested execution: the code being run, who runs it and with what
/// budget. Owned by a single interpreter for its lifetime.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Code being executed
    pub code: Bytes,
    /// Hash of `code`, the jump analysis cache key
    pub code_hash: H256,
    /// Account the code was loaded from. `None` for init code.
    pub code_address: Option<Address>,
    /// Call data
    pub input: Bytes,
    /// Gas remaining
    pub gas: u64,
    /// Gas price of the transaction
    pub gas_price: U256,
    /// Call value in wei
    pub value: U256,
    /// Caller address
    pub caller: Address,
    /// Account whose storage and balance the code acts on
    pub address: Address,
    /// Whether caller and value were inherited from the parent frame
    pub is_delegate: bool,
    /// Call depth, 1 for the outermost frame
    pub depth: usize,
}

impl CallFrame {
    /// Frame running `code` on behalf of `address`
    pub fn new(caller: Address, address: Address, code: Bytes, code_hash: H256, gas: u64) -> Self {
        Self {
            code,
            code_hash,
            code_address: Some(address),
            input: Bytes::new(),
            gas,
            gas_price: U256::zero(),
            value: U256::zero(),
            caller,
            address,
            is_delegate: false,
            depth: 1,
        }
    }

    /// Set call data
    pub fn with_input(mut self, input: Bytes) -> Self {
        self.input = input;
        self
    }

    /// Set call value
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set gas price
    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }
}

/// Block environment information
#[derive(Clone, Debug)]
pub struct BlockContext {
    /// Block number
    pub number: u64,
    /// Block coinbase (miner)
    pub coinbase: Address,
    /// Block timestamp
    pub timestamp: u64,
    /// Block difficulty
    pub difficulty: U256,
    /// Block gas limit
    pub gas_limit: u64,
    /// Hashes of recent ancestors by number. BLOCKHASH sees at most the
    /// last 256; missing entries read as zero.
    pub hashes: BTreeMap<u64, H256>,
}

impl BlockContext {
    /// Hash of block `number` as seen by BLOCKHASH
    pub fn block_hash(&self, number: U256) -> H256 {
        let lowest = self.number.saturating_sub(256);
        if number >= U256::from(self.number) || number < U256::from(lowest) {
            return H256::ZERO;
        }
        self.hashes
            .get(&number.low_u64())
            .copied()
            .unwrap_or(H256::ZERO)
    }
}

impl Default for BlockContext {
    fn default() -> Self {
        Self {
            number: 0,
            coinbase: Address::ZERO,
            timestamp: 0,
            difficulty: U256::zero(),
            gas_limit: 30_000_000,
            hashes: BTreeMap::new(),
        }
    }
}

/// Per-transaction execution environment
#[derive(Clone, Debug, Default)]
pub struct Environment {
    /// Block context
    pub block: BlockContext,
    /// Transaction origin (original sender)
    pub origin: Address,
    /// Gas price
    pub gas_price: U256,
}

impl Environment {
    /// Create new environment
    pub fn new(block: BlockContext, origin: Address, gas_price: U256) -> Self {
        Self {
            block,
            origin,
            gas_price,
        }
    }
}
