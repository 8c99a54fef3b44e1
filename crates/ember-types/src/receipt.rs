//! Transaction receipts

use ember_primitives::{Address, H256};
use rlp::{Encodable, RlpStream};

use crate::bloom::{logs_bloom, Bloom};
use crate::log::Log;

/// Transaction execution status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxStatus {
    /// Transaction failed
    Failure = 0,
    /// Transaction succeeded
    Success = 1,
}

impl From<bool> for TxStatus {
    fn from(success: bool) -> Self {
        if success {
            TxStatus::Success
        } else {
            TxStatus::Failure
        }
    }
}

/// Transaction receipt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction status (success/failure)
    pub status: TxStatus,
    /// Cumulative gas used in the block up to this transaction
    pub cumulative_gas_used: u64,
    /// Gas used by this transaction
    pub gas_used: u64,
    /// Logs emitted by this transaction
    pub logs: Vec<Log>,
    /// Bloom filter for the logs
    pub logs_bloom: Bloom,
    /// Hash of the transaction
    pub tx_hash: H256,
    /// Contract address created (if contract creation tx)
    pub contract_address: Option<Address>,
}

impl Receipt {
    /// Create a new receipt; the bloom is derived from `logs`
    pub fn new(status: TxStatus, cumulative_gas_used: u64, gas_used: u64, logs: Vec<Log>) -> Self {
        let logs_bloom = logs_bloom(&logs);
        Self {
            status,
            cumulative_gas_used,
            gas_used,
            logs,
            logs_bloom,
            tx_hash: H256::ZERO,
            contract_address: None,
        }
    }

    /// Create a receipt with contract address
    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }

    /// Attach the transaction hash
    pub fn with_tx_hash(mut self, tx_hash: H256) -> Self {
        self.tx_hash = tx_hash;
        self
    }

    /// Check if transaction succeeded
    pub fn is_success(&self) -> bool {
        self.status == TxStatus::Success
    }
}

/// Consensus encoding: `[status, cumulative_gas_used, bloom, logs]`
impl Encodable for Receipt {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&(self.status as u8));
        s.append(&self.cumulative_gas_used);
        s.append(&self.logs_bloom.as_bytes().to_vec());
        s.append_list::<Log, Log>(&self.logs);
    }
}
