//! Event logs emitted by LOG0..LOG4

use std::fmt;

use bytes::Bytes;
use ember_primitives::{Address, H256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

use crate::bloom::Bloom;

/// Maximum number of topics a single log may carry
pub const MAX_TOPICS: usize = 4;

/// Log entry emitted during execution.
///
/// The consensus fields are `address`, `topics` and `data`; the rest are
/// filled in once the enclosing transaction is placed in a block and are
/// not part of the RLP encoding.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Log {
    /// Contract address that emitted the log
    pub address: Address,
    /// Log topics (indexed parameters)
    pub topics: Vec<H256>,
    /// Log data (non-indexed parameters)
    pub data: Bytes,

    /// Number of the block containing the transaction
    pub block_number: u64,
    /// Hash of the transaction that emitted the log
    pub tx_hash: H256,
    /// Position of the transaction in its block
    pub tx_index: u64,
    /// Hash of the block containing the transaction
    pub block_hash: H256,
    /// Position of the log among all logs of the block
    pub index: u64,
}

impl Log {
    /// Create a new log entry with empty derived fields
    pub fn new(address: Address, topics: Vec<H256>, data: impl Into<Bytes>) -> Self {
        Self {
            address,
            topics,
            data: data.into(),
            ..Default::default()
        }
    }

    /// Get the first topic (usually the event signature)
    pub fn topic0(&self) -> Option<&H256> {
        self.topics.first()
    }

    /// Create bloom filter for this log
    pub fn bloom(&self) -> Bloom {
        crate::bloom::logs_bloom(std::slice::from_ref(self))
    }
}

impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "log: {} [", self.address)?;
        for (i, topic) in self.topics.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", topic)?;
        }
        write!(
            f,
            "] 0x{} {} {} {} {}",
            hex::encode(&self.data),
            self.tx_hash,
            self.tx_index,
            self.block_hash,
            self.index
        )
    }
}

impl Encodable for Log {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.address);
        s.append_list::<H256, H256>(&self.topics);
        s.append(&self.data.to_vec());
    }
}

impl Decodable for Log {
    fn decode(rlp: &Rlp) -> Result<Self, DecoderError> {
        if rlp.item_count()? != 3 {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let data: Vec<u8> = rlp.val_at(2)?;
        Ok(Log::new(rlp.val_at(0)?, rlp.list_at(1)?, data))
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{Serialize, Serializer};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct LogJson<'a> {
        address: &'a Address,
        topics: &'a [H256],
        data: String,
        block_number: String,
        transaction_hash: &'a H256,
        transaction_index: String,
        block_hash: &'a H256,
        log_index: String,
    }

    impl Serialize for Log {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            LogJson {
                address: &self.address,
                topics: &self.topics,
                data: format!("0x{}", hex::encode(&self.data)),
                block_number: format!("{:#x}", self.block_number),
                transaction_hash: &self.tx_hash,
                transaction_index: format!("{:#x}", self.tx_index),
                block_hash: &self.block_hash,
                log_index: format!("{:#x}", self.index),
            }
            .serialize(serializer)
        }
    }
}
