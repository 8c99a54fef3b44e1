//! 2048-bit log bloom filter

use std::fmt;

use ember_crypto::keccak256;

use crate::log::Log;
use crate::receipt::Receipt;

/// Size of the filter in bytes
pub const BLOOM_BYTE_LENGTH: usize = 256;

/// Logs bloom filter (2048 bits = 256 bytes).
///
/// The byte layout is consensus-critical: bit `b` of the 2048-bit
/// big-endian integer lives in byte `255 - b / 8` under mask `1 << (b % 8)`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bloom(pub [u8; BLOOM_BYTE_LENGTH]);

impl Default for Bloom {
    fn default() -> Self {
        Self::ZERO
    }
}

/// The three bit positions an input sets: 11-bit windows taken from
/// byte pairs (0,1), (2,3) and (4,5) of its Keccak-256 digest.
fn bloom_bits(input: &[u8]) -> [usize; 3] {
    let hash = keccak256(input);
    let h = hash.as_bytes();
    let mut bits = [0usize; 3];
    for (i, bit) in bits.iter_mut().enumerate() {
        *bit = (((h[i * 2] as usize) << 8) | h[i * 2 + 1] as usize) & 2047;
    }
    bits
}

impl Bloom {
    /// Empty bloom filter
    pub const ZERO: Bloom = Bloom([0u8; BLOOM_BYTE_LENGTH]);

    /// Create bloom from bytes
    pub fn from_bytes(bytes: [u8; BLOOM_BYTE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a bloom from a big-endian byte string of at most 256 bytes,
    /// right-aligned the way a big integer would be.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        if data.len() > BLOOM_BYTE_LENGTH {
            return None;
        }
        let mut bytes = [0u8; BLOOM_BYTE_LENGTH];
        bytes[BLOOM_BYTE_LENGTH - data.len()..].copy_from_slice(data);
        Some(Self(bytes))
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; BLOOM_BYTE_LENGTH] {
        &self.0
    }

    /// Check if bloom filter is empty
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Add data to bloom filter
    pub fn accrue(&mut self, input: &[u8]) {
        for bit in bloom_bits(input) {
            self.0[BLOOM_BYTE_LENGTH - 1 - bit / 8] |= 1 << (bit % 8);
        }
    }

    /// Check if bloom might contain the input. False positives are
    /// possible, false negatives are not.
    pub fn contains(&self, input: &[u8]) -> bool {
        bloom_bits(input)
            .iter()
            .all(|bit| self.0[BLOOM_BYTE_LENGTH - 1 - bit / 8] & (1 << (bit % 8)) != 0)
    }

    /// Combine with another bloom filter (OR)
    pub fn accrue_bloom(&mut self, other: &Bloom) {
        for (a, b) in self.0.iter_mut().zip(other.0.iter()) {
            *a |= *b;
        }
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom({})", self.to_hex())
    }
}

/// Bloom over the address and every topic of each log
pub fn logs_bloom(logs: &[Log]) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for log in logs {
        bloom.accrue(log.address.as_bytes());
        for topic in &log.topics {
            bloom.accrue(topic.as_bytes());
        }
    }
    bloom
}

/// Bloom over the logs of every receipt, as stored in a block header
pub fn create_bloom(receipts: &[Receipt]) -> Bloom {
    let mut bloom = Bloom::ZERO;
    for receipt in receipts {
        bloom.accrue_bloom(&logs_bloom(&receipt.logs));
    }
    bloom
}

/// Whether `topic` (an address or a topic, as raw bytes) may be present
pub fn bloom_lookup(bloom: &Bloom, topic: &[u8]) -> bool {
    bloom.contains(topic)
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Bloom {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Bloom {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s)).map_err(de::Error::custom)?;
            Bloom::from_slice(&bytes).ok_or_else(|| de::Error::custom("bloom longer than 256 bytes"))
        }
    }
}
