//! Jump destination analysis

use std::collections::HashMap;
use std::sync::Arc;

use ember_primitives::H256;
use parking_lot::RwLock;
use primitive_types::U256;
use tracing::debug;

use crate::opcode::Opcode;

/// Code blobs analysed before the cache starts over
pub const DEFAULT_CAPACITY: usize = 4096;

/// Valid JUMPDEST positions per code hash, one bit per code byte.
///
/// Code is content-addressed, so entries never go stale. The cache can be
/// shared between executions and holds at most `capacity` bitmaps; when
/// full it is emptied before the next insert.
#[derive(Debug)]
pub struct Destinations {
    cache: RwLock<HashMap<H256, Arc<[u8]>>>,
    capacity: usize,
}

impl Default for Destinations {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Destinations {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding at most `capacity` bitmaps
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Whether `dest` is a JUMPDEST in `code` rather than an opcode
    /// position inside PUSH data
    pub fn has(&self, code_hash: H256, code: &[u8], dest: U256) -> bool {
        // also rules out anything that does not fit in a usize
        if dest.bits() >= 63 || dest >= U256::from(code.len()) {
            return false;
        }
        let udest = dest.low_u64() as usize;
        let bitmap = self.bitmap(code_hash, code);
        bitmap[udest / 8] & (1 << (udest % 8)) != 0
    }

    /// Number of analysed code blobs
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Whether nothing has been analysed yet
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    fn bitmap(&self, code_hash: H256, code: &[u8]) -> Arc<[u8]> {
        if let Some(bitmap) = self.cache.read().get(&code_hash) {
            return bitmap.clone();
        }
        let bitmap: Arc<[u8]> = jump_dests(code).into();
        let mut cache = self.cache.write();
        if cache.len() >= self.capacity && !cache.contains_key(&code_hash) {
            debug!(entries = cache.len(), "jump analysis cache full, clearing");
            cache.clear();
        }
        cache.insert(code_hash, bitmap.clone());
        bitmap
    }
}

/// Scan `code` for JUMPDEST bytes, skipping PUSH immediates
pub fn jump_dests(code: &[u8]) -> Vec<u8> {
    let mut bitmap = vec![0u8; code.len() / 8 + 1];
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        if byte == Opcode::JUMPDEST as u8 {
            bitmap[pc / 8] |= 1 << (pc % 8);
        } else if let Some(op) = Opcode::from_byte(byte) {
            pc += op.push_size();
        }
        pc += 1;
    }
    bitmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_crypto::keccak256;

    fn has(code: &[u8], dest: u64) -> bool {
        Destinations::new().has(keccak256(code), code, U256::from(dest))
    }

    #[test]
    fn test_jumpdest_found() {
        // PUSH1 0x03 JUMP JUMPDEST
        let code = [0x60, 0x03, 0x56, 0x5b];
        assert!(has(&code, 3));
        assert!(!has(&code, 2));
    }

    #[test]
    fn test_jumpdest_inside_push_data() {
        // PUSH2 0x5b5b JUMPDEST
        let code = [0x61, 0x5b, 0x5b, 0x5b];
        assert!(!has(&code, 1));
        assert!(!has(&code, 2));
        assert!(has(&code, 3));
    }

    #[test]
    fn test_truncated_push_at_end() {
        // PUSH32 with only two data bytes
        let code = [0x5b, 0x7f, 0x5b, 0x5b];
        assert!(has(&code, 0));
        assert!(!has(&code, 2));
        assert!(!has(&code, 3));
    }

    #[test]
    fn test_out_of_range_destinations() {
        let code = [0x5b; 16];
        assert!(has(&code, 15));
        assert!(!has(&code, 16));
        let dests = Destinations::new();
        assert!(!dests.has(keccak256(&code), &code, U256::one() << 63));
        assert!(!dests.has(keccak256(&code), &code, U256::MAX));
        // rejected before analysis
        assert!(dests.is_empty());
    }

    #[test]
    fn test_cache_keyed_by_hash() {
        let dests = Destinations::new();
        let code = [0x5b, 0x00];
        let hash = keccak256(&code);
        assert!(dests.has(hash, &code, U256::zero()));
        assert!(dests.has(hash, &code, U256::zero()));
        assert_eq!(dests.len(), 1);

        let other = [0x00, 0x5b];
        assert!(dests.has(keccak256(&other), &other, U256::one()));
        assert_eq!(dests.len(), 2);
    }

    #[test]
    fn test_cache_stays_within_capacity() {
        let dests = Destinations::with_capacity(2);
        for n in 0..5u8 {
            let code = [0x5b, n];
            assert!(dests.has(keccak256(&code), &code, U256::zero()));
            assert!(dests.len() <= 2);
        }
        // a cleared entry is analysed again on demand
        let code = [0x60, 0x5b];
        assert!(!dests.has(keccak256(&code), &code, U256::one()));
        assert!(dests.len() <= 2);
    }

    #[test]
    fn test_bitmap_layout() {
        let mut code = vec![0u8; 17];
        code[9] = 0x5b;
        code[16] = 0x5b;
        let bitmap = jump_dests(&code);
        assert_eq!(bitmap.len(), 3);
        assert_eq!(bitmap, vec![0, 0b10, 0b1]);
    }
}
