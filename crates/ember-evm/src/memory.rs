//! EVM memory

use primitive_types::U256;

/// Byte-addressable frame memory. It only grows, always to a whole
/// number of words; the interpreter charges for growth before calling
/// [`Memory::resize`], so accessors never expand it themselves.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Current size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether nothing has been touched yet
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grow to cover `size` bytes, rounded up to a whole word
    pub fn resize(&mut self, size: u64) {
        let aligned = size.div_ceil(32) * 32;
        if aligned as usize > self.data.len() {
            self.data.resize(aligned as usize, 0);
        }
    }

    /// Load a 32-byte word
    pub fn load(&self, offset: usize) -> U256 {
        U256::from_big_endian(&self.data[offset..offset + 32])
    }

    /// Store a 32-byte word
    pub fn store(&mut self, offset: usize, value: U256) {
        value.to_big_endian(&mut self.data[offset..offset + 32]);
    }

    /// Store a single byte
    pub fn store8(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    /// Copy `size` bytes out of memory
    pub fn get(&self, offset: usize, size: usize) -> Vec<u8> {
        if size == 0 {
            return Vec::new();
        }
        self.data[offset..offset + size].to_vec()
    }

    /// Borrow `size` bytes of memory
    pub fn slice(&self, offset: usize, size: usize) -> &[u8] {
        if size == 0 {
            return &[];
        }
        &self.data[offset..offset + size]
    }

    /// Write `size` bytes at `offset`, taking them from the front of
    /// `value`. Missing source bytes leave memory untouched.
    pub fn set(&mut self, offset: usize, size: usize, value: &[u8]) {
        let n = size.min(value.len());
        if n == 0 {
            return;
        }
        self.data[offset..offset + n].copy_from_slice(&value[..n]);
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `size` bytes of `data` starting at `start`, zero-padded past its end.
/// Used by the copy opcodes and CALLDATALOAD.
pub fn padded_slice(data: &[u8], start: U256, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    if start < U256::from(data.len()) {
        let start = start.low_u64() as usize;
        let end = data.len().min(start.saturating_add(size));
        out[..end - start].copy_from_slice(&data[start..end]);
    }
    out
}
