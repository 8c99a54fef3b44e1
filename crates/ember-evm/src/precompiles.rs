//! Native contracts at reserved addresses
//!
//! Each contract prices its input before running and never fails: bad
//! input yields empty output, which callers read as "no result".

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use ember_crypto::{recover_address, ripemd160, sha256, Signature};
use ember_primitives::{Address, H256};
use substrate_bn as bn;
use tracing::trace;

/// A native contract
pub trait Precompile: Send + Sync {
    /// Gas charged for running on `input`
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Run on `input`. Invalid input returns empty output.
    fn run(&self, input: &[u8]) -> Bytes;
}

fn words(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

/// `input` zero-extended (or truncated) to exactly `len` bytes
fn padded(input: &[u8], len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    let n = input.len().min(len);
    out[..n].copy_from_slice(&input[..n]);
    out
}

fn word(data: &[u8], offset: usize) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&data[offset..offset + 32]);
    out
}

fn left_pad_32(data: &[u8]) -> Bytes {
    let mut out = [0u8; 32];
    out[32 - data.len()..].copy_from_slice(data);
    Bytes::copy_from_slice(&out)
}

/// 0x01: secp256k1 public key recovery from `(hash, v, r, s)`
#[derive(Clone, Copy, Debug, Default)]
pub struct EcRecover;

impl Precompile for EcRecover {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        3000
    }

    fn run(&self, input: &[u8]) -> Bytes {
        let input = padded(input, 128);
        let hash = H256::from_bytes(word(&input, 0));
        // v is read from the low byte of its word
        let signature = Signature::new(word(&input, 64), word(&input, 96), input[63]);

        // the low-s rule only binds transaction signatures
        if !signature.has_valid_values(false) {
            trace!("ecrecover: v, r or s out of range");
            return Bytes::new();
        }
        match recover_address(&hash, &signature) {
            Ok(address) => left_pad_32(address.as_bytes()),
            Err(e) => {
                trace!(error = %e, "ecrecover failed");
                Bytes::new()
            }
        }
    }
}

/// 0x02: SHA-256
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256;

impl Precompile for Sha256 {
    fn required_gas(&self, input: &[u8]) -> u64 {
        60 + 12 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Bytes {
        Bytes::copy_from_slice(&sha256(input))
    }
}

/// 0x03: RIPEMD-160, left-padded to a word
#[derive(Clone, Copy, Debug, Default)]
pub struct Ripemd160;

impl Precompile for Ripemd160 {
    fn required_gas(&self, input: &[u8]) -> u64 {
        600 + 120 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Bytes {
        left_pad_32(&ripemd160(input))
    }
}

/// 0x04: identity
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl Precompile for Identity {
    fn required_gas(&self, input: &[u8]) -> u64 {
        15 + 3 * words(input.len())
    }

    fn run(&self, input: &[u8]) -> Bytes {
        Bytes::copy_from_slice(input)
    }
}

/// Read a G1 point from 64 bytes; all zeroes is the point at infinity
fn read_g1(data: &[u8]) -> Option<bn::G1> {
    use bn::Group;

    let x = bn::Fq::from_slice(&data[0..32]).ok()?;
    let y = bn::Fq::from_slice(&data[32..64]).ok()?;
    if x == bn::Fq::zero() && y == bn::Fq::zero() {
        return Some(bn::G1::zero());
    }
    bn::AffineG1::new(x, y).ok().map(Into::into)
}

/// Read a G2 point from 128 bytes laid out as
/// `x.imag, x.real, y.imag, y.real`
fn read_g2(data: &[u8]) -> Option<bn::G2> {
    use bn::Group;

    let x_imag = bn::Fq::from_slice(&data[0..32]).ok()?;
    let x_real = bn::Fq::from_slice(&data[32..64]).ok()?;
    let y_imag = bn::Fq::from_slice(&data[64..96]).ok()?;
    let y_real = bn::Fq::from_slice(&data[96..128]).ok()?;

    let x = bn::Fq2::new(x_real, x_imag);
    let y = bn::Fq2::new(y_real, y_imag);
    if x.is_zero() && y.is_zero() {
        return Some(bn::G2::zero());
    }
    bn::AffineG2::new(x, y).ok().map(Into::into)
}

/// 64-byte encoding of a G1 point, infinity as zeroes
fn encode_g1(point: bn::G1) -> Option<Bytes> {
    let mut out = [0u8; 64];
    if let Some(affine) = bn::AffineG1::from_jacobian(point) {
        affine.x().to_big_endian(&mut out[0..32]).ok()?;
        affine.y().to_big_endian(&mut out[32..64]).ok()?;
    }
    Some(Bytes::copy_from_slice(&out))
}

/// 0x06: bn256 G1 point addition
#[derive(Clone, Copy, Debug, Default)]
pub struct Bn256Add;

impl Precompile for Bn256Add {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        500
    }

    fn run(&self, input: &[u8]) -> Bytes {
        let input = padded(input, 128);
        let sum = read_g1(&input[0..64])
            .zip(read_g1(&input[64..128]))
            .and_then(|(a, b)| encode_g1(a + b));
        sum.unwrap_or_default()
    }
}

/// 0x07: bn256 G1 scalar multiplication
#[derive(Clone, Copy, Debug, Default)]
pub struct Bn256ScalarMul;

impl Precompile for Bn256ScalarMul {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        40000
    }

    fn run(&self, input: &[u8]) -> Bytes {
        let input = padded(input, 96);
        let Some(point) = read_g1(&input[0..64]) else {
            return Bytes::new();
        };
        let Ok(scalar) = bn::Fr::from_slice(&input[64..96]) else {
            return Bytes::new();
        };
        encode_g1(point * scalar).unwrap_or_default()
    }
}

/// Size of one `(G1, G2)` pair in pairing input
const PAIR_LEN: usize = 192;

/// 0x08: bn256 pairing check
#[derive(Clone, Copy, Debug, Default)]
pub struct Bn256Pairing;

impl Precompile for Bn256Pairing {
    fn required_gas(&self, input: &[u8]) -> u64 {
        100_000 + 80_000 * (input.len() / PAIR_LEN) as u64
    }

    fn run(&self, input: &[u8]) -> Bytes {
        if input.len() % PAIR_LEN != 0 {
            return Bytes::new();
        }
        let mut pairs = Vec::with_capacity(input.len() / PAIR_LEN);
        for chunk in input.chunks_exact(PAIR_LEN) {
            let (Some(g1), Some(g2)) = (read_g1(&chunk[0..64]), read_g2(&chunk[64..192])) else {
                return Bytes::new();
            };
            pairs.push((g1, g2));
        }

        let mut out = [0u8; 32];
        if pairs.is_empty() || bn::pairing_batch(&pairs) == bn::Gt::one() {
            out[31] = 1;
        }
        Bytes::copy_from_slice(&out)
    }
}

/// Immutable map from reserved addresses to native contracts.
///
/// Built once and handed to the orchestrator; nothing mutates it during
/// execution.
pub struct PrecompileRegistry {
    contracts: BTreeMap<Address, Box<dyn Precompile>>,
}

impl PrecompileRegistry {
    /// Registry with no contracts
    pub fn empty() -> Self {
        Self {
            contracts: BTreeMap::new(),
        }
    }

    /// The standard contracts at 0x01-0x04 and 0x06-0x08
    pub fn standard() -> Self {
        Self::empty()
            .with(Address::from_low_u64(1), EcRecover)
            .with(Address::from_low_u64(2), Sha256)
            .with(Address::from_low_u64(3), Ripemd160)
            .with(Address::from_low_u64(4), Identity)
            .with(Address::from_low_u64(6), Bn256Add)
            .with(Address::from_low_u64(7), Bn256ScalarMul)
            .with(Address::from_low_u64(8), Bn256Pairing)
    }

    /// Add or replace the contract at `address`
    pub fn with(mut self, address: Address, contract: impl Precompile + 'static) -> Self {
        self.contracts.insert(address, Box::new(contract));
        self
    }

    /// Contract at `address`
    pub fn get(&self, address: &Address) -> Option<&dyn Precompile> {
        self.contracts.get(address).map(|c| c.as_ref())
    }

    /// Whether `address` is reserved
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Reserved addresses in ascending order
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.contracts.keys()
    }
}

impl Default for PrecompileRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for PrecompileRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrecompileRegistry")
            .field("addresses", &self.contracts.keys().collect::<Vec<_>>())
            .finish()
    }
}
