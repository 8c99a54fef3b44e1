//! secp256k1 signatures and public key recovery

use std::cmp::Ordering;

use ember_primitives::{Address, H256};
use k256::ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey};

use crate::{keccak256, CryptoError, CryptoResult};

/// Half of the secp256k1 curve order (n/2)
const SECP256K1_N_DIV_2: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D,
    0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

/// Full secp256k1 curve order (n)
const SECP256K1_N: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B,
    0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Public key
pub type PublicKey = VerifyingKey;

/// Private key (32 bytes)
pub type PrivateKey = SigningKey;

/// ECDSA signature with an Ethereum-style `v` (27 or 28)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// r component (32 bytes)
    pub r: [u8; 32],
    /// s component (32 bytes)
    pub s: [u8; 32],
    /// 27 or 28
    pub v: u8,
}

impl Signature {
    /// Create signature from r, s, v components
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Signature { r, s, v }
    }

    /// Recovery ID (0 or 1) encoded in `v`
    pub fn recovery_id(&self) -> u8 {
        self.v.saturating_sub(27)
    }

    /// Check if signature has low-s value
    pub fn is_low_s(&self) -> bool {
        compare_bytes(&self.s, &SECP256K1_N_DIV_2) != Ordering::Greater
    }

    /// Range checks applied before recovery: `v` is 27 or 28 and both
    /// scalars lie in `[1, n)`. With `require_low_s` the upper bound for
    /// `s` tightens to `n/2`, as transaction signatures require from
    /// Homestead on. The ECRECOVER contract never requires it.
    pub fn has_valid_values(&self, require_low_s: bool) -> bool {
        if self.v != 27 && self.v != 28 {
            return false;
        }
        if is_zero(&self.r) || is_zero(&self.s) {
            return false;
        }
        if compare_bytes(&self.r, &SECP256K1_N) != Ordering::Less {
            return false;
        }
        if require_low_s {
            compare_bytes(&self.s, &SECP256K1_N_DIV_2) != Ordering::Greater
        } else {
            compare_bytes(&self.s, &SECP256K1_N) == Ordering::Less
        }
    }
}

fn is_zero(a: &[u8; 32]) -> bool {
    a.iter().all(|b| *b == 0)
}

/// Compare two 32-byte arrays as big-endian integers
fn compare_bytes(a: &[u8; 32], b: &[u8; 32]) -> Ordering {
    a.iter().cmp(b.iter())
}

/// n - s, used to move a signature between its high-s and low-s forms
fn subtract_from_n(s: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow: u16 = 0;

    for i in (0..32).rev() {
        let diff = (SECP256K1_N[i] as u16)
            .wrapping_sub(s[i] as u16)
            .wrapping_sub(borrow);
        result[i] = diff as u8;
        borrow = if diff > 255 { 1 } else { 0 };
    }

    result
}

/// Sign a message hash, producing a low-s signature
pub fn sign(message_hash: &H256, private_key: &PrivateKey) -> CryptoResult<Signature> {
    let (signature, mut recovery_id) = private_key
        .sign_prehash_recoverable(message_hash.as_bytes())
        .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

    let r_bytes: [u8; 32] = signature.r().to_bytes().into();
    let mut s_bytes: [u8; 32] = signature.s().to_bytes().into();

    if compare_bytes(&s_bytes, &SECP256K1_N_DIV_2) == Ordering::Greater {
        s_bytes = subtract_from_n(&s_bytes);
        recovery_id = RecoveryId::try_from(recovery_id.to_byte() ^ 1)
            .map_err(|_| CryptoError::InvalidRecoveryId(recovery_id.to_byte() ^ 1))?;
    }

    Ok(Signature {
        r: r_bytes,
        s: s_bytes,
        v: recovery_id.to_byte() + 27,
    })
}

/// Recover the signer's public key.
///
/// High-s signatures are accepted: (r, s, id) and (r, n - s, id ^ 1)
/// recover the same key, so the low-s twin is used for the actual
/// recovery.
pub fn recover_public_key(message_hash: &H256, signature: &Signature) -> CryptoResult<PublicKey> {
    let mut s = signature.s;
    let mut id = signature.recovery_id();
    if id > 1 {
        return Err(CryptoError::InvalidRecoveryId(id));
    }
    if !signature.is_low_s() {
        s = subtract_from_n(&s);
        id ^= 1;
    }

    let r: k256::FieldBytes = signature.r.into();
    let s: k256::FieldBytes = s.into();
    let k256_sig = K256Signature::from_scalars(r, s)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let recovery_id = RecoveryId::try_from(id).map_err(|_| CryptoError::InvalidRecoveryId(id))?;

    VerifyingKey::recover_from_prehash(message_hash.as_bytes(), &k256_sig, recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))
}

/// Derive the account address of a public key: the low 20 bytes of the
/// Keccak-256 of the uncompressed point without its 0x04 prefix.
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let encoded = public_key.to_encoded_point(false);
    let hash = keccak256(&encoded.as_bytes()[1..]);
    Address::from_hash(&hash)
}

/// Recover the signer's address
pub fn recover_address(message_hash: &H256, signature: &Signature) -> CryptoResult<Address> {
    recover_public_key(message_hash, signature).map(|pk| public_key_to_address(&pk))
}
