//! # ember-crypto
//!
//! Cryptographic primitives for the Ember execution core.
//!
//! - Keccak-256, SHA-256 and RIPEMD-160 digests
//! - secp256k1 signing and public key recovery
//! - Contract address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;
mod signature;

pub use address::create_address;
pub use error::{CryptoError, CryptoResult};
pub use hash::{keccak256, ripemd160, sha256, KECCAK_EMPTY};
pub use signature::{
    public_key_to_address, recover_address, recover_public_key, sign, PrivateKey, PublicKey,
    Signature,
};
