//! # ember-pow
//!
//! Concurrent proof-of-work nonce verification for Ember.
//!
//! [`verify_nonces`] checks a batch of items on a pool of worker threads
//! and streams `{index, valid}` results back as they complete. Results
//! arrive out of order; correlate them by [`NonceResult::index`].

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod verifier;

pub use error::{PowError, PowResult};
pub use verifier::{verify_nonces, verify_nonces_with_workers, AbortHandle, NonceResult, PowVerifier};
