//! # ember-types
//!
//! Execution output types for the Ember execution core.
//!
//! This crate provides:
//! - [`Log`] - events emitted by `LOG0..LOG4`
//! - [`Bloom`] - the 2048-bit filter indexing log addresses and topics
//! - [`Receipt`] - per-transaction execution receipt

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bloom;
pub mod log;
pub mod receipt;

// Re-export commonly used types
pub use bloom::{bloom_lookup, create_bloom, logs_bloom, Bloom, BLOOM_BYTE_LENGTH};
pub use log::{Log, MAX_TOPICS};
pub use receipt::{Receipt, TxStatus};
