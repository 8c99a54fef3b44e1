//! # ember-core
//!
//! Transaction-level state transition for the Ember execution core.
//!
//! This crate provides:
//! - [`apply_message`] - nonce check, gas purchase, intrinsic gas, execution,
//!   refunds and miner payment for one message
//! - [`BlockExecutor`] - runs messages in block order and produces receipts
//!   with stamped logs

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod executor;
pub mod message;
pub mod transition;

pub use error::{CoreError, CoreResult};
pub use executor::BlockExecutor;
pub use message::{BlockEnv, Message};
pub use transition::{apply_message, intrinsic_gas, ExecutionOutcome, GasPool};
