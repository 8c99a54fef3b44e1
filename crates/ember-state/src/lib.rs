//! # ember-state
//!
//! World-state access for the Ember execution core.
//!
//! This crate provides:
//! - [`State`] - the capability the interpreter and orchestrator execute against
//! - [`MemoryState`] - a journaled in-memory implementation with nested snapshots
//! - [`Account`] - account header (balance, nonce, code hash, suicided flag)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod error;
mod journal;
mod memory;
mod traits;

pub use account::Account;
pub use error::{StateError, StateResult};
pub use memory::MemoryState;
pub use traits::{SnapshotId, State};
