//! # ember-evm-tests
//!
//! JSON fixture runner for the Ember EVM.
//!
//! This crate provides:
//! - Serde model of the VM test and state test fixture formats
//! - A VM test runner driving the interpreter directly
//! - A state test runner driving the transaction state transition
//! - Post-state and log comparison, result aggregation and reporting
//!
//! ## Test Formats
//!
//! ### VM tests
//! One frame of code with its environment, pre state and the expected
//! remaining gas, output, logs and post state.
//!
//! ### State tests
//! One signed transaction with its block environment and pre state. The
//! expected result is either the full post state or, per fork, a list of
//! results keyed by transaction variant.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod runner;
mod types;
mod world;

pub use config::{fixture_fork_key, load_rules, FixtureConfig, SUPPORTED_FORKS};
pub use error::{TestError, TestResult};
pub use runner::{FileResults, FixtureKind, TestRunner, TestStats};
pub use state_test::{StateExecution, StateTestRunner};
pub use types::*;
pub use vm_test::{VmExecution, VmTestRunner};
pub use world::{build_state, check_logs, check_post_state, fixture_block_hashes, logs_hash};
