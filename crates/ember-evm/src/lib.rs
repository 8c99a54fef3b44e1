//! # ember-evm
//!
//! EVM execution core for Ember.
//!
//! This crate provides:
//! - Fork-dependent gas tables and the rule set that selects them
//! - Jump destination analysis with a shared cache
//! - The opcode dispatch table and bytecode interpreter
//! - Native contracts at addresses 1-4 and 6-8
//! - Call, call-code, delegate-call and create orchestration with
//!   snapshot-based rollback

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod arith;
pub mod context;
pub mod error;
pub mod execution;
pub mod gas;
pub mod gas_table;
mod instructions;
pub mod interpreter;
pub mod jump_table;
pub mod memory;
pub mod opcode;
pub mod precompiles;
pub mod stack;

pub use analysis::Destinations;
pub use context::{BlockContext, CallFrame, Environment};
pub use error::{EvmError, EvmResult};
pub use execution::{CallKind, CallRequest, CallResult, Evm};
pub use gas_table::{ChainConfig, GasTable, RuleSet};
pub use interpreter::{Exit, Interpreter};
pub use jump_table::JumpTable;
pub use memory::Memory;
pub use opcode::Opcode;
pub use precompiles::{Precompile, PrecompileRegistry};
pub use stack::Stack;
