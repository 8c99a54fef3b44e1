//! Block-level message execution

use std::sync::Arc;

use ember_evm::{Destinations, PrecompileRegistry, RuleSet};
use ember_primitives::H256;
use ember_state::MemoryState;
use ember_types::{create_bloom, Bloom, Receipt, TxStatus};
use tracing::info;

use crate::error::CoreResult;
use crate::message::{BlockEnv, Message};
use crate::transition::{apply_message, GasPool};

/// Applies messages in block order, tracking cumulative gas and producing
/// one receipt per message. The messages of the block share one bounded
/// jump analysis cache, dropped with the executor.
pub struct BlockExecutor<'a> {
    block: BlockEnv,
    rules: &'a dyn RuleSet,
    precompiles: &'a PrecompileRegistry,
    destinations: Arc<Destinations>,
    pool: GasPool,
    receipts: Vec<Receipt>,
    gas_used: u64,
    log_index: u64,
}

impl<'a> BlockExecutor<'a> {
    /// Executor for `block` under `rules`
    pub fn new(block: BlockEnv, rules: &'a dyn RuleSet, precompiles: &'a PrecompileRegistry) -> Self {
        let pool = GasPool::new(block.gas_limit);
        Self {
            block,
            rules,
            precompiles,
            destinations: Arc::new(Destinations::new()),
            pool,
            receipts: Vec::new(),
            gas_used: 0,
            log_index: 0,
        }
    }

    /// Apply `msg` as the next transaction of the block. A rejected
    /// message leaves both the state and the block untouched.
    pub fn execute(&mut self, state: &mut MemoryState, msg: &Message, tx_hash: H256) -> CoreResult<&Receipt> {
        let outcome = apply_message(
            state,
            &self.block,
            self.rules,
            self.precompiles,
            Arc::clone(&self.destinations),
            msg,
            &mut self.pool,
        )?;

        let tx_index = self.receipts.len() as u64;
        let mut logs = outcome.logs;
        for log in &mut logs {
            log.tx_hash = tx_hash;
            log.tx_index = tx_index;
            log.block_hash = self.block.hash;
            log.block_number = self.block.number;
            log.index = self.log_index;
            self.log_index += 1;
        }

        self.gas_used += outcome.gas_used;
        let status = TxStatus::from(outcome.error.is_none());
        let mut receipt = Receipt::new(status, self.gas_used, outcome.gas_used, logs).with_tx_hash(tx_hash);
        if let Some(address) = outcome.contract_address {
            receipt = receipt.with_contract_address(address);
        }
        info!(tx = %tx_hash, index = tx_index, gas_used = outcome.gas_used, ?status, "transaction executed");

        self.receipts.push(receipt);
        Ok(&self.receipts[self.receipts.len() - 1])
    }

    /// Block being executed
    pub fn block(&self) -> &BlockEnv {
        &self.block
    }

    /// Gas used so far
    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    /// Receipts so far, in execution order
    pub fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    /// Bloom over every receipt so far
    pub fn logs_bloom(&self) -> Bloom {
        create_bloom(&self.receipts)
    }

    /// Finish the block, returning its receipts
    pub fn into_receipts(self) -> Vec<Receipt> {
        self.receipts
    }
}
