//! Applying one message to the state

use std::sync::Arc;

use bytes::Bytes;
use ember_evm::{Destinations, Environment, Evm, EvmError, PrecompileRegistry, RuleSet};
use ember_primitives::{Address, U256};
use ember_state::{MemoryState, State};
use ember_types::Log;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::message::{BlockEnv, Message};

/// Base cost of every transaction
pub const TX_GAS: u64 = 21_000;
/// Base cost of a contract creation from Homestead on
pub const TX_GAS_CONTRACT_CREATION: u64 = 53_000;
/// Per zero byte of data
pub const TX_DATA_ZERO_GAS: u64 = 4;
/// Per non-zero byte of data
pub const TX_DATA_NON_ZERO_GAS: u64 = 68;

/// Gas left in the block being built
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasPool(u64);

impl GasPool {
    /// Pool holding `gas`
    pub fn new(gas: u64) -> Self {
        Self(gas)
    }

    /// Gas left
    pub fn gas(&self) -> u64 {
        self.0
    }

    /// Reserve `amount` for a message
    pub fn sub_gas(&mut self, amount: u64) -> CoreResult<()> {
        if self.0 < amount {
            return Err(CoreError::BlockGasLimitExceeded {
                requested: amount,
                available: self.0,
            });
        }
        self.0 -= amount;
        Ok(())
    }

    /// Return unused gas
    pub fn add_gas(&mut self, amount: u64) {
        self.0 = self.0.saturating_add(amount);
    }
}

/// What applying a message produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// Return data of the outermost frame
    pub output: Bytes,
    /// Gas charged after refunds
    pub gas_used: u64,
    /// Refund credited back to the sender
    pub refund: u64,
    /// Logs of frames that completed, unstamped
    pub logs: Vec<Log>,
    /// Address of the created contract
    pub contract_address: Option<Address>,
    /// Why the outermost frame failed
    pub error: Option<EvmError>,
}

impl ExecutionOutcome {
    /// Whether the outermost frame completed
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Gas charged before any code runs
pub fn intrinsic_gas(data: &[u8], contract_creation: bool, homestead: bool) -> u64 {
    let base = if contract_creation && homestead {
        TX_GAS_CONTRACT_CREATION
    } else {
        TX_GAS
    };
    let zeros = data.iter().filter(|b| **b == 0).count() as u64;
    let non_zeros = data.len() as u64 - zeros;
    base + zeros * TX_DATA_ZERO_GAS + non_zeros * TX_DATA_NON_ZERO_GAS
}

/// Apply `msg` to `state` and finalise it.
///
/// Every [`CoreError`] is raised before the state is touched. Once the
/// checks pass the message always produces an outcome, failed frames
/// included; the sender then pays for the gas it used.
pub fn apply_message(
    state: &mut MemoryState,
    block: &BlockEnv,
    rules: &dyn RuleSet,
    precompiles: &PrecompileRegistry,
    destinations: Arc<Destinations>,
    msg: &Message,
    pool: &mut GasPool,
) -> CoreResult<ExecutionOutcome> {
    let nonce = state.get_nonce(&msg.from);
    if nonce != msg.nonce {
        return Err(CoreError::NonceMismatch {
            expected: nonce,
            got: msg.nonce,
        });
    }

    let gas_cost = U256::from(msg.gas_limit)
        .checked_mul(msg.gas_price)
        .unwrap_or(U256::MAX);
    let required = gas_cost.saturating_add(msg.value);
    let available = state.get_balance(&msg.from);
    if available < required {
        return Err(CoreError::InsufficientBalance { required, available });
    }

    let homestead = rules.is_homestead(block.number);
    let intrinsic = intrinsic_gas(&msg.data, msg.is_create(), homestead);
    if msg.gas_limit < intrinsic {
        return Err(CoreError::IntrinsicGas {
            required: intrinsic,
            limit: msg.gas_limit,
        });
    }
    pool.sub_gas(msg.gas_limit)?;

    state.sub_balance(&msg.from, gas_cost);
    let gas = msg.gas_limit - intrinsic;

    let env = Environment::new(block.context(), msg.from, msg.gas_price);
    let (result, logs) = {
        let mut evm = Evm::new(state, env, rules, precompiles).with_destinations(destinations);
        let result = match msg.to {
            Some(to) => {
                evm.state_mut().set_nonce(&msg.from, nonce + 1);
                evm.call(msg.from, to, msg.data.clone(), gas, msg.value)
            }
            None => evm.create(msg.from, msg.data.clone(), gas, msg.value),
        };
        let logs = evm.take_logs();
        (result, logs)
    };

    let mut gas_left = result.gas_left;
    let refund = state.get_refund().min((msg.gas_limit - gas_left) / 2);
    gas_left += refund;
    let gas_used = msg.gas_limit - gas_left;

    state.add_balance(&msg.from, U256::from(gas_left) * msg.gas_price);
    state.add_balance(&block.coinbase, U256::from(gas_used) * msg.gas_price);
    pool.add_gas(gas_left);
    state.finalise();

    debug!(
        from = %msg.from,
        gas_used,
        refund,
        success = result.error.is_none(),
        "message applied"
    );

    Ok(ExecutionOutcome {
        output: result.output,
        gas_used,
        refund,
        logs,
        contract_address: result.created.filter(|_| {
            result.error.is_none() || result.error == Some(EvmError::CodeStoreOutOfGas)
        }),
        error: result.error,
    })
}
