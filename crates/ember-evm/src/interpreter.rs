//! EVM bytecode interpreter

use bytes::Bytes;
use ember_primitives::{Address, H256};
use ember_state::State;
use primitive_types::U256;
use tracing::trace;

use crate::context::CallFrame;
use crate::error::{EvmError, EvmResult};
use crate::execution::{CallRequest, CallResult, Evm};
use crate::gas::{self, cost};
use crate::gas_table::GasTable;
use crate::instructions;
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::stack::Stack;

/// Why [`Interpreter::execute`] returned
#[derive(Debug)]
pub enum Exit {
    /// The frame finished with this output
    Return(Bytes),
    /// The frame needs a callee run before it can continue
    Call(Box<CallRequest>),
}

/// How to finish the opcode a frame suspended on
#[derive(Clone, Copy, Debug)]
pub(crate) enum Resume {
    Call { out_offset: U256, out_size: U256 },
    Create,
}

/// Runs one frame's code to completion
#[derive(Debug)]
pub struct Interpreter {
    /// Frame being executed; its `gas` is the live counter
    pub frame: CallFrame,
    pub(crate) pc: usize,
    pub(crate) stack: Stack,
    pub(crate) memory: Memory,
    request: Option<Box<CallRequest>>,
    awaiting: Option<Resume>,
}

impl Interpreter {
    /// Create an interpreter for `frame`
    pub fn new(frame: CallFrame) -> Self {
        Self {
            frame,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            request: None,
            awaiting: None,
        }
    }

    /// Gas remaining
    pub fn gas_left(&self) -> u64 {
        self.frame.gas
    }

    /// Program counter
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Operand stack
    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    /// Frame memory
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Execute until the frame finishes, running every call it makes.
    /// Errors leave the gas counter wherever it was; the caller decides
    /// what to refund.
    pub fn run(&mut self, evm: &mut Evm<'_>) -> EvmResult<Bytes> {
        evm.drive(self)
    }

    /// Execute until STOP, RETURN, SUICIDE, the end of the code, an error
    /// or a call out. After [`Exit::Call`] the frame waits for
    /// [`Interpreter::resume`] with the callee's outcome.
    pub fn execute(&mut self, evm: &mut Evm<'_>) -> EvmResult<Exit> {
        loop {
            let byte = self.frame.code.get(self.pc).copied().unwrap_or(0);
            let operation = evm.jump_table.get(byte);
            if !operation.valid {
                return Err(EvmError::InvalidOpcode(byte));
            }
            let op = Opcode::from_byte(byte).ok_or(EvmError::InvalidOpcode(byte))?;

            let (pops, pushes) = op.stack_io();
            self.stack.require(pops, pushes)?;

            let (cost, memory_size) = self.gas_cost(op, evm)?;
            if self.frame.gas < cost {
                self.frame.gas = 0;
                return Err(EvmError::OutOfGas);
            }
            self.frame.gas -= cost;
            self.memory.resize(memory_size);

            trace!(pc = self.pc, op = %op, cost, gas = self.frame.gas, depth = self.frame.depth);

            if let Some(execute) = operation.execute {
                execute(self, evm)?;
                self.pc += 1;
                if let Some(request) = self.request.take() {
                    return Ok(Exit::Call(request));
                }
                continue;
            }

            match op {
                Opcode::STOP => return Ok(Exit::Return(Bytes::new())),
                Opcode::PC => self.stack.push(U256::from(self.pc))?,
                Opcode::JUMP => {
                    let dest = self.stack.pop()?;
                    self.jump(evm, dest)?;
                    continue;
                }
                Opcode::JUMPI => {
                    let dest = self.stack.pop()?;
                    let condition = self.stack.pop()?;
                    if !condition.is_zero() {
                        self.jump(evm, dest)?;
                        continue;
                    }
                }
                Opcode::RETURN => {
                    let offset = self.stack.pop()?;
                    let size = self.stack.pop()?;
                    if size.is_zero() {
                        return Ok(Exit::Return(Bytes::new()));
                    }
                    let data = self.memory.get(offset.low_u64() as usize, size.low_u64() as usize);
                    return Ok(Exit::Return(Bytes::from(data)));
                }
                Opcode::SUICIDE => {
                    instructions::op_suicide(self, evm)?;
                    return Ok(Exit::Return(Bytes::new()));
                }
                _ => return Err(EvmError::InvalidOpcode(byte)),
            }
            self.pc += 1;
        }
    }

    /// Complete the CALL or CREATE the frame suspended on
    pub fn resume(&mut self, result: CallResult, evm: &Evm<'_>) -> EvmResult<()> {
        match self.awaiting.take() {
            Some(Resume::Call { out_offset, out_size }) => {
                instructions::finish_call(self, result, out_offset, out_size)
            }
            Some(Resume::Create) => instructions::finish_create(self, result, evm.is_homestead()),
            None => Ok(()),
        }
    }

    /// Stop after the current opcode and hand `request` to the driver
    pub(crate) fn suspend(&mut self, request: CallRequest, resume: Resume) {
        self.request = Some(Box::new(request));
        self.awaiting = Some(resume);
    }

    fn jump(&mut self, evm: &Evm<'_>, dest: U256) -> EvmResult<()> {
        if !evm.destinations.has(self.frame.code_hash, &self.frame.code, dest) {
            return Err(EvmError::InvalidJumpDestination(dest));
        }
        self.pc = dest.low_u64() as usize;
        Ok(())
    }

    /// Stack word `n` below the top
    fn back(&self, n: usize) -> EvmResult<U256> {
        self.stack.peek(n).copied()
    }

    /// Memory needed by an access whose offset and length sit at stack
    /// positions `offset` and `len`
    fn access(&self, offset: usize, len: usize) -> EvmResult<u64> {
        gas::memory_size(self.back(offset)?, self.back(len)?)
    }

    /// Memory size `op` needs, in bytes
    fn memory_size(&self, op: Opcode) -> EvmResult<u64> {
        if op.log_topics().is_some() {
            return self.access(0, 1);
        }
        match op {
            Opcode::MLOAD | Opcode::MSTORE => gas::memory_size(self.back(0)?, U256::from(32)),
            Opcode::MSTORE8 => gas::memory_size(self.back(0)?, U256::one()),
            Opcode::SHA3 | Opcode::RETURN => self.access(0, 1),
            Opcode::CALLDATACOPY | Opcode::CODECOPY => self.access(0, 2),
            Opcode::EXTCODECOPY => self.access(1, 3),
            Opcode::CREATE => self.access(1, 2),
            Opcode::CALL | Opcode::CALLCODE => Ok(self.access(3, 4)?.max(self.access(5, 6)?)),
            Opcode::DELEGATECALL => Ok(self.access(2, 3)?.max(self.access(4, 5)?)),
            _ => Ok(0),
        }
    }

    /// Gas `op` costs at this point and the memory size it needs.
    /// CALL, CALLCODE and DELEGATECALL also replace their gas argument
    /// with the allowance the callee receives.
    fn gas_cost(&mut self, op: Opcode, evm: &Evm<'_>) -> EvmResult<(u64, u64)> {
        let table = evm.gas_table;
        let memory_size = self.memory_size(op)?;
        let memory_gas = gas::memory_gas(self.memory.len() as u64, memory_size)?;

        let mut total = gas::static_gas(op) + gas::table_gas(op, &table);
        let dynamic = match op {
            Opcode::EXP => {
                total = gas::exp_gas(self.back(1)?, &table);
                0
            }
            Opcode::SHA3 => {
                total = gas::sha3_gas(self.back(1)?.low_u64());
                memory_gas
            }
            _ if op.log_topics().is_some() => {
                let topics = op.log_topics().unwrap_or(0);
                total = gas::log_gas(topics, self.back(1)?.low_u64());
                memory_gas
            }
            Opcode::CALLDATACOPY | Opcode::CODECOPY => {
                add(memory_gas, gas::copy_gas(self.back(2)?.low_u64()))?
            }
            Opcode::EXTCODECOPY => add(memory_gas, gas::copy_gas(self.back(3)?.low_u64()))?,
            Opcode::SSTORE => {
                let key = H256::from_word(self.back(0)?);
                let current = evm.state.get_storage(&self.frame.address, &key).to_word();
                gas::sstore_gas(&current, &self.back(1)?).0
            }
            Opcode::CALL | Opcode::CALLCODE => {
                let to = Address::from_word(self.back(1)?);
                let transfers_value = !self.back(2)?.is_zero();
                let mut extra = memory_gas;
                if transfers_value {
                    extra += cost::CALL_VALUE;
                }
                if op == Opcode::CALL && self.needs_new_account(evm, &to, transfers_value) {
                    extra += cost::CALL_NEW_ACCOUNT;
                }
                self.charge_call(&table, total, extra)?
            }
            Opcode::DELEGATECALL => self.charge_call(&table, total, memory_gas)?,
            Opcode::SUICIDE => {
                let beneficiary = Address::from_word(self.back(0)?);
                match table.create_by_suicide {
                    Some(surcharge) if self.needs_suicide_account(evm, &beneficiary) => surcharge,
                    _ => 0,
                }
            }
            _ => memory_gas,
        };

        Ok((add(total, dynamic)?, memory_size))
    }

    /// Whether CALL pays for bringing `to` into existence
    fn needs_new_account(&self, evm: &Evm<'_>, to: &Address, transfers_value: bool) -> bool {
        if evm.is_atlantis() {
            transfers_value && is_empty(evm.state(), to)
        } else {
            !evm.state().exists(to)
        }
    }

    fn needs_suicide_account(&self, evm: &Evm<'_>, beneficiary: &Address) -> bool {
        if evm.is_atlantis() {
            is_empty(evm.state(), beneficiary)
                && !evm.state().get_balance(&self.frame.address).is_zero()
        } else {
            !evm.state().exists(beneficiary)
        }
    }

    /// Cost of a call beyond its table base `base`. Puts the callee
    /// allowance on the stack in place of the requested gas.
    fn charge_call(&mut self, table: &GasTable, base: u64, extra: u64) -> EvmResult<u64> {
        let base_total = add(base, extra)?;
        let allowance = gas::call_gas(table, self.frame.gas, base_total, self.back(0)?)?;
        self.stack.set(0, U256::from(allowance))?;
        add(extra, allowance)
    }
}

fn add(a: u64, b: u64) -> EvmResult<u64> {
    a.checked_add(b).ok_or(EvmError::OutOfGas)
}

/// Missing, or present with no nonce, balance or code
fn is_empty(state: &dyn State, address: &Address) -> bool {
    !matches!(state.get_account(address), Some(account) if !account.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ember_crypto::keccak256;
    use ember_state::MemoryState;

    use super::*;
    use crate::analysis::Destinations;
    use crate::context::{BlockContext, Environment};
    use crate::gas_table::ChainConfig;
    use crate::precompiles::PrecompileRegistry;

    fn addr(n: u64) -> Address {
        Address::from_low_u64(n)
    }

    /// Run `code` as the outermost frame of `addr(0xc0de)` at `block`
    fn run_at(code: &[u8], gas: u64, block: u64) -> (Interpreter, EvmResult<Bytes>) {
        let mut state = MemoryState::new();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let env = Environment {
            block: BlockContext {
                number: block,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut evm = Evm::new(&mut state, env, &rules, &precompiles);
        let code = Bytes::copy_from_slice(code);
        let frame = CallFrame::new(addr(1), addr(0xc0de), code.clone(), keccak256(&code), gas);
        let mut interp = Interpreter::new(frame);
        let result = interp.run(&mut evm);
        (interp, result)
    }

    fn run_code(code: &[u8], gas: u64) -> (Interpreter, EvmResult<Bytes>) {
        run_at(code, gas, 3_000_000)
    }

    fn top(interp: &Interpreter) -> U256 {
        *interp.stack().peek(0).unwrap()
    }

    #[test]
    fn test_add_and_gas() {
        // PUSH1 1 PUSH1 2 ADD STOP
        let (interp, result) = run_code(&[0x60, 0x01, 0x60, 0x02, 0x01, 0x00], 100);
        assert_eq!(result.unwrap(), Bytes::new());
        assert_eq!(top(&interp), U256::from(3));
        assert_eq!(interp.gas_left(), 100 - 9);
    }

    #[test]
    fn test_return_memory() {
        // PUSH1 0x2a PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN
        let code = [0x60, 0x2a, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];
        let (interp, result) = run_code(&code, 1000);
        let out = result.unwrap();
        assert_eq!(out.len(), 32);
        assert_eq!(out[31], 0x2a);
        // 4 pushes, MSTORE and one word of memory
        assert_eq!(interp.gas_left(), 1000 - (4 * 3 + 3 + 3));
    }

    #[test]
    fn test_running_off_the_end_stops() {
        let (_, result) = run_code(&[0x60, 0x01], 10);
        assert_eq!(result.unwrap(), Bytes::new());
    }

    #[test]
    fn test_truncated_push_is_right_padded() {
        let (interp, result) = run_code(&[0x61, 0xab], 10);
        assert!(result.is_ok());
        assert_eq!(top(&interp), U256::from(0xab00));
    }

    #[test]
    fn test_jump_to_jumpdest() {
        // PUSH1 4 JUMP INVALID JUMPDEST PUSH1 7
        let code = [0x60, 0x04, 0x56, 0xfe, 0x5b, 0x60, 0x07];
        let (interp, result) = run_code(&code, 100);
        assert!(result.is_ok());
        assert_eq!(top(&interp), U256::from(7));
    }

    #[test]
    fn test_jump_into_push_data_fails() {
        // PUSH1 3 JUMP PUSH1 0x5b
        let code = [0x60, 0x03, 0x56, 0x60, 0x5b];
        let (_, result) = run_code(&code, 100);
        assert_eq!(result, Err(EvmError::InvalidJumpDestination(U256::from(3))));
    }

    #[test]
    fn test_jumpi_falls_through_on_zero() {
        // PUSH1 0 PUSH1 0xff JUMPI PUSH1 9
        let code = [0x60, 0x00, 0x60, 0xff, 0x57, 0x60, 0x09];
        let (interp, result) = run_code(&code, 100);
        assert!(result.is_ok());
        assert_eq!(top(&interp), U256::from(9));
    }

    #[test]
    fn test_invalid_opcode() {
        let (_, result) = run_code(&[0xfe], 100);
        assert_eq!(result, Err(EvmError::InvalidOpcode(0xfe)));
    }

    #[test]
    fn test_stack_underflow() {
        let (_, result) = run_code(&[0x01], 100);
        assert_eq!(result, Err(EvmError::StackUnderflow));
    }

    #[test]
    fn test_out_of_gas_zeroes_counter() {
        let (interp, result) = run_code(&[0x60, 0x01, 0x60, 0x02, 0x01], 7);
        assert_eq!(result, Err(EvmError::OutOfGas));
        assert_eq!(interp.gas_left(), 0);
    }

    #[test]
    fn test_huge_memory_offset_is_out_of_gas() {
        // PUSH32 0xff.. MLOAD
        let mut code = vec![0x7f];
        code.extend_from_slice(&[0xff; 32]);
        code.push(0x51);
        let (_, result) = run_code(&code, 1_000_000);
        assert_eq!(result, Err(EvmError::OutOfGas));
    }

    #[test]
    fn test_exp_charges_per_exponent_byte() {
        // PUSH2 0x0100 PUSH1 2 EXP: exponent has two bytes
        let code = [0x61, 0x01, 0x00, 0x60, 0x02, 0x0a];
        let (interp, _) = run_at(&code, 1000, 1);
        assert_eq!(interp.gas_left(), 1000 - 6 - (10 + 2 * 10));
        let (interp, _) = run_code(&code, 1000);
        assert_eq!(interp.gas_left(), 1000 - 6 - (10 + 2 * 50));
    }

    #[test]
    fn test_sload_cost_follows_block() {
        // PUSH1 0 SLOAD
        let code = [0x60, 0x00, 0x54];
        let (interp, _) = run_at(&code, 1000, 1);
        assert_eq!(interp.gas_left(), 1000 - 3 - 50);
        let (interp, _) = run_at(&code, 1000, 2_500_000);
        assert_eq!(interp.gas_left(), 1000 - 3 - 200);
    }

    #[test]
    fn test_sstore_set_then_clear_refunds() {
        let mut state = MemoryState::new();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let mut evm = Evm::new(&mut state, Environment::default(), &rules, &precompiles);
        // PUSH1 1 PUSH1 0 SSTORE PUSH1 0 PUSH1 0 SSTORE
        let code = Bytes::from_static(&[0x60, 0x01, 0x60, 0x00, 0x55, 0x60, 0x00, 0x60, 0x00, 0x55]);
        let frame = CallFrame::new(addr(1), addr(2), code.clone(), keccak256(&code), 100_000);
        let mut interp = Interpreter::new(frame);
        interp.run(&mut evm).unwrap();
        assert_eq!(interp.gas_left(), 100_000 - 12 - 20_000 - 5_000);
        assert_eq!(evm.state().get_refund(), 15_000);
        assert_eq!(evm.state().get_storage(&addr(2), &H256::ZERO), H256::ZERO);
    }

    #[test]
    fn test_shared_destinations_cache() {
        let mut state = MemoryState::new();
        let rules = ChainConfig::classic_mainnet();
        let precompiles = PrecompileRegistry::standard();
        let cache = Arc::new(Destinations::new());
        let mut evm = Evm::new(&mut state, Environment::default(), &rules, &precompiles)
            .with_destinations(cache.clone());
        let code = Bytes::from_static(&[0x60, 0x03, 0x56, 0x5b]);
        let frame = CallFrame::new(addr(1), addr(2), code.clone(), keccak256(&code), 100);
        Interpreter::new(frame).run(&mut evm).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_environment_opcodes() {
        // CALLER ADDRESS CODESIZE
        let (interp, _) = run_code(&[0x33, 0x30, 0x38], 100);
        let stack = interp.stack().as_slice();
        assert_eq!(stack[0], addr(1).to_word());
        assert_eq!(stack[1], addr(0xc0de).to_word());
        assert_eq!(stack[2], U256::from(3));
    }

    #[test]
    fn test_sha3_of_empty_range() {
        // PUSH1 0 PUSH1 0 SHA3
        let (interp, _) = run_code(&[0x60, 0x00, 0x60, 0x00, 0x20], 100);
        assert_eq!(top(&interp), keccak256(&[]).to_word());
        assert_eq!(interp.gas_left(), 100 - 6 - 30);
    }
}
