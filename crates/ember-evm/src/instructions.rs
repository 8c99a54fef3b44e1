//! Opcode handlers
//!
//! Each handler runs after the interpreter loop has validated the stack,
//! charged gas and grown memory for the opcode, so memory offsets read
//! here always fit.

use bytes::Bytes;
use ember_crypto::keccak256;
use ember_primitives::{Address, H256};
use ember_types::Log;
use primitive_types::U256;

use crate::arith;
use crate::error::{EvmError, EvmResult};
use crate::execution::{CallResult, Evm};
use crate::gas::{all_but_one_64th, cost};
use crate::interpreter::{Interpreter, Resume};
use crate::memory::padded_slice;
use crate::opcode::Opcode;

/// Memory offset or length already bounded by the gas charge
#[inline]
fn to_usize(v: U256) -> usize {
    v.low_u64() as usize
}

/// Opcode under the program counter
fn current(interp: &Interpreter) -> EvmResult<Opcode> {
    let byte = interp.frame.code.get(interp.pc).copied().unwrap_or(0);
    Opcode::from_byte(byte).ok_or(EvmError::InvalidOpcode(byte))
}

/// Read `size` bytes of memory at a stack-supplied offset
fn memory_bytes(interp: &Interpreter, offset: U256, size: U256) -> Vec<u8> {
    if size.is_zero() {
        return Vec::new();
    }
    interp.memory.get(to_usize(offset), to_usize(size))
}

macro_rules! binary_op {
    ($name:ident, $f:expr) => {
        pub(crate) fn $name(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
            let a = interp.stack.pop()?;
            let b = interp.stack.pop()?;
            interp.stack.push($f(a, b))
        }
    };
}

macro_rules! compare_op {
    ($name:ident, $f:expr) => {
        pub(crate) fn $name(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
            let a = interp.stack.pop()?;
            let b = interp.stack.pop()?;
            interp.stack.push_bool($f(&a, &b))
        }
    };
}

macro_rules! push_env {
    ($name:ident, |$interp:ident, $evm:ident| $value:expr) => {
        pub(crate) fn $name($interp: &mut Interpreter, $evm: &mut Evm<'_>) -> EvmResult<()> {
            let value: U256 = $value;
            $interp.stack.push(value)
        }
    };
}

// Arithmetic

binary_op!(op_add, |a: U256, b| a.overflowing_add(b).0);
binary_op!(op_mul, |a: U256, b| a.overflowing_mul(b).0);
binary_op!(op_sub, |a: U256, b| a.overflowing_sub(b).0);
binary_op!(op_div, arith::div);
binary_op!(op_sdiv, arith::sdiv);
binary_op!(op_mod, arith::rem);
binary_op!(op_smod, arith::smod);
binary_op!(op_exp, arith::exp);
binary_op!(op_signextend, arith::signextend);

pub(crate) fn op_addmod(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let a = interp.stack.pop()?;
    let b = interp.stack.pop()?;
    let n = interp.stack.pop()?;
    interp.stack.push(arith::addmod(a, b, n))
}

pub(crate) fn op_mulmod(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let a = interp.stack.pop()?;
    let b = interp.stack.pop()?;
    let n = interp.stack.pop()?;
    interp.stack.push(arith::mulmod(a, b, n))
}

// Comparison and bitwise

compare_op!(op_lt, |a: &U256, b: &U256| a < b);
compare_op!(op_gt, |a: &U256, b: &U256| a > b);
compare_op!(op_slt, arith::slt);
compare_op!(op_sgt, arith::sgt);
compare_op!(op_eq, |a: &U256, b: &U256| a == b);

binary_op!(op_and, |a: U256, b| a & b);
binary_op!(op_or, |a: U256, b| a | b);
binary_op!(op_xor, |a: U256, b| a ^ b);
binary_op!(op_byte, arith::byte);

pub(crate) fn op_iszero(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let a = interp.stack.pop()?;
    interp.stack.push_bool(a.is_zero())
}

pub(crate) fn op_not(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let a = interp.stack.pop()?;
    interp.stack.push(!a)
}

pub(crate) fn op_sha3(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let offset = interp.stack.pop()?;
    let size = interp.stack.pop()?;
    let hash = if size.is_zero() {
        keccak256(&[])
    } else {
        keccak256(interp.memory.slice(to_usize(offset), to_usize(size)))
    };
    interp.stack.push(hash.to_word())
}

// Environment

push_env!(op_address, |interp, _evm| interp.frame.address.to_word());
push_env!(op_origin, |interp, evm| evm.env.origin.to_word());
push_env!(op_caller, |interp, _evm| interp.frame.caller.to_word());
push_env!(op_callvalue, |interp, _evm| interp.frame.value);
push_env!(op_calldatasize, |interp, _evm| U256::from(interp.frame.input.len()));
push_env!(op_codesize, |interp, _evm| U256::from(interp.frame.code.len()));
push_env!(op_gasprice, |interp, _evm| interp.frame.gas_price);

pub(crate) fn op_balance(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let address = Address::from_word(interp.stack.pop()?);
    interp.stack.push(evm.state.get_balance(&address))
}

pub(crate) fn op_calldataload(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let offset = interp.stack.pop()?;
    let word = padded_slice(&interp.frame.input, offset, 32);
    interp.stack.push(U256::from_big_endian(&word))
}

pub(crate) fn op_calldatacopy(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let mem_offset = interp.stack.pop()?;
    let data_offset = interp.stack.pop()?;
    let size = interp.stack.pop()?;
    if !size.is_zero() {
        let data = padded_slice(&interp.frame.input, data_offset, to_usize(size));
        interp.memory.set(to_usize(mem_offset), data.len(), &data);
    }
    Ok(())
}

pub(crate) fn op_codecopy(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let mem_offset = interp.stack.pop()?;
    let code_offset = interp.stack.pop()?;
    let size = interp.stack.pop()?;
    if !size.is_zero() {
        let data = padded_slice(&interp.frame.code, code_offset, to_usize(size));
        interp.memory.set(to_usize(mem_offset), data.len(), &data);
    }
    Ok(())
}

pub(crate) fn op_extcodesize(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let address = Address::from_word(interp.stack.pop()?);
    interp.stack.push(U256::from(evm.state.get_code_size(&address)))
}

pub(crate) fn op_extcodecopy(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let address = Address::from_word(interp.stack.pop()?);
    let mem_offset = interp.stack.pop()?;
    let code_offset = interp.stack.pop()?;
    let size = interp.stack.pop()?;
    if !size.is_zero() {
        let code = evm.state.get_code(&address);
        let data = padded_slice(&code, code_offset, to_usize(size));
        interp.memory.set(to_usize(mem_offset), data.len(), &data);
    }
    Ok(())
}

// Block

pub(crate) fn op_blockhash(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let number = interp.stack.pop()?;
    interp.stack.push(evm.env.block.block_hash(number).to_word())
}

push_env!(op_coinbase, |interp, evm| evm.env.block.coinbase.to_word());
push_env!(op_timestamp, |interp, evm| U256::from(evm.env.block.timestamp));
push_env!(op_number, |interp, evm| U256::from(evm.env.block.number));
push_env!(op_difficulty, |interp, evm| evm.env.block.difficulty);
push_env!(op_gaslimit, |interp, evm| U256::from(evm.env.block.gas_limit));

// Stack, memory and storage

pub(crate) fn op_pop(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    interp.stack.pop().map(|_| ())
}

pub(crate) fn op_mload(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let offset = interp.stack.pop()?;
    let value = interp.memory.load(to_usize(offset));
    interp.stack.push(value)
}

pub(crate) fn op_mstore(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let offset = interp.stack.pop()?;
    let value = interp.stack.pop()?;
    interp.memory.store(to_usize(offset), value);
    Ok(())
}

pub(crate) fn op_mstore8(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let offset = interp.stack.pop()?;
    let value = interp.stack.pop()?;
    interp.memory.store8(to_usize(offset), value.byte(0));
    Ok(())
}

pub(crate) fn op_sload(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let key = H256::from_word(interp.stack.pop()?);
    let value = evm.state.get_storage(&interp.frame.address, &key);
    interp.stack.push(value.to_word())
}

pub(crate) fn op_sstore(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let key = H256::from_word(interp.stack.pop()?);
    let value = interp.stack.pop()?;
    let address = interp.frame.address;
    let current = evm.state.get_storage(&address, &key);
    if !current.is_zero() && value.is_zero() {
        evm.state.add_refund(cost::SSTORE_CLEAR_REFUND);
    }
    evm.state.set_storage(&address, key, H256::from_word(value));
    Ok(())
}

push_env!(op_msize, |interp, _evm| U256::from(interp.memory.len()));
push_env!(op_gas, |interp, _evm| U256::from(interp.frame.gas));

pub(crate) fn op_jumpdest(_: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    Ok(())
}

/// PUSH1..PUSH32. Immediates running past the end of the code are
/// right-padded with zeros.
pub(crate) fn op_push(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let size = current(interp)?.push_size();
    let bytes = padded_slice(&interp.frame.code, U256::from(interp.pc + 1), size);
    interp.stack.push(U256::from_big_endian(&bytes))?;
    interp.pc += size;
    Ok(())
}

pub(crate) fn op_dup(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let op = current(interp)?;
    let depth = op.dup_depth().ok_or(EvmError::InvalidOpcode(op.as_u8()))?;
    interp.stack.dup(depth)
}

pub(crate) fn op_swap(interp: &mut Interpreter, _: &mut Evm<'_>) -> EvmResult<()> {
    let op = current(interp)?;
    let depth = op.swap_depth().ok_or(EvmError::InvalidOpcode(op.as_u8()))?;
    interp.stack.swap(depth)
}

pub(crate) fn op_log(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let op = current(interp)?;
    let count = op.log_topics().ok_or(EvmError::InvalidOpcode(op.as_u8()))?;
    let offset = interp.stack.pop()?;
    let size = interp.stack.pop()?;
    let mut topics = Vec::with_capacity(count);
    for _ in 0..count {
        topics.push(H256::from_word(interp.stack.pop()?));
    }
    let data = memory_bytes(interp, offset, size);

    let mut log = Log::new(interp.frame.address, topics, data);
    log.block_number = evm.env.block.number;
    evm.logs.push(log);
    Ok(())
}

// Calls

pub(crate) fn op_create(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let value = interp.stack.pop()?;
    let offset = interp.stack.pop()?;
    let size = interp.stack.pop()?;
    let init_code = Bytes::from(memory_bytes(interp, offset, size));

    let mut gas = interp.frame.gas;
    if evm.gas_table.create_by_suicide.is_some() {
        gas = all_but_one_64th(gas);
    }
    interp.frame.gas -= gas;

    let request = Evm::create_request(interp.frame.address, init_code, gas, value);
    interp.suspend(request, Resume::Create);
    Ok(())
}

/// Tail of CREATE: refund unused gas and push the new address, or 0
pub(crate) fn finish_create(interp: &mut Interpreter, result: CallResult, homestead: bool) -> EvmResult<()> {
    interp.frame.gas = interp.frame.gas.saturating_add(result.gas_left);

    let pushed = match (&result.error, result.created) {
        (None, Some(address)) => address.to_word(),
        (Some(EvmError::CodeStoreOutOfGas), Some(address)) if !homestead => address.to_word(),
        _ => U256::zero(),
    };
    interp.stack.push(pushed)
}

/// Shared tail of the call opcodes: refund unused gas, report success
/// and copy the output into the caller's window
pub(crate) fn finish_call(
    interp: &mut Interpreter,
    result: CallResult,
    out_offset: U256,
    out_size: U256,
) -> EvmResult<()> {
    interp.frame.gas = interp.frame.gas.saturating_add(result.gas_left);
    if !result.is_success() {
        return interp.stack.push(U256::zero());
    }
    interp.stack.push(U256::one())?;
    if !out_size.is_zero() {
        interp
            .memory
            .set(to_usize(out_offset), to_usize(out_size), &result.output);
    }
    Ok(())
}

/// Pops shared by CALL and CALLCODE. The gas word was replaced with the
/// callee allowance when the call was charged.
fn call_args(interp: &mut Interpreter) -> EvmResult<(u64, Address, U256, Bytes, U256, U256)> {
    let mut gas = interp.stack.pop()?.low_u64();
    let to = Address::from_word(interp.stack.pop()?);
    let value = interp.stack.pop()?;
    let in_offset = interp.stack.pop()?;
    let in_size = interp.stack.pop()?;
    let out_offset = interp.stack.pop()?;
    let out_size = interp.stack.pop()?;
    if !value.is_zero() {
        gas = gas.saturating_add(cost::CALL_STIPEND);
    }
    let input = Bytes::from(memory_bytes(interp, in_offset, in_size));
    Ok((gas, to, value, input, out_offset, out_size))
}

pub(crate) fn op_call(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let (gas, to, value, input, out_offset, out_size) = call_args(interp)?;
    let request = evm.call_request(interp.frame.address, to, input, gas, value);
    interp.suspend(request, Resume::Call { out_offset, out_size });
    Ok(())
}

pub(crate) fn op_callcode(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let (gas, to, value, input, out_offset, out_size) = call_args(interp)?;
    let request = evm.call_code_request(interp.frame.address, to, input, gas, value);
    interp.suspend(request, Resume::Call { out_offset, out_size });
    Ok(())
}

pub(crate) fn op_delegate_call(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let gas = interp.stack.pop()?.low_u64();
    let to = Address::from_word(interp.stack.pop()?);
    let in_offset = interp.stack.pop()?;
    let in_size = interp.stack.pop()?;
    let out_offset = interp.stack.pop()?;
    let out_size = interp.stack.pop()?;
    let input = Bytes::from(memory_bytes(interp, in_offset, in_size));

    let request = evm.delegate_call_request(&interp.frame, to, input, gas);
    interp.suspend(request, Resume::Call { out_offset, out_size });
    Ok(())
}

/// SUICIDE: move the whole balance to the beneficiary and mark the
/// account for deletion. The refund is granted once per account.
pub(crate) fn op_suicide(interp: &mut Interpreter, evm: &mut Evm<'_>) -> EvmResult<()> {
    let beneficiary = Address::from_word(interp.stack.pop()?);
    let address = interp.frame.address;
    let balance = evm.state.get_balance(&address);
    evm.state.add_balance(&beneficiary, balance);
    if !evm.state.has_suicided(&address) {
        evm.state.add_refund(cost::SUICIDE_REFUND);
    }
    evm.state.suicide(&address);
    Ok(())
}
