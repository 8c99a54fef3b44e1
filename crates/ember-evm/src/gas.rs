//! Gas cost calculations

use primitive_types::U256;

use crate::error::{EvmError, EvmResult};
use crate::gas_table::GasTable;
use crate::opcode::Opcode;

/// Fixed protocol gas costs
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;
    /// External step gas (BLOCKHASH)
    pub const EXT: u64 = 20;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 word gas
    pub const SHA3_WORD: u64 = 6;

    /// Sstore set gas (zero to non-zero)
    pub const SSTORE_SET: u64 = 20000;
    /// Sstore reset gas
    pub const SSTORE_RESET: u64 = 5000;
    /// Sstore clear refund
    pub const SSTORE_CLEAR_REFUND: u64 = 15000;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Code deposit gas (per byte)
    pub const CREATE_DATA: u64 = 200;
    /// Call value transfer gas
    pub const CALL_VALUE: u64 = 9000;
    /// Call new account gas
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Call stipend
    pub const CALL_STIPEND: u64 = 2300;
    /// Suicide refund
    pub const SUICIDE_REFUND: u64 = 24000;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Quadratic memory divisor
    pub const QUAD_COEFF_DIV: u64 = 512;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Max call depth
    pub const MAX_CALL_DEPTH: usize = 1024;
    /// Max stack size
    pub const MAX_STACK_SIZE: usize = 1024;
}

/// Largest memory size that can be charged for. Anything past it costs
/// more gas than a `u64` counter can hold.
pub const MAX_MEMORY_SIZE: u64 = 0x1F_FFFF_FFE0;

/// Fork-independent cost of an opcode. Opcodes whose cost lives in the
/// gas table, or is entirely dynamic, return their fixed part only.
pub fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;

    if opcode.is_push() || opcode.dup_depth().is_some() || opcode.swap_depth().is_some() {
        return cost::VERYLOW;
    }
    if let Some(topics) = opcode.log_topics() {
        return cost::LOG + cost::LOG_TOPIC * topics as u64;
    }

    match opcode {
        STOP | RETURN => cost::ZERO,

        ADDRESS | ORIGIN | CALLER | CALLVALUE | CALLDATASIZE | CODESIZE | GASPRICE | COINBASE
        | TIMESTAMP | NUMBER | DIFFICULTY | GASLIMIT | POP | PC | MSIZE | GAS => cost::BASE,

        ADD | SUB | NOT | LT | GT | SLT | SGT | EQ | ISZERO | AND | OR | XOR | BYTE
        | CALLDATALOAD | MLOAD | MSTORE | MSTORE8 | CALLDATACOPY | CODECOPY => cost::VERYLOW,

        MUL | DIV | SDIV | MOD | SMOD | SIGNEXTEND => cost::LOW,

        ADDMOD | MULMOD | JUMP => cost::MID,

        JUMPI | EXP => cost::HIGH,

        JUMPDEST => cost::JUMPDEST,
        BLOCKHASH => cost::EXT,
        SHA3 => cost::SHA3,
        CREATE => cost::CREATE,

        // table-driven or dynamic
        _ => cost::ZERO,
    }
}

/// Fork-dependent base cost from the active gas table
pub fn table_gas(opcode: Opcode, table: &GasTable) -> u64 {
    match opcode {
        Opcode::BALANCE => table.balance,
        Opcode::EXTCODESIZE => table.ext_codesize,
        Opcode::EXTCODECOPY => table.ext_codecopy,
        Opcode::SLOAD => table.sload,
        Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL => table.calls,
        Opcode::SUICIDE if table.create_by_suicide.is_some() => table.suicide,
        _ => 0,
    }
}

/// Number of 32-byte words covering `size` bytes
pub fn to_word_size(size: u64) -> u64 {
    size / 32 + u64::from(size % 32 != 0)
}

/// Bytes of memory an access of `len` bytes at `offset` needs. Zero-length
/// accesses need none regardless of offset. Sizes that could never be paid
/// for fail with `OutOfGas`.
pub fn memory_size(offset: U256, len: U256) -> EvmResult<u64> {
    if len.is_zero() {
        return Ok(0);
    }
    let (end, overflow) = offset.overflowing_add(len);
    if overflow || end > U256::from(MAX_MEMORY_SIZE) {
        return Err(EvmError::OutOfGas);
    }
    Ok(end.low_u64())
}

/// Total cost of `words` words of memory: `3w + w²/512`
pub fn memory_word_cost(words: u64) -> u64 {
    cost::MEMORY * words + words * words / cost::QUAD_COEFF_DIV
}

/// Cost of growing memory from `current_size` to `new_size` bytes,
/// computed as the difference of the two totals. Shrinking is free.
pub fn memory_gas(current_size: u64, new_size: u64) -> EvmResult<u64> {
    if new_size <= current_size {
        return Ok(0);
    }
    if new_size > MAX_MEMORY_SIZE {
        return Err(EvmError::OutOfGas);
    }
    let new_words = to_word_size(new_size);
    let old_words = to_word_size(current_size);
    Ok(memory_word_cost(new_words) - memory_word_cost(old_words))
}

/// Per-word cost of copying `length` bytes
pub fn copy_gas(length: u64) -> u64 {
    cost::COPY * to_word_size(length)
}

/// EXP cost: base plus a per-byte charge on the exponent
pub fn exp_gas(exponent: U256, table: &GasTable) -> u64 {
    let byte_len = (exponent.bits() as u64 + 7) / 8;
    cost::EXP + table.exp_byte * byte_len
}

/// SHA3 cost
pub fn sha3_gas(length: u64) -> u64 {
    cost::SHA3 + cost::SHA3_WORD * to_word_size(length)
}

/// LOG cost
pub fn log_gas(topics: usize, data_size: u64) -> u64 {
    cost::LOG + cost::LOG_TOPIC * topics as u64 + cost::LOG_DATA * data_size
}

/// SSTORE cost and refund for writing `new` over `current`
pub fn sstore_gas(current: &U256, new: &U256) -> (u64, u64) {
    match (current.is_zero(), new.is_zero()) {
        (true, false) => (cost::SSTORE_SET, 0),
        (false, true) => (cost::SSTORE_RESET, cost::SSTORE_CLEAR_REFUND),
        _ => (cost::SSTORE_RESET, 0),
    }
}

/// Gas handed to a callee. Once the gas table carries `create_by_suicide`,
/// the request is capped at all but one 64th of what is left after the
/// call's own cost `base`.
pub fn call_gas(table: &GasTable, available: u64, base: u64, requested: U256) -> EvmResult<u64> {
    if table.create_by_suicide.is_some() {
        let available = available.checked_sub(base).ok_or(EvmError::OutOfGas)?;
        let capped = all_but_one_64th(available);
        if requested < U256::from(capped) {
            return Ok(requested.low_u64());
        }
        return Ok(capped);
    }
    if requested > U256::from(u64::MAX) {
        return Err(EvmError::OutOfGas);
    }
    Ok(requested.low_u64())
}

/// `gas - gas / 64`
pub fn all_but_one_64th(gas: u64) -> u64 {
    gas - gas / 64
}

/// Cost of storing `len` bytes of contract code
pub fn code_deposit_gas(len: usize) -> u64 {
    cost::CREATE_DATA * len as u64
}
