//! Opcode dispatch table

use std::fmt;

use crate::error::EvmResult;
use crate::execution::Evm;
use crate::instructions;
use crate::interpreter::Interpreter;
use crate::opcode::Opcode;

/// Opcode handler
pub type ExecutionFn = fn(&mut Interpreter, &mut Evm<'_>) -> EvmResult<()>;

/// One dispatch table entry
#[derive(Clone, Copy)]
pub struct Operation {
    /// Handler. `None` for the control-flow opcodes the interpreter loop
    /// runs itself.
    pub execute: Option<ExecutionFn>,
    /// Whether the opcode exists under the active rules
    pub valid: bool,
}

impl Operation {
    const INVALID: Operation = Operation {
        execute: None,
        valid: false,
    };

    fn new(execute: Option<ExecutionFn>) -> Self {
        Self {
            execute,
            valid: true,
        }
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("has_handler", &self.execute.is_some())
            .field("valid", &self.valid)
            .finish()
    }
}

/// 256-entry dispatch table for one rule set. Read-only once built.
#[derive(Clone, Debug)]
pub struct JumpTable {
    operations: [Operation; 256],
}

impl JumpTable {
    /// Frontier instruction set, plus DELEGATECALL from Homestead on
    pub fn new(homestead: bool) -> Self {
        let mut operations = [Operation::INVALID; 256];
        for byte in 0..=255u8 {
            if let Some(op) = Opcode::from_byte(byte) {
                if op != Opcode::DELEGATECALL {
                    operations[byte as usize] = Operation::new(handler(op));
                }
            }
        }

        if homestead {
            operations[Opcode::DELEGATECALL as usize] =
                Operation::new(Some(instructions::op_delegate_call));
        }

        Self { operations }
    }

    /// Entry for an opcode byte
    pub fn get(&self, byte: u8) -> Operation {
        self.operations[byte as usize]
    }
}

/// Frontier handler for `op`
fn handler(op: Opcode) -> Option<ExecutionFn> {
    use instructions::*;
    use Opcode::*;

    if op.is_push() {
        return Some(op_push);
    }
    if op.dup_depth().is_some() {
        return Some(op_dup);
    }
    if op.swap_depth().is_some() {
        return Some(op_swap);
    }
    if op.log_topics().is_some() {
        return Some(op_log);
    }

    let execute: ExecutionFn = match op {
        // control flow stays in the interpreter loop
        STOP | JUMP | JUMPI | PC | RETURN | SUICIDE => return None,

        ADD => op_add,
        MUL => op_mul,
        SUB => op_sub,
        DIV => op_div,
        SDIV => op_sdiv,
        MOD => op_mod,
        SMOD => op_smod,
        ADDMOD => op_addmod,
        MULMOD => op_mulmod,
        EXP => op_exp,
        SIGNEXTEND => op_signextend,

        LT => op_lt,
        GT => op_gt,
        SLT => op_slt,
        SGT => op_sgt,
        EQ => op_eq,
        ISZERO => op_iszero,
        AND => op_and,
        OR => op_or,
        XOR => op_xor,
        NOT => op_not,
        BYTE => op_byte,

        SHA3 => op_sha3,

        ADDRESS => op_address,
        BALANCE => op_balance,
        ORIGIN => op_origin,
        CALLER => op_caller,
        CALLVALUE => op_callvalue,
        CALLDATALOAD => op_calldataload,
        CALLDATASIZE => op_calldatasize,
        CALLDATACOPY => op_calldatacopy,
        CODESIZE => op_codesize,
        CODECOPY => op_codecopy,
        GASPRICE => op_gasprice,
        EXTCODESIZE => op_extcodesize,
        EXTCODECOPY => op_extcodecopy,

        BLOCKHASH => op_blockhash,
        COINBASE => op_coinbase,
        TIMESTAMP => op_timestamp,
        NUMBER => op_number,
        DIFFICULTY => op_difficulty,
        GASLIMIT => op_gaslimit,

        POP => op_pop,
        MLOAD => op_mload,
        MSTORE => op_mstore,
        MSTORE8 => op_mstore8,
        SLOAD => op_sload,
        SSTORE => op_sstore,
        MSIZE => op_msize,
        GAS => op_gas,
        JUMPDEST => op_jumpdest,

        CREATE => op_create,
        CALL => op_call,
        CALLCODE => op_callcode,
        DELEGATECALL => op_delegate_call,

        // PUSH, DUP, SWAP and LOG are handled above
        _ => return None,
    };
    Some(execute)
}
