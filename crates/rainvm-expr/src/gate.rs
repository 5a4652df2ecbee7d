//! Start/end gates

use num_bigint::BigUint;
use rainvm_bytecode::{Opcode, Program, Result, op, op_with};

/// Declared stack length of [`after_timestamp_config`], kept for parity with
/// the configs already deployed
pub const AFTER_TIMESTAMP_STACK_LENGTH: u32 = 3;

/// A gate that always evaluates to `flag`
///
/// Used with a nonzero flag for "can start" and "can end" checks that are
/// unconditionally satisfied.
pub fn gate_config(flag: impl Into<BigUint>) -> Result<Program> {
    Program::builder()
        .instruction(op_with(Opcode::Val, 0))
        .constant(flag)
        .build()
}

/// A gate that is open once the block timestamp is strictly after `timestamp`
pub fn after_timestamp_config(timestamp: impl Into<BigUint>) -> Result<Program> {
    Program::builder()
        .instruction(op(Opcode::BlockTimestamp))
        .instruction(op_with(Opcode::Val, 0))
        .instruction(op(Opcode::GreaterThan))
        .constant(timestamp)
        .stack_length(AFTER_TIMESTAMP_STACK_LENGTH)
        .build()
}
