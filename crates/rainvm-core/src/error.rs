//! VM error types

use rainvm_bytecode::Opcode;
use thiserror::Error;

/// VM execution errors
#[derive(Debug, Error)]
pub enum VmError {
    /// An instruction found fewer values on the stack than it consumes
    #[error("instruction {index}: {opcode} needs {required} value(s) but stack holds {available}")]
    StackUnderflow {
        /// Position of the instruction
        index: usize,
        /// Opcode being executed
        opcode: Opcode,
        /// Values the opcode consumes
        required: usize,
        /// Values on the stack
        available: usize,
    },

    /// A push would exceed the declared stack length
    #[error("instruction {index}: stack length {capacity} exceeded")]
    StackOverflow {
        /// Position of the instruction
        index: usize,
        /// Declared stack length
        capacity: u32,
    },

    /// VAL referenced a missing constant
    #[error("instruction {index}: constant index {operand} out of range (pool has {len})")]
    ConstantIndexOutOfRange {
        /// Position of the instruction
        index: usize,
        /// Requested constant index
        operand: u32,
        /// Constant pool length
        len: usize,
    },

    /// A result does not fit in 256 bits, or a subtraction went below zero
    #[error("instruction {index}: arithmetic overflow in {opcode}")]
    ArithmeticOverflow {
        /// Position of the instruction
        index: usize,
        /// Opcode being executed
        opcode: Opcode,
    },

    /// Division or modulo by zero
    #[error("instruction {index}: division by zero in {opcode}")]
    DivisionByZero {
        /// Position of the instruction
        index: usize,
        /// Opcode being executed
        opcode: Opcode,
    },

    /// An operand is out of range for its opcode
    #[error("instruction {index}: invalid operand {operand} for {opcode}")]
    InvalidOperand {
        /// Position of the instruction
        index: usize,
        /// Opcode being executed
        opcode: Opcode,
        /// The offending operand
        operand: u32,
    },

    /// The reference model does not execute this opcode
    #[error("instruction {index}: {opcode} is not supported by the reference machine")]
    Unsupported {
        /// Position of the instruction
        index: usize,
        /// The unsupported opcode
        opcode: Opcode,
    },

    /// The context could not answer a query
    #[error("missing context: {0}")]
    MissingContext(String),

    /// Execution finished with nothing on the stack
    #[error("program finished with an empty stack")]
    EmptyStack,

    /// Bytecode error
    #[error("Bytecode error: {0}")]
    Bytecode(#[from] rainvm_bytecode::BytecodeError),
}

/// Result type for VM operations
pub type VmResult<T> = std::result::Result<T, VmError>;
