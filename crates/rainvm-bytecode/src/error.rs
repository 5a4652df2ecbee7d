//! Bytecode errors

use num_bigint::BigUint;
use thiserror::Error;

use crate::instruction::Opcode;

/// Errors that can occur while encoding, assembling or decoding bytecode
#[derive(Debug, Error)]
pub enum BytecodeError {
    /// A scalar does not fit the requested byte width
    #[error("value {value} does not fit in {width} byte(s)")]
    ValueOverflow {
        /// The value that was being encoded
        value: BigUint,
        /// The requested width in bytes
        width: usize,
    },

    /// A field width of zero bytes was requested
    #[error("invalid field width: {0}")]
    InvalidWidth(usize),

    /// An instruction operand exceeds the configured operand width
    #[error("operand {operand} of {opcode} does not fit in {width} byte(s)")]
    OperandOverflow {
        /// Opcode the operand belongs to
        opcode: Opcode,
        /// The offending operand
        operand: u32,
        /// Configured operand width in bytes
        width: usize,
    },

    /// A VAL instruction references a nonexistent constant-pool slot
    #[error("instruction {index}: constant index {operand} out of range (pool has {len})")]
    ConstantIndexOutOfRange {
        /// Position of the instruction in the source
        index: usize,
        /// The constant index requested
        operand: u32,
        /// Length of the constant pool
        len: usize,
    },

    /// An instruction would consume more values than the stack holds
    #[error("instruction {index}: {opcode} needs {required} value(s) but stack holds {available}")]
    StackUnderflow {
        /// Position of the instruction in the source
        index: usize,
        /// Opcode being simulated
        opcode: Opcode,
        /// Number of inputs the opcode consumes
        required: usize,
        /// Stack depth before the instruction
        available: usize,
    },

    /// An opcode has no declared stack effect
    #[error("instruction {index}: {opcode} has no declared stack effect")]
    UnknownOpcode {
        /// Position of the instruction in the source
        index: usize,
        /// The opcode without an arity entry
        opcode: Opcode,
    },

    /// An operand is meaningless for its opcode (e.g. a variadic op over zero values)
    #[error("instruction {index}: invalid operand {operand} for {opcode}")]
    InvalidOperand {
        /// Position of the instruction in the source
        index: usize,
        /// Opcode the operand belongs to
        opcode: Opcode,
        /// The offending operand
        operand: u32,
    },

    /// A declared stack length is smaller than the simulated peak
    #[error("declared stack length {declared} is below the simulated peak {required}")]
    StackLengthTooSmall {
        /// The declared stack length
        declared: u32,
        /// The simulated peak depth
        required: u32,
    },

    /// An encoding failure at a specific instruction
    #[error("instruction {index}: {source}")]
    Encoding {
        /// Position of the instruction in the source
        index: usize,
        /// The underlying encoding error
        #[source]
        source: Box<BytecodeError>,
    },

    /// Invalid opcode byte while decoding
    #[error("invalid opcode {opcode} at offset {offset}")]
    InvalidOpcode {
        /// The raw opcode value
        opcode: u32,
        /// Byte offset in the source
        offset: usize,
    },

    /// Source ended in the middle of an instruction
    #[error("unexpected end of bytecode at offset {0}")]
    UnexpectedEnd(usize),

    /// A constant could not be parsed
    #[error("invalid constant: {0}")]
    InvalidConstant(String),

    /// A source string is not valid hex
    #[error("invalid hex source: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// JSON payload error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BytecodeError {
    /// Attach the position of the failing instruction to an encoding error
    pub fn at(self, index: usize) -> Self {
        match self {
            Self::Encoding { .. }
            | Self::ConstantIndexOutOfRange { .. }
            | Self::StackUnderflow { .. }
            | Self::UnknownOpcode { .. }
            | Self::InvalidOperand { .. } => self,
            other => Self::Encoding {
                index,
                source: Box::new(other),
            },
        }
    }
}

/// Result type for bytecode operations
pub type Result<T> = std::result::Result<T, BytecodeError>;
