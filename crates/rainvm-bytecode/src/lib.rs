//! # rainvm bytecode
//!
//! This crate defines the bytecode format consumed by the rain stack VM and the
//! assembler that produces it.
//!
//! ## Design Principles
//!
//! - **Stack-based**: Every opcode has a declared stack effect that the builder
//!   checks ahead of time
//! - **Fixed layout**: Each instruction is `[opcode][operand]`, big-endian and
//!   zero padded, with no separators between instructions
//! - **Stable identities**: Opcode numbers are explicit and match the VM table
//! - **Serializable**: Programs are emitted as the JSON payload the deployer expects

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod constant;
pub mod disasm;
pub mod error;
pub mod instruction;
pub mod operand;
pub mod payload;
pub mod program;

pub use constant::{ConstantPool, max_uint256};
pub use disasm::{decode_source, disassemble};
pub use error::{BytecodeError, Result};
pub use instruction::{Instruction, Opcode, StackEffect, op, op_with};
pub use operand::{Layout, Operand};
pub use program::{Program, ProgramBuilder, StackAnalysis, analyze, build};

/// Number of bits in a VM word
pub const WORD_BITS: u64 = 256;
