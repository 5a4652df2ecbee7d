//! Bytecode operands and field layout

use serde::{Deserialize, Serialize};

use crate::error::{BytecodeError, Result};

/// Instruction operand (constant index, arity or packed flags depending on the opcode)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Operand(pub u32);

impl Operand {
    /// Create a new operand
    #[inline]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get operand value
    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Operand {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<u8> for Operand {
    fn from(value: u8) -> Self {
        Self(u32::from(value))
    }
}

/// Byte widths of the two instruction fields
///
/// Defaults to one byte each, which is what the VM expects. Programs that need
/// opcode or operand values above 255 must widen explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Width of the opcode field in bytes
    pub opcode_width: usize,
    /// Width of the operand field in bytes
    pub operand_width: usize,
}

impl Layout {
    /// The VM's native one-byte/one-byte layout
    pub const DEFAULT: Self = Self {
        opcode_width: 1,
        operand_width: 1,
    };

    /// Create a layout, rejecting zero-width fields
    pub fn new(opcode_width: usize, operand_width: usize) -> Result<Self> {
        if opcode_width == 0 {
            return Err(BytecodeError::InvalidWidth(opcode_width));
        }
        if operand_width == 0 {
            return Err(BytecodeError::InvalidWidth(operand_width));
        }
        Ok(Self {
            opcode_width,
            operand_width,
        })
    }

    /// Layout with the default opcode width and a custom operand width
    pub fn with_operand_width(operand_width: usize) -> Result<Self> {
        Self::new(Self::DEFAULT.opcode_width, operand_width)
    }

    /// Encoded size of one instruction
    #[inline]
    pub const fn instruction_size(&self) -> usize {
        self.opcode_width + self.operand_width
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::DEFAULT
    }
}
