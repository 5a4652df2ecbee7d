//! Bytecode instructions (opcodes)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{BytecodeError, Result};
use crate::operand::{Layout, Operand};

/// Bytecode opcodes
///
/// Stack-based instruction set. Discriminants are the VM's opcode numbers and
/// must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    // ==================== Core ====================
    /// Skip forward over instructions (operand encodes count and condition)
    Skip = 0,
    /// Push constants\[operand\]
    Val = 1,
    /// Duplicate the top of the stack
    Dup = 2,
    /// Map a source over packed arguments
    Zipmap = 3,

    // ==================== Environment ====================
    /// Push the current block number
    BlockNumber = 4,
    /// Push the current block timestamp
    BlockTimestamp = 5,
    /// Push the caller's address
    Sender = 6,

    // ==================== Logic ====================
    /// a == 0
    IsZero = 7,
    /// cond ? a : b, both already evaluated
    EagerIf = 8,
    /// a == b
    EqualTo = 9,
    /// a < b
    LessThan = 10,
    /// a > b
    GreaterThan = 11,
    /// First of N values if all are nonzero, else 0
    Every = 12,
    /// First nonzero of N values, else 0
    Any = 13,

    // ==================== Math ====================
    /// Sum of N values
    Add = 14,
    /// Left fold subtraction over N values
    Sub = 15,
    /// Product of N values
    Mul = 16,
    /// Left fold division over N values
    Div = 17,
    /// Left fold remainder over N values
    Mod = 18,
    /// Left fold exponentiation over N values
    Pow = 19,
    /// Minimum of N values
    Min = 20,
    /// Maximum of N values
    Max = 21,

    // ==================== Tier ====================
    /// Tier report of an account
    Report = 22,
    /// Report where no tier was ever held
    Never = 23,
    /// Report where every tier was held since block 0
    Always = 24,
    /// Per-tier saturating difference of two reports
    SaturatingDiff = 25,
    /// Set a tier range of a report to a block number
    UpdateBlocksForTierRange = 26,
    /// Combine reports tier by tier under a block number
    SelectLte = 27,

    // ==================== Tokens ====================
    /// ERC20 balance of an account
    Erc20BalanceOf = 28,
    /// ERC20 total supply
    Erc20TotalSupply = 29,
    /// ERC721 balance of an account
    Erc721BalanceOf = 30,
    /// ERC721 owner of a token id
    Erc721OwnerOf = 31,
    /// ERC1155 balance of an account for an id
    Erc1155BalanceOf = 32,
    /// ERC1155 balances for N+1 account/id pairs
    Erc1155BalanceOfBatch = 33,

    // ==================== Sale ====================
    /// Units left for sale
    RemainingUnits = 34,
    /// Reserve raised so far
    TotalReserveIn = 35,
    /// Block of the last purchase
    LastBuyBlock = 36,
    /// Units of the last purchase
    LastBuyUnits = 37,
    /// Price of the last purchase
    LastBuyPrice = 38,
    /// Units requested by the current buyer
    CurrentBuyUnits = 39,
    /// Address of the sale's token
    TokenAddress = 40,
    /// Address of the sale's reserve asset
    ReserveAddress = 41,
}

/// Declared stack effect of one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackEffect {
    /// Values consumed from the top of the stack
    pub inputs: usize,
    /// Values pushed back
    pub outputs: usize,
}

impl StackEffect {
    /// Create a stack effect
    #[inline]
    pub const fn new(inputs: usize, outputs: usize) -> Self {
        Self { inputs, outputs }
    }
}

impl Opcode {
    /// Every opcode, in numeric order
    pub const ALL: [Opcode; 42] = [
        Self::Skip,
        Self::Val,
        Self::Dup,
        Self::Zipmap,
        Self::BlockNumber,
        Self::BlockTimestamp,
        Self::Sender,
        Self::IsZero,
        Self::EagerIf,
        Self::EqualTo,
        Self::LessThan,
        Self::GreaterThan,
        Self::Every,
        Self::Any,
        Self::Add,
        Self::Sub,
        Self::Mul,
        Self::Div,
        Self::Mod,
        Self::Pow,
        Self::Min,
        Self::Max,
        Self::Report,
        Self::Never,
        Self::Always,
        Self::SaturatingDiff,
        Self::UpdateBlocksForTierRange,
        Self::SelectLte,
        Self::Erc20BalanceOf,
        Self::Erc20TotalSupply,
        Self::Erc721BalanceOf,
        Self::Erc721OwnerOf,
        Self::Erc1155BalanceOf,
        Self::Erc1155BalanceOfBatch,
        Self::RemainingUnits,
        Self::TotalReserveIn,
        Self::LastBuyBlock,
        Self::LastBuyUnits,
        Self::LastBuyPrice,
        Self::CurrentBuyUnits,
        Self::TokenAddress,
        Self::ReserveAddress,
    ];

    /// Convert from raw byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    /// Convert to raw byte
    #[inline]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Get the mnemonic of this opcode
    pub const fn name(self) -> &'static str {
        match self {
            Self::Skip => "SKIP",
            Self::Val => "VAL",
            Self::Dup => "DUP",
            Self::Zipmap => "ZIPMAP",
            Self::BlockNumber => "BLOCK_NUMBER",
            Self::BlockTimestamp => "BLOCK_TIMESTAMP",
            Self::Sender => "SENDER",
            Self::IsZero => "IS_ZERO",
            Self::EagerIf => "EAGER_IF",
            Self::EqualTo => "EQUAL_TO",
            Self::LessThan => "LESS_THAN",
            Self::GreaterThan => "GREATER_THAN",
            Self::Every => "EVERY",
            Self::Any => "ANY",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mul => "MUL",
            Self::Div => "DIV",
            Self::Mod => "MOD",
            Self::Pow => "POW",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Report => "REPORT",
            Self::Never => "NEVER",
            Self::Always => "ALWAYS",
            Self::SaturatingDiff => "SATURATING_DIFF",
            Self::UpdateBlocksForTierRange => "UPDATE_BLOCKS_FOR_TIER_RANGE",
            Self::SelectLte => "SELECT_LTE",
            Self::Erc20BalanceOf => "ERC20_BALANCE_OF",
            Self::Erc20TotalSupply => "ERC20_TOTAL_SUPPLY",
            Self::Erc721BalanceOf => "ERC721_BALANCE_OF",
            Self::Erc721OwnerOf => "ERC721_OWNER_OF",
            Self::Erc1155BalanceOf => "ERC1155_BALANCE_OF",
            Self::Erc1155BalanceOfBatch => "ERC1155_BALANCE_OF_BATCH",
            Self::RemainingUnits => "REMAINING_UNITS",
            Self::TotalReserveIn => "TOTAL_RESERVE_IN",
            Self::LastBuyBlock => "LAST_BUY_BLOCK",
            Self::LastBuyUnits => "LAST_BUY_UNITS",
            Self::LastBuyPrice => "LAST_BUY_PRICE",
            Self::CurrentBuyUnits => "CURRENT_BUY_UNITS",
            Self::TokenAddress => "TOKEN_ADDRESS",
            Self::ReserveAddress => "RESERVE_ADDRESS",
        }
    }

    /// Whether the operand is the number of values the opcode folds over
    pub const fn is_variadic(self) -> bool {
        matches!(
            self,
            Self::Every
                | Self::Any
                | Self::Add
                | Self::Sub
                | Self::Mul
                | Self::Div
                | Self::Mod
                | Self::Pow
                | Self::Min
                | Self::Max
        )
    }

    /// Declared stack effect for this opcode with the given operand
    ///
    /// Returns `None` for opcodes whose effect cannot be known statically
    /// (SKIP and ZIPMAP change control flow).
    pub fn stack_effect(self, operand: u32) -> Option<StackEffect> {
        let n = operand as usize;
        let effect = match self {
            Self::Skip | Self::Zipmap => return None,

            Self::Val
            | Self::BlockNumber
            | Self::BlockTimestamp
            | Self::Sender
            | Self::Never
            | Self::Always
            | Self::RemainingUnits
            | Self::TotalReserveIn
            | Self::LastBuyBlock
            | Self::LastBuyUnits
            | Self::LastBuyPrice
            | Self::CurrentBuyUnits
            | Self::TokenAddress
            | Self::ReserveAddress => StackEffect::new(0, 1),

            Self::Dup => StackEffect::new(1, 2),

            Self::IsZero | Self::Erc20TotalSupply => StackEffect::new(1, 1),

            Self::EqualTo
            | Self::LessThan
            | Self::GreaterThan
            | Self::Report
            | Self::SaturatingDiff
            | Self::UpdateBlocksForTierRange
            | Self::Erc20BalanceOf
            | Self::Erc721BalanceOf
            | Self::Erc721OwnerOf => StackEffect::new(2, 1),

            Self::EagerIf | Self::Erc1155BalanceOf => StackEffect::new(3, 1),

            Self::Every
            | Self::Any
            | Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Div
            | Self::Mod
            | Self::Pow
            | Self::Min
            | Self::Max => StackEffect::new(n, 1),

            // reports plus the block number they are compared against
            Self::SelectLte => StackEffect::new((n & 0x1F) + 1, 1),

            // token, then N+1 accounts and N+1 ids
            Self::Erc1155BalanceOfBatch => StackEffect::new(1 + 2 * (n + 1), n + 1),
        };
        Some(effect)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Opcode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        // Older SDK releases spelled the balance opcode with an interface prefix.
        if upper == "IERC20_BALANCE_OF" {
            return Ok(Self::Erc20BalanceOf);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.name() == upper)
            .ok_or_else(|| format!("unknown opcode mnemonic: {s}"))
    }
}

impl TryFrom<u8> for Opcode {
    type Error = BytecodeError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_byte(value).ok_or(BytecodeError::InvalidOpcode {
            opcode: u32::from(value),
            offset: 0,
        })
    }
}

/// One instruction: an opcode and its operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// The operation
    pub opcode: Opcode,
    /// Auxiliary parameter (constant index, arity, packed flags)
    pub operand: Operand,
}

impl Instruction {
    /// Create an instruction
    #[inline]
    pub const fn new(opcode: Opcode, operand: u32) -> Self {
        Self {
            opcode,
            operand: Operand(operand),
        }
    }

    /// Declared stack effect of this instruction
    #[inline]
    pub fn stack_effect(&self) -> Option<StackEffect> {
        self.opcode.stack_effect(self.operand.value())
    }

    /// Encode into a fresh byte vector
    pub fn encode(&self, layout: Layout) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(layout.instruction_size());
        self.encode_into(layout, &mut out)?;
        Ok(out)
    }

    /// Append the encoding of this instruction to `out`
    ///
    /// `out` is left untouched on error.
    pub fn encode_into(&self, layout: Layout, out: &mut Vec<u8>) -> Result<()> {
        let opcode = codec::encode_u64(u64::from(self.opcode.to_byte()), layout.opcode_width)?;
        let operand = codec::encode_u64(u64::from(self.operand.value()), layout.operand_width)
            .map_err(|err| match err {
                BytecodeError::ValueOverflow { width, .. } => BytecodeError::OperandOverflow {
                    opcode: self.opcode,
                    operand: self.operand.value(),
                    width,
                },
                other => other,
            })?;
        out.extend_from_slice(&opcode);
        out.extend_from_slice(&operand);
        Ok(())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.opcode, self.operand.value())
    }
}

/// Instruction with a zero operand
#[inline]
pub const fn op(opcode: Opcode) -> Instruction {
    Instruction::new(opcode, 0)
}

/// Instruction with an explicit operand
#[inline]
pub const fn op_with(opcode: Opcode, operand: u32) -> Instruction {
    Instruction::new(opcode, operand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for op in Opcode::ALL {
            let byte = op.to_byte();
            assert_eq!(Opcode::from_byte(byte), Some(op));
        }
    }

    #[test]
    fn test_opcode_numbers() {
        assert_eq!(Opcode::Val.to_byte(), 1);
        assert_eq!(Opcode::BlockTimestamp.to_byte(), 5);
        assert_eq!(Opcode::EagerIf.to_byte(), 8);
        assert_eq!(Opcode::GreaterThan.to_byte(), 11);
        assert_eq!(Opcode::Add.to_byte(), 14);
        assert_eq!(Opcode::Erc20BalanceOf.to_byte(), 28);
        assert_eq!(Opcode::CurrentBuyUnits.to_byte(), 39);
        assert_eq!(Opcode::ReserveAddress.to_byte(), 41);
    }

    #[test]
    fn test_invalid_opcode() {
        assert_eq!(Opcode::from_byte(42), None);
        assert!(matches!(
            Opcode::try_from(0xFF),
            Err(BytecodeError::InvalidOpcode { opcode: 0xFF, .. })
        ));
    }

    #[test]
    fn test_opcode_name() {
        assert_eq!(Opcode::Val.name(), "VAL");
        assert_eq!(Opcode::EagerIf.to_string(), "EAGER_IF");
        assert_eq!("greater_than".parse::<Opcode>(), Ok(Opcode::GreaterThan));
    }

    #[test]
    fn test_balance_alias() {
        assert_eq!("IERC20_BALANCE_OF".parse::<Opcode>(), Ok(Opcode::Erc20BalanceOf));
        assert_eq!("ERC20_BALANCE_OF".parse::<Opcode>(), Ok(Opcode::Erc20BalanceOf));
        assert!("NOPE".parse::<Opcode>().is_err());
    }

    #[test]
    fn test_stack_effects() {
        assert_eq!(Opcode::Val.stack_effect(0), Some(StackEffect::new(0, 1)));
        assert_eq!(Opcode::Dup.stack_effect(0), Some(StackEffect::new(1, 2)));
        assert_eq!(Opcode::GreaterThan.stack_effect(0), Some(StackEffect::new(2, 1)));
        assert_eq!(Opcode::EagerIf.stack_effect(0), Some(StackEffect::new(3, 1)));
        assert_eq!(Opcode::Add.stack_effect(4), Some(StackEffect::new(4, 1)));
        assert_eq!(Opcode::SelectLte.stack_effect(0x83), Some(StackEffect::new(4, 1)));
        assert_eq!(
            Opcode::Erc1155BalanceOfBatch.stack_effect(1),
            Some(StackEffect::new(5, 2))
        );
        assert_eq!(Opcode::Skip.stack_effect(0), None);
        assert_eq!(Opcode::Zipmap.stack_effect(0), None);
    }

    #[test]
    fn test_encode_default_layout() {
        assert_eq!(op_with(Opcode::Val, 0).encode(Layout::DEFAULT).unwrap(), vec![1, 0]);
        assert_eq!(op_with(Opcode::Add, 2).encode(Layout::DEFAULT).unwrap(), vec![14, 2]);
        assert_eq!(op(Opcode::EagerIf).encode(Layout::DEFAULT).unwrap(), vec![8, 0]);
    }

    #[test]
    fn test_encode_operand_overflow() {
        let err = op_with(Opcode::Val, 256).encode(Layout::DEFAULT).unwrap_err();
        assert!(matches!(
            err,
            BytecodeError::OperandOverflow {
                opcode: Opcode::Val,
                operand: 256,
                width: 1
            }
        ));

        let wide = Layout::with_operand_width(2).unwrap();
        assert_eq!(op_with(Opcode::Val, 256).encode(wide).unwrap(), vec![1, 1, 0]);
    }

    #[test]
    fn test_encode_into_untouched_on_error() {
        let mut out = vec![0xAA];
        assert!(op_with(Opcode::Add, 1000).encode_into(Layout::DEFAULT, &mut out).is_err());
        assert_eq!(out, vec![0xAA]);
    }
}
