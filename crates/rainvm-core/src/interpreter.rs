//! Bytecode interpreter

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use rainvm_bytecode::{Instruction, Layout, Opcode, Program, max_uint256};

use crate::context::{Context, SaleField};
use crate::error::{VmError, VmResult};
use crate::tier::{self, SelectLteOperand};

/// Result of running a program to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Top of the stack after the last instruction
    pub result: BigUint,
    /// Whole stack after the last instruction, bottom first
    pub stack: Vec<BigUint>,
    /// Highest depth reached
    pub peak_depth: u32,
    /// Instructions executed
    pub steps: u64,
}

/// The bytecode interpreter
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter {
    layout: Layout,
}

struct Machine<'a, C: Context + ?Sized> {
    program: &'a Program,
    ctx: &'a C,
    stack: Vec<BigUint>,
    peak: usize,
    max: BigUint,
}

impl Interpreter {
    /// Create an interpreter for the default instruction layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an interpreter for a custom instruction layout
    pub fn with_layout(layout: Layout) -> Self {
        Self { layout }
    }

    /// Execute the entry source of `program` against `ctx`
    pub fn execute<C: Context + ?Sized>(&self, program: &Program, ctx: &C) -> VmResult<Outcome> {
        let instructions = program.instructions(self.layout)?;
        let mut machine = Machine {
            program,
            ctx,
            stack: Vec::new(),
            peak: 0,
            max: max_uint256(),
        };

        for (index, instruction) in instructions.iter().enumerate() {
            machine.step(index, instruction)?;
            tracing::trace!(
                index,
                opcode = %instruction.opcode,
                operand = instruction.operand.value(),
                depth = machine.stack.len(),
                "step"
            );
        }

        let result = machine.stack.last().cloned().ok_or(VmError::EmptyStack)?;
        Ok(Outcome {
            result,
            peak_depth: machine.peak as u32,
            steps: instructions.len() as u64,
            stack: machine.stack,
        })
    }
}

impl<C: Context + ?Sized> Machine<'_, C> {
    fn push(&mut self, index: usize, value: BigUint) -> VmResult<()> {
        let capacity = self.program.stack_length();
        if self.stack.len() >= capacity as usize {
            return Err(VmError::StackOverflow { index, capacity });
        }
        self.stack.push(value);
        self.peak = self.peak.max(self.stack.len());
        Ok(())
    }

    /// Pop `n` values, returned in push order
    fn pop_n(&mut self, index: usize, opcode: Opcode, n: usize) -> VmResult<Vec<BigUint>> {
        if n > self.stack.len() {
            return Err(VmError::StackUnderflow {
                index,
                opcode,
                required: n,
                available: self.stack.len(),
            });
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    fn pop2(&mut self, index: usize, opcode: Opcode) -> VmResult<(BigUint, BigUint)> {
        let mut values = self.pop_n(index, opcode, 2)?;
        let b = values.swap_remove(1);
        let a = values.swap_remove(0);
        Ok((a, b))
    }

    fn checked(&self, index: usize, opcode: Opcode, value: BigUint) -> VmResult<BigUint> {
        if value > self.max {
            return Err(VmError::ArithmeticOverflow { index, opcode });
        }
        Ok(value)
    }

    fn step(&mut self, index: usize, instruction: &Instruction) -> VmResult<()> {
        let opcode = instruction.opcode;
        let operand = instruction.operand.value();

        match opcode {
            Opcode::Skip | Opcode::Zipmap => return Err(VmError::Unsupported { index, opcode }),

            Opcode::Val => {
                let constants = self.program.constants();
                let value = constants
                    .get(operand)
                    .cloned()
                    .ok_or(VmError::ConstantIndexOutOfRange {
                        index,
                        operand,
                        len: constants.len(),
                    })?;
                self.push(index, value)?;
            }
            Opcode::Dup => {
                let top = self.stack.last().cloned().ok_or(VmError::StackUnderflow {
                    index,
                    opcode,
                    required: 1,
                    available: 0,
                })?;
                self.push(index, top)?;
            }

            Opcode::BlockNumber => {
                let v = self.ctx.block_number();
                self.push(index, v)?;
            }
            Opcode::BlockTimestamp => {
                let v = self.ctx.block_timestamp();
                self.push(index, v)?;
            }
            Opcode::Sender => {
                let v = self.ctx.sender();
                self.push(index, v)?;
            }

            Opcode::IsZero => {
                let a = self.pop_n(index, opcode, 1)?.remove(0);
                self.push(index, flag(a.is_zero()))?;
            }
            Opcode::EagerIf => {
                let mut values = self.pop_n(index, opcode, 3)?;
                let if_false = values.remove(2);
                let if_true = values.remove(1);
                let cond = values.remove(0);
                self.push(index, if cond.is_zero() { if_false } else { if_true })?;
            }
            Opcode::EqualTo | Opcode::LessThan | Opcode::GreaterThan => {
                let (a, b) = self.pop2(index, opcode)?;
                let result = match opcode {
                    Opcode::EqualTo => a == b,
                    Opcode::LessThan => a < b,
                    _ => a > b,
                };
                self.push(index, flag(result))?;
            }
            Opcode::Every | Opcode::Any => {
                let values = self.pop_n(index, opcode, variadic(index, opcode, operand)?)?;
                let result = if opcode == Opcode::Every {
                    if values.iter().any(Zero::is_zero) {
                        BigUint::zero()
                    } else {
                        values[0].clone()
                    }
                } else {
                    values.into_iter().find(|v| !v.is_zero()).unwrap_or_default()
                };
                self.push(index, result)?;
            }

            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Pow
            | Opcode::Min
            | Opcode::Max => {
                let values = self.pop_n(index, opcode, variadic(index, opcode, operand)?)?;
                let result = self.fold_math(index, opcode, values)?;
                self.push(index, result)?;
            }

            Opcode::Report => {
                let (tier_contract, account) = self.pop2(index, opcode)?;
                let report = self.ctx.tier_report(&tier_contract, &account)?;
                self.push(index, report)?;
            }
            Opcode::Never => self.push(index, tier::never_report())?,
            Opcode::Always => self.push(index, tier::always_report())?,
            Opcode::SaturatingDiff => {
                let (older, newer) = self.pop2(index, opcode)?;
                self.push(index, tier::saturating_diff(&newer, &older))?;
            }
            Opcode::UpdateBlocksForTierRange => {
                let start_tier = (operand & 0x0F) as usize;
                let end_tier = ((operand >> 4) & 0x0F) as usize;
                if end_tier > tier::TIERS || start_tier > end_tier {
                    return Err(VmError::InvalidOperand { index, opcode, operand });
                }
                let (report, block) = self.pop2(index, opcode)?;
                let block = block
                    .to_u32()
                    .ok_or(VmError::ArithmeticOverflow { index, opcode })?;
                let updated = tier::update_blocks_for_tier_range(&report, start_tier, end_tier, block);
                self.push(index, updated)?;
            }
            Opcode::SelectLte => {
                let decoded = SelectLteOperand::decode(operand)
                    .ok_or(VmError::InvalidOperand { index, opcode, operand })?;
                let mut values = self.pop_n(index, opcode, decoded.reports + 1)?;
                let block = values
                    .pop()
                    .and_then(|b| b.to_u32())
                    .ok_or(VmError::ArithmeticOverflow { index, opcode })?;
                let combined = tier::select_lte(&values, block, decoded.logic, decoded.mode);
                self.push(index, combined)?;
            }

            Opcode::Erc20BalanceOf => {
                let (token, account) = self.pop2(index, opcode)?;
                let v = self.ctx.erc20_balance_of(&token, &account)?;
                self.push(index, v)?;
            }
            Opcode::Erc20TotalSupply => {
                let token = self.pop_n(index, opcode, 1)?.remove(0);
                let v = self.ctx.erc20_total_supply(&token)?;
                self.push(index, v)?;
            }
            Opcode::Erc721BalanceOf => {
                let (token, owner) = self.pop2(index, opcode)?;
                let v = self.ctx.erc721_balance_of(&token, &owner)?;
                self.push(index, v)?;
            }
            Opcode::Erc721OwnerOf => {
                let (token, id) = self.pop2(index, opcode)?;
                let v = self.ctx.erc721_owner_of(&token, &id)?;
                self.push(index, v)?;
            }
            Opcode::Erc1155BalanceOf => {
                let mut values = self.pop_n(index, opcode, 3)?;
                let id = values.remove(2);
                let account = values.remove(1);
                let token = values.remove(0);
                let v = self.ctx.erc1155_balance_of(&token, &account, &id)?;
                self.push(index, v)?;
            }
            Opcode::Erc1155BalanceOfBatch => {
                let pairs = operand as usize + 1;
                let values = self.pop_n(index, opcode, 1 + 2 * pairs)?;
                let token = &values[0];
                let accounts = &values[1..=pairs];
                let ids = &values[1 + pairs..];
                let balances = accounts
                    .iter()
                    .zip(ids)
                    .map(|(account, id)| self.ctx.erc1155_balance_of(token, account, id))
                    .collect::<VmResult<Vec<_>>>()?;
                for balance in balances {
                    self.push(index, balance)?;
                }
            }

            Opcode::RemainingUnits
            | Opcode::TotalReserveIn
            | Opcode::LastBuyBlock
            | Opcode::LastBuyUnits
            | Opcode::LastBuyPrice
            | Opcode::CurrentBuyUnits
            | Opcode::TokenAddress
            | Opcode::ReserveAddress => {
                let field = SaleField::from_opcode(opcode).ok_or(VmError::Unsupported { index, opcode })?;
                let v = self.ctx.sale(field);
                self.push(index, v)?;
            }
        }

        Ok(())
    }

    /// Fold a variadic math opcode left to right over `values`
    fn fold_math(&self, index: usize, opcode: Opcode, values: Vec<BigUint>) -> VmResult<BigUint> {
        let mut iter = values.into_iter();
        let mut acc = iter.next().ok_or(VmError::InvalidOperand {
            index,
            opcode,
            operand: 0,
        })?;

        for value in iter {
            acc = match opcode {
                Opcode::Add => self.checked(index, opcode, acc + value)?,
                Opcode::Sub => {
                    if value > acc {
                        return Err(VmError::ArithmeticOverflow { index, opcode });
                    }
                    acc - value
                }
                Opcode::Mul => self.checked(index, opcode, acc * value)?,
                Opcode::Div | Opcode::Mod => {
                    if value.is_zero() {
                        return Err(VmError::DivisionByZero { index, opcode });
                    }
                    if opcode == Opcode::Div { acc / value } else { acc % value }
                }
                Opcode::Pow => self.checked_pow(index, opcode, acc, &value)?,
                Opcode::Min => acc.min(value),
                Opcode::Max => acc.max(value),
                _ => return Err(VmError::Unsupported { index, opcode }),
            };
        }
        Ok(acc)
    }

    fn checked_pow(&self, index: usize, opcode: Opcode, base: BigUint, exponent: &BigUint) -> VmResult<BigUint> {
        if base.is_zero() || base.is_one() {
            return Ok(if exponent.is_zero() { BigUint::one() } else { base });
        }
        // any base >= 2 overflows 256 bits past this exponent
        let exponent = exponent
            .to_u32()
            .filter(|e| *e <= rainvm_bytecode::WORD_BITS as u32)
            .ok_or(VmError::ArithmeticOverflow { index, opcode })?;
        self.checked(index, opcode, base.pow(exponent))
    }
}

fn flag(value: bool) -> BigUint {
    if value { BigUint::one() } else { BigUint::zero() }
}

fn variadic(index: usize, opcode: Opcode, operand: u32) -> VmResult<usize> {
    if operand == 0 {
        return Err(VmError::InvalidOperand { index, opcode, operand });
    }
    Ok(operand as usize)
}
