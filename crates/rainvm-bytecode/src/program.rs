//! Program representation and assembler
//!
//! A [`Program`] is the unit handed to the VM: one or more byte sources, the
//! constant pool they index into, and the stack and argument sizes the VM must
//! allocate. [`ProgramBuilder`] assembles a program from instructions and
//! checks it by simulating stack depth before any bytes leave the crate.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::constant::ConstantPool;
use crate::disasm::decode_source;
use crate::error::{BytecodeError, Result};
use crate::instruction::{Instruction, Opcode};
use crate::operand::Layout;

/// An assembled program, immutable once built
///
/// Deserialized programs are verified against [`Layout::DEFAULT`], so every
/// `Program` in hand satisfies the stack and constant checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "crate::payload::RawProgram")]
pub struct Program {
    /// Concatenated instruction bytes; index 0 is the entry point
    #[serde(with = "crate::payload::hex_sources")]
    sources: Vec<Vec<u8>>,

    /// Values referenced by VAL operands
    constants: ConstantPool,

    /// Stack slots the VM must allocate
    stack_length: u32,

    /// Values supplied by the caller at run time
    arguments_length: u32,
}

impl Program {
    pub(crate) fn from_parts(
        sources: Vec<Vec<u8>>,
        constants: ConstantPool,
        stack_length: u32,
        arguments_length: u32,
    ) -> Self {
        Self {
            sources,
            constants,
            stack_length,
            arguments_length,
        }
    }

    /// Create a new program builder
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::new()
    }

    /// All sources
    #[inline]
    pub fn sources(&self) -> &[Vec<u8>] {
        &self.sources
    }

    /// The entry-point source
    #[inline]
    pub fn entry_source(&self) -> &[u8] {
        self.sources.first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// The constant pool
    #[inline]
    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    /// Declared stack length
    #[inline]
    pub fn stack_length(&self) -> u32 {
        self.stack_length
    }

    /// Declared arguments length
    #[inline]
    pub fn arguments_length(&self) -> u32 {
        self.arguments_length
    }

    /// Decode the entry source back into instructions
    pub fn instructions(&self, layout: Layout) -> Result<Vec<Instruction>> {
        decode_source(self.entry_source(), layout)
    }

    /// Re-check every source against the constant pool and declared stack length
    ///
    /// Programs built with [`ProgramBuilder`] always pass; this is for payloads
    /// that arrive from outside, e.g. through [`Program::from_json`].
    pub fn verify(&self, layout: Layout) -> Result<StackAnalysis> {
        let mut overall = StackAnalysis::default();
        for source in &self.sources {
            let instructions = decode_source(source, layout)?;
            let analysis = analyze(&instructions, self.constants.len())?;
            check_declared(self.stack_length, analysis.peak)?;
            overall.peak = overall.peak.max(analysis.peak);
            overall.final_depth = analysis.final_depth;
        }
        Ok(overall)
    }
}

/// Result of the abstract stack simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackAnalysis {
    /// Highest depth reached at any point
    pub peak: u32,
    /// Depth after the last instruction
    pub final_depth: u32,
}

/// Simulate stack depth over `instructions`
///
/// Also checks that every VAL operand indexes into a pool of `constants_len`
/// values and that variadic opcodes fold over at least one value.
pub fn analyze(instructions: &[Instruction], constants_len: usize) -> Result<StackAnalysis> {
    let mut depth = 0usize;
    let mut peak = 0usize;

    for (index, instruction) in instructions.iter().enumerate() {
        let opcode = instruction.opcode;
        let operand = instruction.operand.value();

        if opcode == Opcode::Val && operand as usize >= constants_len {
            return Err(BytecodeError::ConstantIndexOutOfRange {
                index,
                operand,
                len: constants_len,
            });
        }
        if opcode.is_variadic() && operand == 0 {
            return Err(BytecodeError::InvalidOperand {
                index,
                opcode,
                operand,
            });
        }

        let effect = instruction
            .stack_effect()
            .ok_or(BytecodeError::UnknownOpcode { index, opcode })?;
        if effect.inputs > depth {
            return Err(BytecodeError::StackUnderflow {
                index,
                opcode,
                required: effect.inputs,
                available: depth,
            });
        }

        depth = depth - effect.inputs + effect.outputs;
        peak = peak.max(depth);
    }

    Ok(StackAnalysis {
        peak: peak as u32,
        final_depth: depth as u32,
    })
}

/// Assemble `instructions` against `constants` with an inferred stack length
pub fn build(instructions: &[Instruction], constants: impl Into<ConstantPool>) -> Result<Program> {
    Program::builder()
        .instructions(instructions.iter().copied())
        .constants(constants)
        .build()
}

fn check_declared(declared: u32, required: u32) -> Result<()> {
    if declared < required {
        return Err(BytecodeError::StackLengthTooSmall { declared, required });
    }
    Ok(())
}

/// Builder for creating programs
#[derive(Debug, Clone, Default)]
pub struct ProgramBuilder {
    instructions: Vec<Instruction>,
    constants: ConstantPool,
    stack_length: Option<u32>,
    stack_margin: u32,
    arguments_length: u32,
    layout: Layout,
}

impl ProgramBuilder {
    /// Create a new program builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single instruction
    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Add several instructions in order
    pub fn instructions(mut self, instructions: impl IntoIterator<Item = Instruction>) -> Self {
        self.instructions.extend(instructions);
        self
    }

    /// Append a constant to the pool
    pub fn constant(mut self, constant: impl Into<BigUint>) -> Self {
        self.constants.push(constant);
        self
    }

    /// Replace the constant pool
    pub fn constants(mut self, constants: impl Into<ConstantPool>) -> Self {
        self.constants = constants.into();
        self
    }

    /// Declare the stack length explicitly instead of inferring it
    ///
    /// Over-provisioning is accepted; a value below the simulated peak makes
    /// [`build`](Self::build) fail.
    pub fn stack_length(mut self, length: u32) -> Self {
        self.stack_length = Some(length);
        self
    }

    /// Extra slots added on top of the simulated peak
    pub fn stack_margin(mut self, margin: u32) -> Self {
        self.stack_margin = margin;
        self
    }

    /// Set arguments length
    pub fn arguments_length(mut self, length: u32) -> Self {
        self.arguments_length = length;
        self
    }

    /// Set the field layout used to encode instructions
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Build the program
    pub fn build(self) -> Result<Program> {
        let analysis = analyze(&self.instructions, self.constants.len())?;

        let mut source = Vec::with_capacity(self.instructions.len() * self.layout.instruction_size());
        for (index, instruction) in self.instructions.iter().enumerate() {
            instruction
                .encode_into(self.layout, &mut source)
                .map_err(|err| err.at(index))?;
        }

        let stack_length = match self.stack_length {
            Some(declared) => {
                check_declared(declared, analysis.peak)?;
                declared
            }
            None => analysis.peak.saturating_add(self.stack_margin),
        };

        tracing::debug!(
            instructions = self.instructions.len(),
            constants = self.constants.len(),
            peak = analysis.peak,
            stack_length,
            "assembled program"
        );

        Ok(Program {
            sources: vec![source],
            constants: self.constants,
            stack_length,
            arguments_length: self.arguments_length,
        })
    }
}
