//! Source decoding and human-readable listings

use crate::codec;
use crate::error::{BytecodeError, Result};
use crate::instruction::{Instruction, Opcode};
use crate::operand::Layout;
use crate::program::Program;

/// Decode a source back into instructions
pub fn decode_source(source: &[u8], layout: Layout) -> Result<Vec<Instruction>> {
    let size = layout.instruction_size();
    if source.len() % size != 0 {
        return Err(BytecodeError::UnexpectedEnd(source.len() - source.len() % size));
    }

    source
        .chunks_exact(size)
        .enumerate()
        .map(|(i, chunk)| {
            let offset = i * size;
            let (opcode_bytes, operand_bytes) = chunk.split_at(layout.opcode_width);
            let raw = codec::decode_u32(opcode_bytes)
                .map_err(|_| BytecodeError::InvalidOpcode { opcode: u32::MAX, offset })?;
            let opcode = u8::try_from(raw)
                .ok()
                .and_then(Opcode::from_byte)
                .ok_or(BytecodeError::InvalidOpcode { opcode: raw, offset })?;
            let operand = codec::decode_u32(operand_bytes).map_err(|_| BytecodeError::InvalidOperand {
                index: i,
                opcode,
                operand: u32::MAX,
            })?;
            Ok(Instruction::new(opcode, operand))
        })
        .collect()
}

/// Render every source of `program` as an annotated listing
pub fn disassemble(program: &Program, layout: Layout) -> Result<String> {
    let mut out = String::new();
    let size = layout.instruction_size();

    for (n, source) in program.sources().iter().enumerate() {
        out.push_str(&format!("source {n}:\n"));
        let instructions = decode_source(source, layout)?;
        if instructions.is_empty() {
            out.push_str("  (empty source)\n");
        }
        for (i, instruction) in instructions.iter().enumerate() {
            let offset = i * size;
            let raw = &source[offset..offset + size];
            out.push_str(&format!(
                "  {:04x}  {}  {:<28} {}",
                offset,
                hex::encode(raw),
                instruction.opcode.name(),
                instruction.operand.value()
            ));
            if let Some(note) = annotate(program, instruction) {
                out.push_str(&format!("  ; {note}"));
            }
            out.push('\n');
        }
    }

    out.push_str(&format!(
        "constants: {}  stackLength: {}  argumentsLength: {}\n",
        program.constants().len(),
        program.stack_length(),
        program.arguments_length()
    ));
    Ok(out)
}

fn annotate(program: &Program, instruction: &Instruction) -> Option<String> {
    let operand = instruction.operand.value();
    match instruction.opcode {
        Opcode::Val => Some(match program.constants().get(operand) {
            Some(value) if *value == crate::constant::max_uint256() => "MaxUint256".to_string(),
            Some(value) => value.to_string(),
            None => "<missing constant>".to_string(),
        }),
        op if op.is_variadic() => Some(format!("{operand} values")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{op, op_with};
    use crate::program::build;
    use num_bigint::BigUint;

    #[test]
    fn test_decode_source() {
        let decoded = decode_source(&[5, 0, 1, 0, 11, 0], Layout::DEFAULT).unwrap();
        assert_eq!(
            decoded,
            vec![op(Opcode::BlockTimestamp), op_with(Opcode::Val, 0), op(Opcode::GreaterThan)]
        );
    }

    #[test]
    fn test_decode_truncated() {
        assert!(matches!(
            decode_source(&[1, 0, 5], Layout::DEFAULT),
            Err(BytecodeError::UnexpectedEnd(2))
        ));
    }

    #[test]
    fn test_decode_invalid_opcode() {
        assert!(matches!(
            decode_source(&[1, 0, 99, 0], Layout::DEFAULT),
            Err(BytecodeError::InvalidOpcode { opcode: 99, offset: 2 })
        ));
    }

    #[test]
    fn test_decode_wide_operand() {
        let layout = Layout::with_operand_width(2).unwrap();
        let decoded = decode_source(&[1, 1, 0], layout).unwrap();
        assert_eq!(decoded, vec![op_with(Opcode::Val, 256)]);
    }

    #[test]
    fn test_disassemble() {
        let program = build(
            &[op(Opcode::BlockTimestamp), op_with(Opcode::Val, 0), op(Opcode::GreaterThan)],
            vec![BigUint::from(1_700_000_000u64)],
        )
        .unwrap();
        let listing = disassemble(&program, Layout::DEFAULT).unwrap();

        assert!(listing.starts_with("source 0:\n"));
        assert!(listing.contains("0000  0500  BLOCK_TIMESTAMP"));
        assert!(listing.contains("; 1700000000"));
        assert!(listing.contains("GREATER_THAN"));
        assert!(listing.ends_with("constants: 1  stackLength: 2  argumentsLength: 0\n"));
    }

    #[test]
    fn test_disassemble_full_listing() {
        let program = build(&[op_with(Opcode::Val, 0), op_with(Opcode::Add, 1)], vec![crate::max_uint256()])
            .unwrap();
        let listing = disassemble(&program, Layout::DEFAULT).unwrap();
        let expected = format!(
            "source 0:\n  0000  0100  {:<28} 0  ; MaxUint256\n  0002  0e01  {:<28} 1  ; 1 values\nconstants: 1  stackLength: 1  argumentsLength: 0\n",
            "VAL", "ADD"
        );
        assert_eq!(listing, expected);
    }
}
