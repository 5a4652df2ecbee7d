//! Property tests for the fixed-width codec and instruction layout

use num_bigint::BigUint;
use proptest::prelude::*;
use rainvm_bytecode::codec::{decode, encode};
use rainvm_bytecode::{BytecodeError, Instruction, Layout, Opcode, build, op_with};

fn any_opcode() -> impl Strategy<Value = Opcode> {
    (0usize..Opcode::ALL.len()).prop_map(|i| Opcode::ALL[i])
}

proptest! {
    #[test]
    fn prop_encode_decode_within_width(bytes in proptest::collection::vec(any::<u8>(), 0..40), extra in 0usize..4) {
        let value = BigUint::from_bytes_be(&bytes);
        let width = bytes.len().max(1) + extra;

        let encoded = encode(&value, width).unwrap();
        prop_assert_eq!(encoded.len(), width);
        prop_assert_eq!(decode(&encoded), value);
    }

    #[test]
    fn prop_encode_rejects_oversized(width in 1usize..33, excess in 0u32..64) {
        // 256^width + excess is always one byte too wide
        let value = (BigUint::from(1u32) << (8 * width)) + BigUint::from(excess);
        let overflowed = matches!(encode(&value, width), Err(BytecodeError::ValueOverflow { .. }));
        prop_assert!(overflowed);
    }

    #[test]
    fn prop_instruction_layout(opcode in any_opcode(), operand in 0u32..=0xFFFF, operand_width in 2usize..5) {
        let layout = Layout::with_operand_width(operand_width).unwrap();
        let bytes = Instruction::new(opcode, operand).encode(layout).unwrap();

        prop_assert_eq!(bytes.len(), 1 + operand_width);
        let expected_opcode = encode(&BigUint::from(opcode.to_byte()), 1).unwrap();
        let expected_operand = encode(&BigUint::from(operand), operand_width).unwrap();
        prop_assert_eq!(&bytes[..1], expected_opcode.as_slice());
        prop_assert_eq!(&bytes[1..], expected_operand.as_slice());
    }

    #[test]
    fn prop_default_layout_operand_bound(opcode in any_opcode(), operand in 0u32..1024) {
        let result = Instruction::new(opcode, operand).encode(Layout::DEFAULT);
        if operand < 256 {
            prop_assert_eq!(result.unwrap(), vec![opcode.to_byte(), operand as u8]);
        } else {
            let overflowed = matches!(result, Err(BytecodeError::OperandOverflow { .. }));
            prop_assert!(overflowed);
        }
    }

    #[test]
    fn prop_val_index_checked(len in 0usize..8, index in 0u32..10) {
        let constants: Vec<BigUint> = (0..len).map(BigUint::from).collect();
        let result = build(&[op_with(Opcode::Val, index)], constants);
        if (index as usize) < len {
            prop_assert_eq!(result.unwrap().stack_length(), 1);
        } else {
            let out_of_range = matches!(result, Err(BytecodeError::ConstantIndexOutOfRange { .. }));
            prop_assert!(out_of_range);
        }
    }
}

#[test]
fn val_index_equal_to_pool_length_fails() {
    let constants = vec![BigUint::from(100u32), BigUint::from(10u32)];
    let err = build(&[op_with(Opcode::Val, 2)], constants).unwrap_err();
    assert!(matches!(
        err,
        BytecodeError::ConstantIndexOutOfRange { operand: 2, len: 2, .. }
    ));
}
