//! Fixed-width big-endian integer codec
//!
//! Every field of an instruction is a big-endian unsigned integer left padded
//! with zero bytes to a fixed width. Values that need more bytes than the
//! width allows are rejected, never truncated.

use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::{BytecodeError, Result};

/// Number of significant bytes needed to represent `value` (zero needs none)
#[inline]
pub fn byte_len(value: &BigUint) -> usize {
    value.bits().div_ceil(8) as usize
}

/// Encode `value` as exactly `width` big-endian bytes
pub fn encode(value: &BigUint, width: usize) -> Result<Vec<u8>> {
    if width == 0 {
        return Err(BytecodeError::InvalidWidth(width));
    }

    let needed = byte_len(value);
    if needed > width {
        return Err(BytecodeError::ValueOverflow {
            value: value.clone(),
            width,
        });
    }

    let mut out = vec![0u8; width - needed];
    if !value.is_zero() {
        out.extend_from_slice(&value.to_bytes_be());
    }
    debug_assert_eq!(out.len(), width);
    Ok(out)
}

/// Encode a machine integer as exactly `width` big-endian bytes
pub fn encode_u64(value: u64, width: usize) -> Result<Vec<u8>> {
    encode(&BigUint::from(value), width)
}

/// Decode big-endian bytes into an unsigned integer
#[inline]
pub fn decode(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Decode big-endian bytes into a `u32`, failing if the value is larger
pub fn decode_u32(bytes: &[u8]) -> Result<u32> {
    let value = decode(bytes);
    u32::try_from(&value).map_err(|_| BytecodeError::ValueOverflow { value, width: 4 })
}
