//! Constant pool for programs

use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{One, Num};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{BytecodeError, Result};

/// The largest 256-bit word, used as an "infinite" price
pub fn max_uint256() -> BigUint {
    (BigUint::one() << 256u32) - BigUint::one()
}

/// Parse a constant from decimal or `0x`-prefixed hex text
pub fn parse_uint(text: &str) -> Result<BigUint> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => BigUint::from_str_radix(hex, 16),
        None => BigUint::from_str(text),
    };
    parsed.map_err(|_| BytecodeError::InvalidConstant(text.to_string()))
}

/// Ordered pool of scalar constants referenced by VAL operands
///
/// Order is significant and values are never deduplicated, so an index handed
/// out by [`ConstantPool::push`] stays valid for the lifetime of the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantPool {
    #[serde(with = "uint_seq")]
    constants: Vec<BigUint>,
}

impl ConstantPool {
    /// Create a new empty constant pool
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
        }
    }

    /// Create constant pool with pre-allocated capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constants: Vec::with_capacity(capacity),
        }
    }

    /// Append a constant, returns its index
    pub fn push(&mut self, constant: impl Into<BigUint>) -> u32 {
        let idx = self.constants.len() as u32;
        self.constants.push(constant.into());
        idx
    }

    /// Get a constant by index
    #[inline]
    pub fn get(&self, index: u32) -> Option<&BigUint> {
        self.constants.get(index as usize)
    }

    /// Number of constants in the pool
    #[inline]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over constants
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BigUint> {
        self.constants.iter()
    }

    /// Borrow the constants as a slice
    #[inline]
    pub fn as_slice(&self) -> &[BigUint] {
        &self.constants
    }
}

impl From<Vec<BigUint>> for ConstantPool {
    fn from(constants: Vec<BigUint>) -> Self {
        Self { constants }
    }
}

impl<const N: usize> From<[BigUint; N]> for ConstantPool {
    fn from(constants: [BigUint; N]) -> Self {
        Self {
            constants: constants.into(),
        }
    }
}

impl FromIterator<BigUint> for ConstantPool {
    fn from_iter<I: IntoIterator<Item = BigUint>>(iter: I) -> Self {
        Self {
            constants: iter.into_iter().collect(),
        }
    }
}

/// Loose input form: ethers accepts decimal strings, hex strings and plain numbers
#[derive(Deserialize)]
#[serde(untagged)]
enum UintRepr {
    Number(u64),
    Text(String),
}

impl UintRepr {
    fn into_uint<E: serde::de::Error>(self) -> std::result::Result<BigUint, E> {
        match self {
            Self::Number(n) => Ok(BigUint::from(n)),
            Self::Text(s) => parse_uint(&s).map_err(E::custom),
        }
    }
}

/// Serde adapter for a single [`BigUint`] written as a decimal string
pub mod uint {
    use super::*;

    /// Serialize as a decimal string
    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    /// Deserialize from a decimal string, hex string or integer
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<BigUint, D::Error> {
        UintRepr::deserialize(deserializer)?.into_uint()
    }
}

/// Serde adapter for a sequence of [`BigUint`] written as decimal strings
pub mod uint_seq {
    use super::*;
    use serde::ser::SerializeSeq;

    /// Serialize as an array of decimal strings
    pub fn serialize<S: Serializer>(values: &[BigUint], serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&value.to_str_radix(10))?;
        }
        seq.end()
    }

    /// Deserialize from an array of decimal strings, hex strings or integers
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<BigUint>, D::Error> {
        Vec::<UintRepr>::deserialize(deserializer)?
            .into_iter()
            .map(UintRepr::into_uint)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_pool_keeps_duplicates() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.push(10u32);
        let idx2 = pool.push(10u32);
        let idx3 = pool.push(max_uint256());

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_constant_get() {
        let mut pool = ConstantPool::new();
        pool.push(100u32);

        assert_eq!(pool.get(0), Some(&BigUint::from(100u32)));
        assert_eq!(pool.get(1), None);
    }

    #[test]
    fn test_max_uint256() {
        let max = max_uint256();
        assert_eq!(max.bits(), 256);
        assert_eq!(
            max.to_str_radix(16),
            "ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff"
        );
    }

    #[test]
    fn test_parse_uint() {
        assert_eq!(parse_uint("1700000000").unwrap(), BigUint::from(1_700_000_000u64));
        assert_eq!(parse_uint("0xff").unwrap(), BigUint::from(255u32));
        assert!(matches!(
            parse_uint("-1"),
            Err(BytecodeError::InvalidConstant(_))
        ));
    }

    #[test]
    fn test_pool_serde() {
        let pool = ConstantPool::from(vec![BigUint::from(1u32), max_uint256()]);
        let json = serde_json::to_string(&pool).unwrap();
        assert!(json.starts_with("[\"1\",\"115792089237316195423570985008687907853269984665640564039457584007913129639935\"]"));

        let loose: ConstantPool = serde_json::from_str(r#"[5, "0x10", "7"]"#).unwrap();
        let values: Vec<u32> = loose.iter().map(|v| u32::try_from(v).unwrap()).collect();
        assert_eq!(values, vec![5, 16, 7]);
    }
}
