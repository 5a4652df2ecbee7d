//! JSON payload format
//!
//! The deployer consumes programs as ethers-style JSON: sources are `0x` hex
//! strings, constants are decimal strings, and the two sizes are plain
//! integers.
//!
//! ```json
//! { "sources": ["0x0100"], "constants": ["1"], "stackLength": 1, "argumentsLength": 0 }
//! ```

use serde::Deserialize;

use crate::constant::ConstantPool;
use crate::error::{BytecodeError, Result};
use crate::operand::Layout;
use crate::program::Program;

/// Unchecked wire form of a [`Program`]
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProgram {
    #[serde(with = "hex_sources")]
    sources: Vec<Vec<u8>>,
    constants: ConstantPool,
    stack_length: u32,
    arguments_length: u32,
}

impl TryFrom<RawProgram> for Program {
    type Error = BytecodeError;

    fn try_from(raw: RawProgram) -> Result<Self> {
        let program = Program::from_parts(raw.sources, raw.constants, raw.stack_length, raw.arguments_length);
        program.verify(Layout::DEFAULT)?;
        Ok(program)
    }
}

impl Program {
    /// Serialize to compact JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serialize to indented JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON, verifying against the default layout
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parse a `0x`-prefixed (or bare) hex string into bytes
pub fn parse_hex(text: &str) -> Result<Vec<u8>> {
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(BytecodeError::from)
}

/// Render bytes as a lowercase `0x`-prefixed hex string
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Serde adapter writing each source as a hex string
pub mod hex_sources {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize sources as `0x` hex strings
    pub fn serialize<S: Serializer>(sources: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(sources.len()))?;
        for source in sources {
            seq.serialize_element(&super::to_hex(source))?;
        }
        seq.end()
    }

    /// Deserialize sources from hex strings
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| super::parse_hex(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
