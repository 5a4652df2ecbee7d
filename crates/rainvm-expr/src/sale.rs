//! Sale state-config bundle

use num_bigint::BigUint;
use rainvm_bytecode::Program;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gate::{after_timestamp_config, gate_config};
use crate::price::PriceRule;

/// Default length of a raise opened "now", in seconds
pub const DEFAULT_RAISE_DURATION_SECS: u64 = 30 * 60;

/// Errors building a sale bundle
#[derive(Debug, Error)]
pub enum SaleError {
    /// The raise would end before it starts
    #[error("raise ends at {end}, not after its start {start}")]
    InvalidRange {
        /// Start timestamp
        start: u64,
        /// End timestamp
        end: u64,
    },

    /// Assembling one of the programs failed
    #[error(transparent)]
    Bytecode(#[from] rainvm_bytecode::BytecodeError),
}

/// Unix timestamps (seconds) bounding a raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaiseRange {
    /// The sale can start once the block timestamp is after this
    pub start: u64,
    /// The sale can end once the block timestamp is after this
    pub end: u64,
}

impl RaiseRange {
    /// Create a range, rejecting one that does not move forward in time
    pub fn new(start: u64, end: u64) -> Result<Self, SaleError> {
        if end <= start {
            return Err(SaleError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range starting at `start` and lasting `duration_secs`
    pub fn starting_at(start: u64, duration_secs: u64) -> Result<Self, SaleError> {
        Self::new(start, start.saturating_add(duration_secs))
    }
}

/// The three programs a sale is deployed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleStateConfigs {
    /// Decides whether the sale may start
    pub can_start_state_config: Program,
    /// Decides whether the sale may end
    pub can_end_state_config: Program,
    /// Decides the price a buyer pays
    pub calculate_price_state_config: Program,
}

impl SaleStateConfigs {
    /// Gates that are always open, priced by `rule`
    pub fn always(rule: &PriceRule) -> Result<Self, SaleError> {
        Ok(Self {
            can_start_state_config: gate_config(1u32)?,
            can_end_state_config: gate_config(1u32)?,
            calculate_price_state_config: rule.to_program()?,
        })
    }

    /// Gates opening at the bounds of `range`, priced by `rule`
    pub fn timed(range: RaiseRange, rule: &PriceRule) -> Result<Self, SaleError> {
        tracing::debug!(start = range.start, end = range.end, "building timed sale configs");
        Ok(Self {
            can_start_state_config: after_timestamp_config(BigUint::from(range.start))?,
            can_end_state_config: after_timestamp_config(BigUint::from(range.end))?,
            calculate_price_state_config: rule.to_program()?,
        })
    }

    /// Serialize the bundle as indented JSON
    pub fn to_json_pretty(&self) -> Result<String, SaleError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SaleError::Bytecode(rainvm_bytecode::BytecodeError::Json(e)))
    }
}
