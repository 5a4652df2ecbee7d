//! Tier report arithmetic
//!
//! A report packs eight 32-bit block numbers into one word: lane `i` holds the
//! block at which tier `i + 1` was reached, `0xFFFFFFFF` meaning never. Tier 0
//! is implicit and always held since block 0.

use num_bigint::BigUint;
use num_traits::ToPrimitive;

/// Number of tiers packed into a report
pub const TIERS: usize = 8;

/// Lane value for a tier that was never reached
pub const NEVER: u32 = u32::MAX;

/// Packed report where no tier was ever held
pub fn never_report() -> BigUint {
    from_lanes([NEVER; TIERS])
}

/// Packed report where every tier was held since block 0
pub fn always_report() -> BigUint {
    BigUint::default()
}

/// Unpack a report into its eight lanes
pub fn lanes(report: &BigUint) -> [u32; TIERS] {
    let mask = BigUint::from(u32::MAX);
    let mut out = [0u32; TIERS];
    for (i, lane) in out.iter_mut().enumerate() {
        let bits = (report >> (32 * i)) & &mask;
        *lane = bits.to_u32().unwrap_or(NEVER);
    }
    out
}

/// Pack eight lanes into a report
pub fn from_lanes(lanes: [u32; TIERS]) -> BigUint {
    lanes
        .iter()
        .enumerate()
        .fold(BigUint::default(), |acc, (i, lane)| acc | (BigUint::from(*lane) << (32 * i)))
}

/// Per-tier `newer - older`, floored at zero
pub fn saturating_diff(newer: &BigUint, older: &BigUint) -> BigUint {
    let newer = lanes(newer);
    let older = lanes(older);
    let mut out = [0u32; TIERS];
    for i in 0..TIERS {
        out[i] = newer[i].saturating_sub(older[i]);
    }
    from_lanes(out)
}

/// Set tiers `start_tier + 1 ..= end_tier` to `block`
pub fn update_blocks_for_tier_range(report: &BigUint, start_tier: usize, end_tier: usize, block: u32) -> BigUint {
    let mut out = lanes(report);
    for lane in out.iter_mut().take(end_tier.min(TIERS)).skip(start_tier) {
        *lane = block;
    }
    from_lanes(out)
}

/// How [`select_lte`] treats a tier some reports have not reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    /// Every report must have the tier at or before the block
    Every,
    /// At least one report must have the tier at or before the block
    Any,
}

/// Which qualifying block [`select_lte`] keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Earliest block
    Min,
    /// Latest block
    Max,
    /// Block from the first qualifying report
    First,
}

/// Packed SELECT_LTE operand: `[logic:1][mode:2][reports:5]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectLteOperand {
    /// Combination logic
    pub logic: Logic,
    /// Selection mode
    pub mode: Mode,
    /// Number of reports on the stack
    pub reports: usize,
}

impl SelectLteOperand {
    /// Unpack an operand, `None` for the unused mode value 3
    pub fn decode(operand: u32) -> Option<Self> {
        let logic = if operand & 0x80 == 0 { Logic::Every } else { Logic::Any };
        let mode = match (operand >> 5) & 0x3 {
            0 => Mode::Min,
            1 => Mode::Max,
            2 => Mode::First,
            _ => return None,
        };
        Some(Self {
            logic,
            mode,
            reports: (operand & 0x1F) as usize,
        })
    }
}

/// Combine reports tier by tier, keeping blocks at or before `block`
pub fn select_lte(reports: &[BigUint], block: u32, logic: Logic, mode: Mode) -> BigUint {
    let unpacked: Vec<[u32; TIERS]> = reports.iter().map(lanes).collect();
    let mut out = [NEVER; TIERS];

    for (tier, slot) in out.iter_mut().enumerate() {
        let mut accumulator = match mode {
            Mode::Min => NEVER,
            Mode::Max | Mode::First => 0,
        };
        let mut any_lte = false;

        for report in &unpacked {
            let reached = report[tier];
            if reached <= block {
                accumulator = match mode {
                    Mode::Min => accumulator.min(reached),
                    Mode::Max => accumulator.max(reached),
                    Mode::First if !any_lte => reached,
                    Mode::First => accumulator,
                };
                any_lte = true;
            } else if logic == Logic::Every {
                any_lte = false;
                break;
            }
        }

        *slot = if any_lte { accumulator } else { NEVER };
    }

    from_lanes(out)
}
