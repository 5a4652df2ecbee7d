//! # rainvm expressions
//!
//! Ready-made programs for the rules a sale needs answered on chain:
//!
//! - [`gate_config`]: a gate that is always open
//! - [`after_timestamp_config`]: a gate that opens once a timestamp has passed
//! - [`calculate_price_config`]: a static price that becomes unpayable once a
//!   buyer would exceed a per-wallet cap
//!
//! [`SaleStateConfigs`] bundles one of each into the three state configs a
//! sale deployment takes.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod gate;
pub mod price;
pub mod sale;

pub use gate::{after_timestamp_config, gate_config};
pub use price::{PriceRule, calculate_price_config};
pub use sale::{DEFAULT_RAISE_DURATION_SECS, RaiseRange, SaleError, SaleStateConfigs};

pub use rainvm_bytecode::{BytecodeError, Program, Result};
