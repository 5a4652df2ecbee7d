//! Assembly commands - emit the canned sale expressions as JSON.

use anyhow::{Context, Result};
use clap::Args;
use num_bigint::BigUint;
use rainvm_bytecode::constant::parse_uint;
use rainvm_expr::{PriceRule, RaiseRange, SaleStateConfigs, after_timestamp_config, gate_config};
use std::path::PathBuf;

use crate::config::{SaleConfig, load_config};

fn uint_arg(text: &str) -> Result<BigUint, String> {
    parse_uint(text).map_err(|e| e.to_string())
}

#[derive(Args)]
pub struct GateCommand {
    /// Value the gate yields (nonzero opens it)
    #[arg(long, default_value = "1", value_parser = uint_arg)]
    pub flag: BigUint,

    /// Print the payload on one line
    #[arg(long)]
    pub compact: bool,
}

impl GateCommand {
    pub fn run(&self) -> Result<()> {
        let program = gate_config(self.flag.clone())?;
        super::print_program(&program, self.compact)
    }
}

#[derive(Args)]
pub struct AfterTimestampCommand {
    /// Unix timestamp the gate opens after
    #[arg(value_parser = uint_arg)]
    pub timestamp: BigUint,

    /// Print the payload on one line
    #[arg(long)]
    pub compact: bool,
}

impl AfterTimestampCommand {
    pub fn run(&self) -> Result<()> {
        let program = after_timestamp_config(self.timestamp.clone())?;
        super::print_program(&program, self.compact)
    }
}

#[derive(Args)]
pub struct PriceCommand {
    /// Price per unit while under the cap
    #[arg(long, value_parser = uint_arg)]
    pub static_price: BigUint,

    /// Most units one wallet may hold ("max" for no cap)
    #[arg(long, value_parser = wallet_cap_arg)]
    pub wallet_cap: BigUint,

    /// Print the payload on one line
    #[arg(long)]
    pub compact: bool,
}

fn wallet_cap_arg(text: &str) -> Result<BigUint, String> {
    if text.eq_ignore_ascii_case("max") {
        return Ok(rainvm_bytecode::max_uint256());
    }
    uint_arg(text)
}

impl PriceCommand {
    pub fn run(&self) -> Result<()> {
        let program = PriceRule::new(self.static_price.clone(), self.wallet_cap.clone()).to_program()?;
        super::print_program(&program, self.compact)
    }
}

#[derive(Args)]
pub struct SaleCommand {
    /// Config file (defaults to rainvm.toml in this or a parent directory)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the raise start timestamp
    #[arg(long)]
    pub start: Option<u64>,

    /// Override the raise length in seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Gate start and end unconditionally
    #[arg(long)]
    pub always: bool,
}

impl SaleCommand {
    pub fn run(&self) -> Result<()> {
        let config = load_config(self.config.as_deref())?;
        let bundle = self.bundle(config.sale, now)?;
        println!("{}", bundle.to_json_pretty()?);
        Ok(())
    }

    /// Merge flags over `sale` and assemble the bundle; `now` is only read
    /// when neither sets a start.
    fn bundle(&self, sale: SaleConfig, now: impl FnOnce() -> Result<u64>) -> Result<SaleStateConfigs> {
        let rule = PriceRule::new(sale.static_price, sale.wallet_cap);

        if self.always || sale.always {
            return Ok(SaleStateConfigs::always(&rule)?);
        }

        let start = match self.start.or(sale.start) {
            Some(start) => start,
            None => now()?,
        };
        let duration = self.duration.unwrap_or(sale.duration_secs);
        let range = RaiseRange::starting_at(start, duration)
            .with_context(|| format!("Invalid raise range from {start} over {duration}s"))?;
        Ok(SaleStateConfigs::timed(range, &rule)?)
    }
}

fn now() -> Result<u64> {
    let timestamp = chrono::Utc::now().timestamp();
    u64::try_from(timestamp).context("system clock is before the unix epoch")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale_command() -> SaleCommand {
        SaleCommand {
            config: None,
            start: None,
            duration: None,
            always: false,
        }
    }

    fn opens_at(program: &rainvm_bytecode::Program) -> BigUint {
        program.constants().get(0).cloned().unwrap()
    }

    fn clock(now: u64) -> impl FnOnce() -> Result<u64> {
        move || Ok(now)
    }

    #[test]
    fn test_sale_defaults_start_now() {
        let bundle = sale_command().bundle(SaleConfig::default(), clock(1_000)).unwrap();
        assert_eq!(opens_at(&bundle.can_start_state_config), BigUint::from(1_000u32));
        assert_eq!(opens_at(&bundle.can_end_state_config), BigUint::from(2_800u32));
        assert_eq!(
            bundle.calculate_price_state_config.constants().get(0),
            Some(&BigUint::from(100u32))
        );
    }

    #[test]
    fn test_sale_config_start_beats_clock() {
        let sale = SaleConfig {
            start: Some(500),
            duration_secs: 60,
            ..SaleConfig::default()
        };
        let bundle = sale_command()
            .bundle(sale, || anyhow::bail!("clock should not be read"))
            .unwrap();
        assert_eq!(opens_at(&bundle.can_start_state_config), BigUint::from(500u32));
        assert_eq!(opens_at(&bundle.can_end_state_config), BigUint::from(560u32));
    }

    #[test]
    fn test_sale_flags_override_config() {
        let sale = SaleConfig {
            start: Some(500),
            duration_secs: 60,
            ..SaleConfig::default()
        };
        let cmd = SaleCommand {
            start: Some(7_000),
            duration: Some(10),
            ..sale_command()
        };
        let bundle = cmd.bundle(sale, clock(1)).unwrap();
        assert_eq!(opens_at(&bundle.can_start_state_config), BigUint::from(7_000u32));
        assert_eq!(opens_at(&bundle.can_end_state_config), BigUint::from(7_010u32));
    }

    #[test]
    fn test_sale_always_flag() {
        let cmd = SaleCommand {
            always: true,
            ..sale_command()
        };
        let bundle = cmd.bundle(SaleConfig::default(), clock(1)).unwrap();
        assert_eq!(opens_at(&bundle.can_start_state_config), BigUint::from(1u32));
        assert_eq!(bundle.can_start_state_config.entry_source(), &[1, 0]);
    }

    #[test]
    fn test_sale_zero_duration_is_rejected() {
        let cmd = SaleCommand {
            duration: Some(0),
            ..sale_command()
        };
        let err = cmd.bundle(SaleConfig::default(), clock(1)).unwrap_err();
        assert!(err.to_string().contains("Invalid raise range"));
    }

    #[test]
    fn test_wallet_cap_arg() {
        assert_eq!(wallet_cap_arg("max").unwrap(), rainvm_bytecode::max_uint256());
        assert_eq!(wallet_cap_arg("0x10").unwrap(), BigUint::from(16u32));
        assert!(wallet_cap_arg("ten").is_err());
    }
}
