//! End-to-end runs of the sale expressions

use num_bigint::BigUint;
use proptest::prelude::*;
use rainvm_bytecode::{Program, max_uint256};
use rainvm_core::{Interpreter, SaleField, StaticContext, VmError};
use rainvm_expr::{after_timestamp_config, calculate_price_config, gate_config};

const TOKEN: u64 = 0x5fbd_b231;
const BUYER: u64 = 0x7099_7970;

fn eval(program: &Program, ctx: &StaticContext) -> BigUint {
    Interpreter::new().execute(program, ctx).unwrap().result
}

fn buyer_context(units: u64, held: u64) -> StaticContext {
    StaticContext::new()
        .sender(BUYER)
        .sale_field(SaleField::TokenAddress, TOKEN)
        .sale_field(SaleField::CurrentBuyUnits, units)
        .erc20_balance(TOKEN, BUYER, held)
}

#[test]
fn gate_returns_its_flag() {
    let ctx = StaticContext::new();
    assert_eq!(eval(&gate_config(1u32).unwrap(), &ctx), BigUint::from(1u32));
    assert_eq!(eval(&gate_config(0u32).unwrap(), &ctx), BigUint::from(0u32));
}

#[test]
fn after_timestamp_opens_strictly_after() {
    let program = after_timestamp_config(1_700_000_000u64).unwrap();

    let after = StaticContext::new().block_timestamp(1_700_000_001u64);
    assert_eq!(eval(&program, &after), BigUint::from(1u32));

    let before = StaticContext::new().block_timestamp(1_699_999_999u64);
    assert_eq!(eval(&program, &before), BigUint::from(0u32));

    let exactly = StaticContext::new().block_timestamp(1_700_000_000u64);
    assert_eq!(eval(&program, &exactly), BigUint::from(0u32));
}

#[test]
fn price_under_cap_is_static_price() {
    let program = calculate_price_config(100u32, 10u32).unwrap();
    let outcome = Interpreter::new()
        .execute(&program, &buyer_context(5, 4))
        .unwrap();
    assert_eq!(outcome.result, BigUint::from(100u32));
    assert_eq!(outcome.peak_depth, 3);
    assert_eq!(outcome.steps, 10);
    assert_eq!(outcome.stack.len(), 1);
}

#[test]
fn price_at_cap_is_still_payable() {
    let program = calculate_price_config(100u32, 10u32).unwrap();
    assert_eq!(eval(&program, &buyer_context(6, 4)), BigUint::from(100u32));
}

#[test]
fn price_over_cap_is_unpayable() {
    let program = calculate_price_config(100u32, 10u32).unwrap();
    assert_eq!(eval(&program, &buyer_context(8, 4)), max_uint256());
}

#[test]
fn uncapped_price_never_blocks() {
    let program = calculate_price_config(100u32, max_uint256()).unwrap();
    assert_eq!(eval(&program, &buyer_context(1_000_000, 0)), BigUint::from(100u32));
}

#[test]
fn price_reads_context_from_toml() {
    let ctx: StaticContext = toml::from_str(
        r#"
        sender = "0x70997970"

        [sale]
        current_buy_units = 8
        token_address = "0x5fbdb231"

        [[erc20]]
        token = "0x5fbdb231"
        account = "0x70997970"
        amount = 4
        "#,
    )
    .unwrap();
    let program = calculate_price_config(100u32, 10u32).unwrap();
    assert_eq!(eval(&program, &ctx), max_uint256());
}

#[test]
fn price_overflow_of_held_units_is_an_error() {
    let ctx = StaticContext::new()
        .sender(BUYER)
        .sale_field(SaleField::TokenAddress, TOKEN)
        .sale_field(SaleField::CurrentBuyUnits, 1u32)
        .erc20_balance(TOKEN, BUYER, max_uint256());
    let program = calculate_price_config(100u32, 10u32).unwrap();
    assert!(matches!(
        Interpreter::new().execute(&program, &ctx),
        Err(VmError::ArithmeticOverflow { index: 4, .. })
    ));
}

#[test]
fn payload_survives_json_before_running() {
    let program = calculate_price_config(100u32, 10u32).unwrap();
    let reloaded = Program::from_json(&program.to_json().unwrap()).unwrap();
    assert_eq!(eval(&reloaded, &buyer_context(8, 4)), max_uint256());
}

proptest! {
    #[test]
    fn price_matches_cap_rule(units in 0u64..1_000, held in 0u64..1_000, cap in 0u64..2_000, price in 1u64..1_000_000) {
        let program = calculate_price_config(price, cap).unwrap();
        let expected = if units + held > cap { max_uint256() } else { BigUint::from(price) };
        prop_assert_eq!(eval(&program, &buyer_context(units, held)), expected);
    }

    #[test]
    fn after_timestamp_matches_comparison(start in 0u64..u32::MAX as u64, now in 0u64..u32::MAX as u64) {
        let program = after_timestamp_config(start).unwrap();
        let ctx = StaticContext::new().block_timestamp(now);
        prop_assert_eq!(eval(&program, &ctx), BigUint::from(u32::from(now > start)));
    }
}
