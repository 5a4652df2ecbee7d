//! Wallet-cap aware static price
//!
//! The program computes
//!
//! ```text
//! if current_buy_units + token.balanceOf(sender) > wallet_cap
//!     then MaxUint256      (nothing can be bought)
//!     else static_price
//! ```
//!
//! Both branches are on the stack before `EAGER_IF` picks one.

use num_bigint::BigUint;
use rainvm_bytecode::{ConstantPool, Opcode, Program, Result, max_uint256, op, op_with};
use serde::{Deserialize, Serialize};

/// Declared stack length of the price program, kept for parity with the
/// configs already deployed
pub const PRICE_STACK_LENGTH: u32 = 10;

/// Parameters of the wallet-cap price rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRule {
    /// Price per unit while under the cap
    #[serde(with = "rainvm_bytecode::constant::uint")]
    pub static_price: BigUint,
    /// Most units a single wallet may hold; MaxUint256 disables the cap
    #[serde(with = "rainvm_bytecode::constant::uint")]
    pub wallet_cap: BigUint,
}

impl PriceRule {
    /// Create a price rule
    pub fn new(static_price: impl Into<BigUint>, wallet_cap: impl Into<BigUint>) -> Self {
        Self {
            static_price: static_price.into(),
            wallet_cap: wallet_cap.into(),
        }
    }

    /// Assemble the rule into a program
    pub fn to_program(&self) -> Result<Program> {
        let mut pool = ConstantPool::with_capacity(3);
        let static_price = pool.push(self.static_price.clone());
        let wallet_cap = pool.push(self.wallet_cap.clone());
        let unpayable = pool.push(max_uint256());

        Program::builder()
            // units wanted now plus units already held
            .instruction(op(Opcode::CurrentBuyUnits))
            .instruction(op(Opcode::TokenAddress))
            .instruction(op(Opcode::Sender))
            .instruction(op(Opcode::Erc20BalanceOf))
            .instruction(op_with(Opcode::Add, 2))
            // over the cap?
            .instruction(op_with(Opcode::Val, wallet_cap))
            .instruction(op(Opcode::GreaterThan))
            .instruction(op_with(Opcode::Val, unpayable))
            .instruction(op_with(Opcode::Val, static_price))
            .instruction(op(Opcode::EagerIf))
            .constants(pool)
            .stack_length(PRICE_STACK_LENGTH)
            .build()
    }
}

/// Program pricing every unit at `static_price` until a wallet would exceed `wallet_cap`
pub fn calculate_price_config(
    static_price: impl Into<BigUint>,
    wallet_cap: impl Into<BigUint>,
) -> Result<Program> {
    PriceRule::new(static_price, wallet_cap).to_program()
}
