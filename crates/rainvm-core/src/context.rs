//! Execution context
//!
//! Everything a program can read that is not in its constant pool: the block,
//! the caller, the sale's own state and token balances.

use num_bigint::BigUint;
use rainvm_bytecode::Opcode;
use rainvm_bytecode::constant::uint;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::{VmError, VmResult};

/// Sale state readable by the sale opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleField {
    /// Units left for sale
    RemainingUnits,
    /// Reserve raised so far
    TotalReserveIn,
    /// Block of the last purchase
    LastBuyBlock,
    /// Units of the last purchase
    LastBuyUnits,
    /// Price of the last purchase
    LastBuyPrice,
    /// Units requested by the current buyer
    CurrentBuyUnits,
    /// Address of the sale's token
    TokenAddress,
    /// Address of the reserve asset
    ReserveAddress,
}

impl SaleField {
    /// The field an opcode reads, if it is a sale opcode
    pub fn from_opcode(opcode: Opcode) -> Option<Self> {
        Some(match opcode {
            Opcode::RemainingUnits => Self::RemainingUnits,
            Opcode::TotalReserveIn => Self::TotalReserveIn,
            Opcode::LastBuyBlock => Self::LastBuyBlock,
            Opcode::LastBuyUnits => Self::LastBuyUnits,
            Opcode::LastBuyPrice => Self::LastBuyPrice,
            Opcode::CurrentBuyUnits => Self::CurrentBuyUnits,
            Opcode::TokenAddress => Self::TokenAddress,
            Opcode::ReserveAddress => Self::ReserveAddress,
            _ => return None,
        })
    }
}

/// Environment queried by context-reading opcodes
pub trait Context {
    /// Current block number
    fn block_number(&self) -> BigUint;

    /// Current block timestamp
    fn block_timestamp(&self) -> BigUint;

    /// Address of the caller
    fn sender(&self) -> BigUint;

    /// A field of the running sale
    fn sale(&self, field: SaleField) -> BigUint;

    /// ERC20 `balanceOf(account)` on `token`
    fn erc20_balance_of(&self, token: &BigUint, account: &BigUint) -> VmResult<BigUint>;

    /// ERC20 `totalSupply()` on `token`
    fn erc20_total_supply(&self, token: &BigUint) -> VmResult<BigUint>;

    /// ERC721 `balanceOf(owner)` on `token`
    fn erc721_balance_of(&self, token: &BigUint, owner: &BigUint) -> VmResult<BigUint>;

    /// ERC721 `ownerOf(id)` on `token`
    fn erc721_owner_of(&self, token: &BigUint, id: &BigUint) -> VmResult<BigUint>;

    /// ERC1155 `balanceOf(account, id)` on `token`
    fn erc1155_balance_of(&self, token: &BigUint, account: &BigUint, id: &BigUint) -> VmResult<BigUint>;

    /// Tier report of `account` from the tier contract `tier`
    fn tier_report(&self, tier: &BigUint, account: &BigUint) -> VmResult<BigUint>;
}

/// In-memory context with fixed answers
///
/// Unknown balances read as zero, matching token contracts. Unknown ERC721
/// owners and tier reports are errors, since the real calls revert.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "ContextDocument")]
pub struct StaticContext {
    block_number: BigUint,
    block_timestamp: BigUint,
    sender: BigUint,
    sale: FxHashMap<SaleField, BigUint>,
    erc20_balances: FxHashMap<(BigUint, BigUint), BigUint>,
    erc20_supplies: FxHashMap<BigUint, BigUint>,
    erc721_owners: FxHashMap<(BigUint, BigUint), BigUint>,
    erc1155_balances: FxHashMap<(BigUint, BigUint, BigUint), BigUint>,
    tier_reports: FxHashMap<(BigUint, BigUint), BigUint>,
}

impl StaticContext {
    /// Create an empty context (everything zero)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set block number
    pub fn block_number(mut self, value: impl Into<BigUint>) -> Self {
        self.block_number = value.into();
        self
    }

    /// Set block timestamp
    pub fn block_timestamp(mut self, value: impl Into<BigUint>) -> Self {
        self.block_timestamp = value.into();
        self
    }

    /// Set the caller's address
    pub fn sender(mut self, value: impl Into<BigUint>) -> Self {
        self.sender = value.into();
        self
    }

    /// Set a sale field
    pub fn sale_field(mut self, field: SaleField, value: impl Into<BigUint>) -> Self {
        self.sale.insert(field, value.into());
        self
    }

    /// Set an ERC20 balance
    pub fn erc20_balance(
        mut self,
        token: impl Into<BigUint>,
        account: impl Into<BigUint>,
        amount: impl Into<BigUint>,
    ) -> Self {
        self.erc20_balances
            .insert((token.into(), account.into()), amount.into());
        self
    }

    /// Set an ERC20 total supply
    pub fn erc20_supply(mut self, token: impl Into<BigUint>, amount: impl Into<BigUint>) -> Self {
        self.erc20_supplies.insert(token.into(), amount.into());
        self
    }

    /// Set the owner of an ERC721 token id
    pub fn erc721_owner(
        mut self,
        token: impl Into<BigUint>,
        id: impl Into<BigUint>,
        owner: impl Into<BigUint>,
    ) -> Self {
        self.erc721_owners.insert((token.into(), id.into()), owner.into());
        self
    }

    /// Set an ERC1155 balance
    pub fn erc1155_balance(
        mut self,
        token: impl Into<BigUint>,
        account: impl Into<BigUint>,
        id: impl Into<BigUint>,
        amount: impl Into<BigUint>,
    ) -> Self {
        self.erc1155_balances
            .insert((token.into(), account.into(), id.into()), amount.into());
        self
    }

    /// Set the tier report of an account
    pub fn tier_report(
        mut self,
        tier: impl Into<BigUint>,
        account: impl Into<BigUint>,
        report: impl Into<BigUint>,
    ) -> Self {
        self.tier_reports.insert((tier.into(), account.into()), report.into());
        self
    }
}

impl Context for StaticContext {
    fn block_number(&self) -> BigUint {
        self.block_number.clone()
    }

    fn block_timestamp(&self) -> BigUint {
        self.block_timestamp.clone()
    }

    fn sender(&self) -> BigUint {
        self.sender.clone()
    }

    fn sale(&self, field: SaleField) -> BigUint {
        self.sale.get(&field).cloned().unwrap_or_default()
    }

    fn erc20_balance_of(&self, token: &BigUint, account: &BigUint) -> VmResult<BigUint> {
        Ok(self
            .erc20_balances
            .get(&(token.clone(), account.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn erc20_total_supply(&self, token: &BigUint) -> VmResult<BigUint> {
        Ok(self.erc20_supplies.get(token).cloned().unwrap_or_default())
    }

    fn erc721_balance_of(&self, token: &BigUint, owner: &BigUint) -> VmResult<BigUint> {
        let held = self
            .erc721_owners
            .iter()
            .filter(|((t, _), o)| t == token && *o == owner)
            .count();
        Ok(BigUint::from(held))
    }

    fn erc721_owner_of(&self, token: &BigUint, id: &BigUint) -> VmResult<BigUint> {
        self.erc721_owners
            .get(&(token.clone(), id.clone()))
            .cloned()
            .ok_or_else(|| VmError::MissingContext(format!("ERC721 {token:#x} has no token {id}")))
    }

    fn erc1155_balance_of(&self, token: &BigUint, account: &BigUint, id: &BigUint) -> VmResult<BigUint> {
        Ok(self
            .erc1155_balances
            .get(&(token.clone(), account.clone(), id.clone()))
            .cloned()
            .unwrap_or_default())
    }

    fn tier_report(&self, tier: &BigUint, account: &BigUint) -> VmResult<BigUint> {
        self.tier_reports
            .get(&(tier.clone(), account.clone()))
            .cloned()
            .ok_or_else(|| {
                VmError::MissingContext(format!("tier {tier:#x} has no report for {account:#x}"))
            })
    }
}

/// On-disk form of [`StaticContext`]
///
/// ```toml
/// block_number = 100
/// block_timestamp = 1700000001
/// sender = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
///
/// [sale]
/// current_buy_units = 5
/// token_address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
///
/// [[erc20]]
/// token = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
/// account = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
/// amount = 4
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContextDocument {
    #[serde(with = "uint")]
    block_number: BigUint,
    #[serde(with = "uint")]
    block_timestamp: BigUint,
    #[serde(with = "uint")]
    sender: BigUint,
    sale: SaleDocument,
    erc20: Vec<Erc20Entry>,
    erc20_supply: Vec<SupplyEntry>,
    erc721: Vec<Erc721Entry>,
    erc1155: Vec<Erc1155Entry>,
    tier_reports: Vec<ReportEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SaleDocument {
    #[serde(with = "uint")]
    remaining_units: BigUint,
    #[serde(with = "uint")]
    total_reserve_in: BigUint,
    #[serde(with = "uint")]
    last_buy_block: BigUint,
    #[serde(with = "uint")]
    last_buy_units: BigUint,
    #[serde(with = "uint")]
    last_buy_price: BigUint,
    #[serde(with = "uint")]
    current_buy_units: BigUint,
    #[serde(with = "uint")]
    token_address: BigUint,
    #[serde(with = "uint")]
    reserve_address: BigUint,
}

#[derive(Debug, Deserialize)]
struct Erc20Entry {
    #[serde(with = "uint")]
    token: BigUint,
    #[serde(with = "uint")]
    account: BigUint,
    #[serde(with = "uint")]
    amount: BigUint,
}

#[derive(Debug, Deserialize)]
struct SupplyEntry {
    #[serde(with = "uint")]
    token: BigUint,
    #[serde(with = "uint")]
    amount: BigUint,
}

#[derive(Debug, Deserialize)]
struct Erc721Entry {
    #[serde(with = "uint")]
    token: BigUint,
    #[serde(with = "uint")]
    id: BigUint,
    #[serde(with = "uint")]
    owner: BigUint,
}

#[derive(Debug, Deserialize)]
struct Erc1155Entry {
    #[serde(with = "uint")]
    token: BigUint,
    #[serde(with = "uint")]
    account: BigUint,
    #[serde(with = "uint")]
    id: BigUint,
    #[serde(with = "uint")]
    amount: BigUint,
}

#[derive(Debug, Deserialize)]
struct ReportEntry {
    #[serde(with = "uint")]
    tier: BigUint,
    #[serde(with = "uint")]
    account: BigUint,
    #[serde(with = "uint")]
    report: BigUint,
}

impl From<ContextDocument> for StaticContext {
    fn from(doc: ContextDocument) -> Self {
        let sale = doc.sale;
        let mut ctx = StaticContext::new()
            .block_number(doc.block_number)
            .block_timestamp(doc.block_timestamp)
            .sender(doc.sender)
            .sale_field(SaleField::RemainingUnits, sale.remaining_units)
            .sale_field(SaleField::TotalReserveIn, sale.total_reserve_in)
            .sale_field(SaleField::LastBuyBlock, sale.last_buy_block)
            .sale_field(SaleField::LastBuyUnits, sale.last_buy_units)
            .sale_field(SaleField::LastBuyPrice, sale.last_buy_price)
            .sale_field(SaleField::CurrentBuyUnits, sale.current_buy_units)
            .sale_field(SaleField::TokenAddress, sale.token_address)
            .sale_field(SaleField::ReserveAddress, sale.reserve_address);

        for e in doc.erc20 {
            ctx = ctx.erc20_balance(e.token, e.account, e.amount);
        }
        for e in doc.erc20_supply {
            ctx = ctx.erc20_supply(e.token, e.amount);
        }
        for e in doc.erc721 {
            ctx = ctx.erc721_owner(e.token, e.id, e.owner);
        }
        for e in doc.erc1155 {
            ctx = ctx.erc1155_balance(e.token, e.account, e.id, e.amount);
        }
        for e in doc.tier_reports {
            ctx = ctx.tier_report(e.tier, e.account, e.report);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_balances_are_zero() {
        let ctx = StaticContext::new();
        let zero = BigUint::default();
        assert_eq!(ctx.erc20_balance_of(&zero, &zero).unwrap(), zero);
        assert_eq!(ctx.sale(SaleField::CurrentBuyUnits), zero);
    }

    #[test]
    fn test_unknown_owner_is_an_error() {
        let ctx = StaticContext::new();
        let token = BigUint::from(7u32);
        assert!(matches!(
            ctx.erc721_owner_of(&token, &BigUint::from(1u32)),
            Err(VmError::MissingContext(_))
        ));
    }

    #[test]
    fn test_erc721_balance_counts_tokens() {
        let ctx = StaticContext::new()
            .erc721_owner(1u32, 10u32, 5u32)
            .erc721_owner(1u32, 11u32, 5u32)
            .erc721_owner(2u32, 10u32, 5u32);
        let balance = ctx
            .erc721_balance_of(&BigUint::from(1u32), &BigUint::from(5u32))
            .unwrap();
        assert_eq!(balance, BigUint::from(2u32));
    }

    #[test]
    fn test_sale_field_from_opcode() {
        assert_eq!(
            SaleField::from_opcode(Opcode::CurrentBuyUnits),
            Some(SaleField::CurrentBuyUnits)
        );
        assert_eq!(SaleField::from_opcode(Opcode::Add), None);
    }
}
