//! Asset Transfer Capability
//!
//! The wallet custodies a fungible asset it does not implement. It only
//! needs `transfer_from` (pull with allowance) and `transfer` (push).
//! `MemoryToken` is an in-process implementation with the conventional
//! allowance model, used by the host and tests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::core::address::Address;
use crate::core::context::Amount;

/// Token errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Holder balance too low.
    #[error("transfer amount exceeds balance ({available} < {requested})")]
    InsufficientBalance {
        /// Balance of the payer.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },
    /// Spender allowance too low.
    #[error("insufficient allowance ({available} < {requested})")]
    InsufficientAllowance {
        /// Remaining allowance.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },
    /// Supply would overflow.
    #[error("supply overflow")]
    Overflow,
}

/// Fungible asset as seen by the escrow wallet.
pub trait AssetTransfer {
    /// Move `amount` from `from` to `to` using `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError>;

    /// Move `amount` owned by `from` to `to`.
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError>;

    /// Balance held by `owner`.
    fn balance_of(&self, owner: &Address) -> Amount;
}

/// In-memory fungible token.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemoryToken {
    /// Token symbol, for logs.
    pub symbol: String,
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl MemoryToken {
    /// Create an empty token.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Default::default()
        }
    }

    /// Create `amount` new units for `to`.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let supply = self.total_supply.checked_add(amount).ok_or(TokenError::Overflow)?;
        let balance = self.balance_of(to).checked_add(amount).ok_or(TokenError::Overflow)?;
        self.total_supply = supply;
        self.balances.insert(*to, balance);
        debug!("{} minted {} to {}", self.symbol, amount, to);
        Ok(())
    }

    /// Set `spender`'s allowance over `owner`'s balance.
    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((*owner, *spender), amount);
        debug!("{} approve {} -> {}: {}", self.symbol, owner, spender, amount);
    }

    /// Remaining allowance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Total units in existence.
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(TokenError::InsufficientBalance { available, requested: amount });
        }
        self.balances.insert(*from, available - amount);
        let credited = self.balance_of(to) + amount;
        self.balances.insert(*to, credited);
        Ok(())
    }
}

impl AssetTransfer for MemoryToken {
    fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let allowed = self.allowance(from, spender);
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance { available: allowed, requested: amount });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert((*from, *spender), allowed - amount);
        Ok(())
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.get(owner).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat(1);
    const BOB: Address = Address::repeat(2);
    const SPENDER: Address = Address::repeat(3);

    #[test]
    fn test_mint_and_transfer() {
        let mut token = MemoryToken::new("TST");
        token.mint(&ALICE, 100).unwrap();
        token.transfer(&ALICE, &BOB, 40).unwrap();

        assert_eq!(token.balance_of(&ALICE), 60);
        assert_eq!(token.balance_of(&BOB), 40);
        assert_eq!(token.total_supply(), 100);
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let mut token = MemoryToken::new("TST");
        token.mint(&ALICE, 100).unwrap();
        token.approve(&ALICE, &SPENDER, 50);

        token.transfer_from(&SPENDER, &ALICE, &BOB, 30).unwrap();
        assert_eq!(token.allowance(&ALICE, &SPENDER), 20);
        assert_eq!(token.balance_of(&BOB), 30);

        let result = token.transfer_from(&SPENDER, &ALICE, &BOB, 30);
        assert!(matches!(result, Err(TokenError::InsufficientAllowance { available: 20, .. })));
    }

    #[test]
    fn test_failed_transfer_leaves_state() {
        let mut token = MemoryToken::new("TST");
        token.mint(&ALICE, 10).unwrap();
        token.approve(&ALICE, &SPENDER, 100);

        let result = token.transfer_from(&SPENDER, &ALICE, &BOB, 11);
        assert!(matches!(result, Err(TokenError::InsufficientBalance { .. })));
        assert_eq!(token.balance_of(&ALICE), 10);
        assert_eq!(token.allowance(&ALICE, &SPENDER), 100);
    }

    #[test]
    fn test_mint_overflow() {
        let mut token = MemoryToken::new("TST");
        token.mint(&ALICE, Amount::MAX).unwrap();
        assert_eq!(token.mint(&BOB, 1), Err(TokenError::Overflow));
    }
}
