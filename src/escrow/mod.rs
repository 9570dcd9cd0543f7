//! Escrow Ledgers
//!
//! Custody of player stakes under role-based authorization.
//!
//! ## Variants
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    ESCROW                                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  access.rs  - Role registry (DEFAULT_ADMIN, ORGANISER)      │
//! │  token.rs   - Asset transfer capability + in-memory token   │
//! │  wallet.rs  - Token custody, withdraw always rejected       │
//! │  vault.rs   - Native custody, minimum deposit, withdraw all │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both variants implement [`EscrowLedger`], the interface the game
//! registry settles wagers through.

pub mod access;
pub mod token;
pub mod vault;
pub mod wallet;

use thiserror::Error;

use crate::core::address::Address;
use crate::core::context::{Amount, CallContext};

pub use access::{AccessControl, Role};
pub use token::{AssetTransfer, MemoryToken, TokenError};
pub use vault::NativeVault;
pub use wallet::GameWallet;

/// Escrow errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EscrowError {
    /// Caller lacks the required role.
    #[error("account {account} is missing role {role}")]
    Unauthorized {
        /// Role required.
        role: Role,
        /// Offending caller.
        account: Address,
    },

    /// Debited account balance too low.
    #[error("insufficient balance for {account}: {available} < {requested}")]
    InsufficientBalance {
        /// Debited account.
        account: Address,
        /// Its balance.
        available: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Zero or otherwise unusable amount.
    #[error("amount must be greater than zero")]
    InvalidAmount,

    /// Wallet withdrawals are never possible.
    #[error("Not possible")]
    NotPossible,

    /// Vault deposit below the configured minimum.
    #[error("deposit amount incorrect: minimum {minimum}, got {got}")]
    DepositAmountIncorrect {
        /// Configured minimum.
        minimum: Amount,
        /// Attached value.
        got: Amount,
    },

    /// Vault withdrawal with nothing deposited.
    #[error("nothing to withdraw")]
    NothingToWithdraw,

    /// Balance arithmetic overflow.
    #[error("balance overflow")]
    Overflow,

    /// The underlying asset refused the movement.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

impl EscrowError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::NotPossible => "NOT_POSSIBLE",
            Self::DepositAmountIncorrect { .. } => "DEPOSIT_AMOUNT_INCORRECT",
            Self::NothingToWithdraw => "NOTHING_TO_WITHDRAW",
            Self::Overflow => "OVERFLOW",
            Self::Token(_) => "TOKEN_ERROR",
        }
    }
}

/// Escrow mutation record.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscrowEvent {
    /// Value entered an account.
    Deposited { account: Address, amount: Amount },
    /// Value left the ledger to its owner.
    Withdrawn { account: Address, amount: Amount },
    /// Organiser moved value between accounts.
    Transferred { from: Address, to: Address, amount: Amount },
    /// Organiser removed value from an account.
    Slashed { account: Address, amount: Amount },
    /// Role granted.
    RoleGranted { role: Role, account: Address },
    /// Role revoked or renounced.
    RoleRevoked { role: Role, account: Address },
}

/// What the game registry needs from an escrow ledger.
///
/// Privileged operations check `ORGANISER` on `ctx.caller` before touching
/// any balance. A failed call leaves every balance unchanged.
pub trait EscrowLedger {
    /// Escrowed balance of `account`.
    fn deposits(&self, account: &Address) -> Amount;

    /// Does `account` hold `role` on this ledger?
    fn has_role(&self, role: Role, account: &Address) -> bool;

    /// Credit `to` and debit `from` by `amount`. Organiser only.
    fn transfer(&mut self, ctx: &CallContext, to: Address, from: Address, amount: Amount) -> Result<(), EscrowError>;

    /// Remove `amount` from `account` without crediting any account. Organiser only.
    fn slash(&mut self, ctx: &CallContext, account: Address, amount: Amount) -> Result<(), EscrowError>;
}

/// Shared balance book used by both variants.
///
/// Keeps `total` equal to the sum of all balances.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct BalanceBook {
    balances: std::collections::BTreeMap<Address, Amount>,
    total: Amount,
}

impl BalanceBook {
    /// Balance of `account` (zero if never seen).
    pub fn get(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Sum of all balances.
    pub fn total(&self) -> Amount {
        self.total
    }

    /// Accounts with a recorded balance.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Add `amount` to `account`.
    pub fn credit(&mut self, account: &Address, amount: Amount) -> Result<(), EscrowError> {
        let total = self.total.checked_add(amount).ok_or(EscrowError::Overflow)?;
        let balance = self.get(account).checked_add(amount).ok_or(EscrowError::Overflow)?;
        self.balances.insert(*account, balance);
        self.total = total;
        Ok(())
    }

    /// Remove `amount` from `account`.
    pub fn debit(&mut self, account: &Address, amount: Amount) -> Result<(), EscrowError> {
        let available = self.get(account);
        if available < amount {
            return Err(EscrowError::InsufficientBalance {
                account: *account,
                available,
                requested: amount,
            });
        }
        self.balances.insert(*account, available - amount);
        self.total -= amount;
        Ok(())
    }

    /// Move `amount` from `from` to `to`, all or nothing.
    pub fn shift(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), EscrowError> {
        self.debit(from, amount)?;
        // A debit that succeeded can always be credited back within `total`.
        self.credit(to, amount)
    }

    /// Zero `account` and return what it held.
    pub fn drain(&mut self, account: &Address) -> Amount {
        let amount = self.balances.remove(account).unwrap_or(0);
        self.total -= amount;
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(EscrowError::NotPossible.code(), "NOT_POSSIBLE");
        assert_eq!(EscrowError::NotPossible.to_string(), "Not possible");
        assert_eq!(
            EscrowError::DepositAmountIncorrect { minimum: 2, got: 1 }.code(),
            "DEPOSIT_AMOUNT_INCORRECT"
        );
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let mut book = BalanceBook::default();
        let a = Address::repeat(1);
        book.credit(&a, 5).unwrap();

        let result = book.debit(&a, 6);
        assert!(matches!(result, Err(EscrowError::InsufficientBalance { available: 5, requested: 6, .. })));
        assert_eq!(book.get(&a), 5);
        assert_eq!(book.total(), 5);
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_of_balances(ops in proptest::collection::vec((0u8..4, 0u8..4, 0u64..1000), 1..64)) {
            let mut book = BalanceBook::default();
            for (i, (from, to, amount)) in ops.into_iter().enumerate() {
                let from = Address::repeat(from);
                let to = Address::repeat(to);
                let amount = amount as Amount;
                match i % 3 {
                    0 => { book.credit(&to, amount).unwrap(); }
                    1 => { let _ = book.shift(&from, &to, amount); }
                    _ => { let _ = book.debit(&from, amount); }
                }
                let sum: Amount = book.accounts().map(|(_, b)| *b).sum();
                prop_assert_eq!(sum, book.total());
            }
        }
    }
}
