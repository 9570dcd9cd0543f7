//! Native-Currency Vault
//!
//! Custodies native value attached to deposit calls. Unlike the token
//! wallet, withdrawal is self-service: the caller's whole balance is
//! zeroed and paid back to them.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::core::address::Address;
use crate::core::context::{Amount, CallContext};
use crate::escrow::access::{AccessControl, Role};
use crate::escrow::{BalanceBook, EscrowError, EscrowEvent, EscrowLedger};

/// Vault configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Smallest value a single deposit may attach. May be zero
    /// (`RPS_VAULT_MIN_DEPOSIT=0`); an empty deposit is refused regardless.
    pub min_deposit: Amount,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            min_deposit: 1_000_000_000_000_000_000,
        }
    }
}

/// Native-value escrow vault.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NativeVault {
    address: Address,
    config: VaultConfig,
    access: AccessControl,
    book: BalanceBook,
    slashed_total: Amount,
    events: Vec<EscrowEvent>,
}

impl NativeVault {
    /// Deploy a vault. `deployer` becomes admin.
    pub fn new(address: Address, deployer: Address, config: VaultConfig) -> Self {
        info!("NativeVault deployed at {} (min deposit {})", address, config.min_deposit);
        Self {
            address,
            config,
            access: AccessControl::new(deployer),
            book: BalanceBook::default(),
            slashed_total: 0,
            events: Vec::new(),
        }
    }

    /// Vault address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Configured minimum deposit.
    pub fn min_deposit(&self) -> Amount {
        self.config.min_deposit
    }

    /// Credit the value attached to the call.
    #[instrument(skip(self), fields(caller = %ctx.caller, value = ctx.value))]
    pub fn deposit(&mut self, ctx: &CallContext) -> Result<(), EscrowError> {
        if ctx.value == 0 || ctx.value < self.config.min_deposit {
            return Err(EscrowError::DepositAmountIncorrect {
                minimum: self.config.min_deposit,
                got: ctx.value,
            });
        }
        self.book.credit(&ctx.caller, ctx.value)?;
        self.events.push(EscrowEvent::Deposited { account: ctx.caller, amount: ctx.value });
        info!("Vault deposit {} from {}", ctx.value, ctx.caller);
        Ok(())
    }

    /// Zero the caller's balance and return the amount to pay out.
    pub fn withdraw(&mut self, ctx: &CallContext) -> Result<Amount, EscrowError> {
        if self.book.get(&ctx.caller) == 0 {
            return Err(EscrowError::NothingToWithdraw);
        }
        let amount = self.book.drain(&ctx.caller);
        self.events.push(EscrowEvent::Withdrawn { account: ctx.caller, amount });
        info!("Vault withdrawal {} to {}", amount, ctx.caller);
        Ok(amount)
    }

    /// Grant a role. Caller must be admin.
    pub fn grant_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> Result<(), EscrowError> {
        self.access.grant_role(&ctx.caller, role, account)?;
        self.events.push(EscrowEvent::RoleGranted { role, account });
        Ok(())
    }

    /// Revoke a role. Caller must be admin.
    pub fn revoke_role(&mut self, ctx: &CallContext, role: Role, account: Address) -> Result<(), EscrowError> {
        self.access.revoke_role(&ctx.caller, role, &account)?;
        self.events.push(EscrowEvent::RoleRevoked { role, account });
        Ok(())
    }

    /// Caller gives up `role`.
    pub fn renounce_role(&mut self, ctx: &CallContext, role: Role) {
        self.access.renounce_role(&ctx.caller, role);
        self.events.push(EscrowEvent::RoleRevoked { role, account: ctx.caller });
    }

    /// Sum of all balances.
    pub fn total_custodied(&self) -> Amount {
        self.book.total()
    }

    /// Native value physically held (balances plus slashed value).
    pub fn held(&self) -> Amount {
        self.book.total() + self.slashed_total
    }

    /// Mutation log.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }
}

impl EscrowLedger for NativeVault {
    fn deposits(&self, account: &Address) -> Amount {
        self.book.get(account)
    }

    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.access.has_role(role, account)
    }

    fn transfer(&mut self, ctx: &CallContext, to: Address, from: Address, amount: Amount) -> Result<(), EscrowError> {
        self.access.require_role(Role::Organiser, &ctx.caller)?;
        self.book.shift(&from, &to, amount)?;
        self.events.push(EscrowEvent::Transferred { from, to, amount });
        info!("Vault transfer {} from {} to {}", amount, from, to);
        Ok(())
    }

    fn slash(&mut self, ctx: &CallContext, account: Address, amount: Amount) -> Result<(), EscrowError> {
        self.access.require_role(Role::Organiser, &ctx.caller)?;
        let slashed_total = self.slashed_total.checked_add(amount).ok_or(EscrowError::Overflow)?;
        self.book.debit(&account, amount)?;
        self.slashed_total = slashed_total;
        self.events.push(EscrowEvent::Slashed { account, amount });
        info!("Vault slashed {} from {}", amount, account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ETHER: Amount = 1_000_000_000_000_000_000;
    const DEPLOYER: Address = Address::repeat(0xd0);
    const USER: Address = Address::repeat(0x0a);
    const VAULT: Address = Address::repeat(0x99);

    fn vault() -> NativeVault {
        NativeVault::new(VAULT, DEPLOYER, VaultConfig { min_deposit: ETHER })
    }

    fn ctx(caller: Address, value: Amount) -> CallContext {
        CallContext::new(caller, 1_700_000_000, 1).with_value(value)
    }

    #[test]
    fn test_deposit_below_minimum_rejected() {
        let mut vault = vault();
        let result = vault.deposit(&ctx(USER, ETHER - 1));
        assert_eq!(
            result,
            Err(EscrowError::DepositAmountIncorrect { minimum: ETHER, got: ETHER - 1 })
        );
        assert_eq!(vault.deposits(&USER), 0);
    }

    #[test]
    fn test_deposit_then_withdraw_zeroes_balance() {
        let mut vault = vault();
        vault.deposit(&ctx(USER, ETHER)).unwrap();
        vault.deposit(&ctx(USER, 2 * ETHER)).unwrap();
        assert_eq!(vault.deposits(&USER), 3 * ETHER);

        let paid = vault.withdraw(&ctx(USER, 0)).unwrap();
        assert_eq!(paid, 3 * ETHER);
        assert_eq!(vault.deposits(&USER), 0);
        assert_eq!(vault.total_custodied(), 0);
    }

    #[test]
    fn test_withdraw_empty() {
        let mut vault = vault();
        assert_eq!(vault.withdraw(&ctx(USER, 0)), Err(EscrowError::NothingToWithdraw));
    }

    #[test]
    fn test_zero_minimum_still_rejects_empty_deposit() {
        let mut vault = NativeVault::new(VAULT, DEPLOYER, VaultConfig { min_deposit: 0 });
        assert!(matches!(vault.deposit(&ctx(USER, 0)), Err(EscrowError::DepositAmountIncorrect { .. })));
        vault.deposit(&ctx(USER, 1)).unwrap();
    }

    #[test]
    fn test_organiser_gate_on_vault() {
        let mut vault = vault();
        vault.deposit(&ctx(USER, ETHER)).unwrap();

        let result = vault.slash(&ctx(USER, 0), USER, 1);
        assert!(matches!(result, Err(EscrowError::Unauthorized { .. })));

        vault.grant_role(&ctx(DEPLOYER, 0), Role::Organiser, DEPLOYER).unwrap();
        vault.slash(&ctx(DEPLOYER, 0), USER, 1).unwrap();
        assert_eq!(vault.deposits(&USER), ETHER - 1);
        assert_eq!(vault.held(), ETHER);
    }
}
