//! Token Custody Wallet
//!
//! Holds each depositor's stake in a fungible asset. Stake deposited here
//! is locked collateral: it leaves only through organiser-mediated
//! `transfer`/`slash`, never through a self-service withdrawal.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::core::address::Address;
use crate::core::context::{Amount, CallContext};
use crate::escrow::access::{AccessControl, Role};
use crate::escrow::token::AssetTransfer;
use crate::escrow::{BalanceBook, EscrowError, EscrowEvent, EscrowLedger};

/// Token-backed escrow wallet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameWallet<T> {
    /// Address the wallet holds tokens under.
    address: Address,
    /// Custodied asset.
    token: T,
    /// Role grants.
    access: AccessControl,
    /// Per-account balances.
    book: BalanceBook,
    /// Units removed by `slash`, still held by the wallet.
    slashed_total: Amount,
    /// Mutation log.
    events: Vec<EscrowEvent>,
}

impl<T: AssetTransfer> GameWallet<T> {
    /// Deploy a wallet at `address` over `token`. `deployer` becomes admin.
    pub fn new(address: Address, deployer: Address, token: T) -> Self {
        info!("GameWallet deployed at {} by {}", address, deployer);
        Self {
            address,
            token,
            access: AccessControl::new(deployer),
            book: BalanceBook::default(),
            slashed_total: 0,
            events: Vec::new(),
        }
    }

    /// Wallet address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Underlying asset.
    pub fn token(&self) -> &T {
        &self.token
    }

    /// Underlying asset, mutable (minting and approvals happen on the token).
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    /// Pull `amount` from the caller into their escrow account.
    ///
    /// The caller must have approved the wallet for at least `amount`.
    #[instrument(skip(self), fields(caller = %ctx.caller))]
    pub fn deposit(&mut self, ctx: &CallContext, amount: Amount) -> Result<(), EscrowError> {
        if amount == 0 {
            return Err(EscrowError::InvalidAmount);
        }
        self.book.total().checked_add(amount).ok_or(EscrowError::Overflow)?;

        self.token.transfer_from(&self.address, &ctx.caller, &self.address, amount)?;
        self.book.credit(&ctx.caller, amount)?;

        self.events.push(EscrowEvent::Deposited { account: ctx.caller, amount });
        info!("Deposit {} from {} (balance {})", amount, ctx.caller, self.book.get(&ctx.caller));
        Ok(())
    }

    /// Always rejected: funds leave only through settlement.
    pub fn withdraw(&mut self, ctx: &CallContext) -> Result<Amount, EscrowError> {
        debug!("Withdraw attempt by {} rejected", ctx.caller);
        Err(EscrowError::NotPossible)
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

    /// Sum of all escrow balances.
    pub fn total_custodied(&self) -> Amount {
        self.book.total()
    }

    /// Units slashed so far.
    pub fn slashed_total(&self) -> Amount {
        self.slashed_total
    }

    /// Mutation log.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }
}

impl<T: AssetTransfer> EscrowLedger for GameWallet<T> {
    fn deposits(&self, account: &Address) -> Amount {
        self.book.get(account)
    }

    fn has_role(&self, role: Role, account: &Address) -> bool {
        self.access.has_role(role, account)
    }

    #[instrument(skip(self), fields(caller = %ctx.caller))]
    fn transfer(&mut self, ctx: &CallContext, to: Address, from: Address, amount: Amount) -> Result<(), EscrowError> {
        self.access.require_role(Role::Organiser, &ctx.caller)?;
        self.book.shift(&from, &to, amount)?;

        #[cfg(feature = "debug-tracing")]
        debug!("after transfer: {} holds {}, {} holds {}", from, self.book.get(&from), to, self.book.get(&to));

        self.events.push(EscrowEvent::Transferred { from, to, amount });
        info!("Transfer {} from {} to {}", amount, from, to);
        Ok(())
    }

    #[instrument(skip(self), fields(caller = %ctx.caller))]
    fn slash(&mut self, ctx: &CallContext, account: Address, amount: Amount) -> Result<(), EscrowError> {
        self.access.require_role(Role::Organiser, &ctx.caller)?;
        let slashed_total = self.slashed_total.checked_add(amount).ok_or(EscrowError::Overflow)?;
        self.book.debit(&account, amount)?;
        self.slashed_total = slashed_total;

        self.events.push(EscrowEvent::Slashed { account, amount });
        info!("Slashed {} from {}", amount, account);
        Ok(())
    }
}
