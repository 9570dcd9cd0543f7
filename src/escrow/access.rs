//! Role Registry
//!
//! Minimal role-based access control. `DEFAULT_ADMIN` administers every
//! role and is granted to the deployer at construction. `ORGANISER` gates
//! the privileged escrow operations (transfer, slash).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::address::Address;
use crate::core::hash::{keccak256, Hash32};
use crate::escrow::EscrowError;

/// Roles known to the escrow ledgers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Administers all roles.
    DefaultAdmin,
    /// May transfer and slash escrowed balances.
    Organiser,
}

impl Role {
    /// 32-byte role identifier, compatible with `keccak256("ORGANISER_ROLE")`
    /// style ids. The admin role id is all zeros.
    pub fn id(self) -> Hash32 {
        match self {
            Role::DefaultAdmin => [0u8; 32],
            Role::Organiser => keccak256(b"ORGANISER_ROLE"),
        }
    }

    /// Role that may grant and revoke this role.
    pub fn admin_role(self) -> Role {
        Role::DefaultAdmin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::DefaultAdmin => write!(f, "DEFAULT_ADMIN_ROLE"),
            Role::Organiser => write!(f, "ORGANISER_ROLE"),
        }
    }
}

/// (role, address) grants.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccessControl {
    grants: BTreeMap<Role, BTreeSet<Address>>,
}

impl AccessControl {
    /// Create a registry with `admin` holding `DEFAULT_ADMIN`.
    pub fn new(admin: Address) -> Self {
        let mut access = Self::default();
        access.insert(Role::DefaultAdmin, admin);
        access
    }

    /// Pure lookup.
    pub fn has_role(&self, role: Role, account: &Address) -> bool {
        self.grants
            .get(&role)
            .map(|members| members.contains(account))
            .unwrap_or(false)
    }

    /// Fail with `Unauthorized` unless `account` holds `role`.
    pub fn require_role(&self, role: Role, account: &Address) -> Result<(), EscrowError> {
        if self.has_role(role, account) {
            Ok(())
        } else {
            Err(EscrowError::Unauthorized { role, account: *account })
        }
    }

    /// Grant `role` to `account`. Caller must hold the role's admin role.
    pub fn grant_role(&mut self, caller: &Address, role: Role, account: Address) -> Result<(), EscrowError> {
        self.require_role(role.admin_role(), caller)?;
        if self.insert(role, account) {
            info!("Role {} granted to {} by {}", role, account, caller);
        }
        Ok(())
    }

    /// Revoke `role` from `account`. Caller must hold the role's admin role.
    pub fn revoke_role(&mut self, caller: &Address, role: Role, account: &Address) -> Result<(), EscrowError> {
        self.require_role(role.admin_role(), caller)?;
        if self.remove(role, account) {
            info!("Role {} revoked from {} by {}", role, account, caller);
        }
        Ok(())
    }

    /// Give up a role the caller holds.
    pub fn renounce_role(&mut self, caller: &Address, role: Role) {
        if self.remove(role, caller) {
            info!("Role {} renounced by {}", role, caller);
        }
    }

    /// Members of a role, in address order.
    pub fn members(&self, role: Role) -> Vec<Address> {
        self.grants
            .get(&role)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    fn insert(&mut self, role: Role, account: Address) -> bool {
        self.grants.entry(role).or_default().insert(account)
    }

    fn remove(&mut self, role: Role, account: &Address) -> bool {
        self.grants
            .get_mut(&role)
            .map(|members| members.remove(account))
            .unwrap_or(false)
    }
}
