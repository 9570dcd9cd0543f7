//! Node Configuration
//!
//! Environment-driven settings for the ledger host and the WebSocket front
//! end. `Default` carries the same values as an empty environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::core::context::{Amount, Timestamp};
use crate::escrow::vault::VaultConfig;
use crate::game::registry::DEFAULT_REVEAL_WINDOW;
use crate::host::HostConfig;
use crate::network::auth::AuthConfig;
use crate::network::server::ServerConfig;

const ETHER: Amount = 1_000_000_000_000_000_000;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Variable set but not parseable.
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },
}

/// Full node configuration.
#[derive(Clone, Debug)]
pub struct NodeConfig {
    /// WebSocket bind address (`RPS_BIND_ADDR`).
    pub bind_addr: SocketAddr,
    /// Connection cap (`RPS_MAX_CONNECTIONS`).
    pub max_connections: usize,
    /// Vault minimum deposit (`RPS_VAULT_MIN_DEPOSIT`).
    pub vault_min_deposit: Amount,
    /// Faucet mint per call (`RPS_FAUCET_AMOUNT`).
    pub faucet_amount: Amount,
    /// Keeper upkeep interval (`RPS_KEEPER_INTERVAL_SECS`).
    pub keeper_interval_secs: u64,
    /// Reveal window once a game is committed (`RPS_REVEAL_WINDOW_SECS`).
    pub reveal_window_secs: Timestamp,
    /// Bare-address auth when JWT is absent (`RPS_INSECURE_DEV_AUTH`).
    pub insecure_dev_auth: bool,
    /// JWT settings (`AUTH_*`).
    pub auth: AuthConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_connections: 1000,
            vault_min_deposit: ETHER,
            faucet_amount: 100 * ETHER,
            keeper_interval_secs: 60,
            reveal_window_secs: DEFAULT_REVEAL_WINDOW,
            insecure_dev_auth: false,
            auth: AuthConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|var| std::env::var(var).ok())?;
        config.auth = AuthConfig::from_env();
        Ok(config)
    }

    /// Create config from an arbitrary variable source. `AUTH_*` is not read here.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: parse_var(&lookup, "RPS_BIND_ADDR", defaults.bind_addr)?,
            max_connections: parse_var(&lookup, "RPS_MAX_CONNECTIONS", defaults.max_connections)?,
            vault_min_deposit: parse_var(&lookup, "RPS_VAULT_MIN_DEPOSIT", defaults.vault_min_deposit)?,
            faucet_amount: parse_var(&lookup, "RPS_FAUCET_AMOUNT", defaults.faucet_amount)?,
            keeper_interval_secs: parse_var(&lookup, "RPS_KEEPER_INTERVAL_SECS", defaults.keeper_interval_secs)?,
            reveal_window_secs: parse_var(&lookup, "RPS_REVEAL_WINDOW_SECS", defaults.reveal_window_secs)?,
            insecure_dev_auth: parse_flag(&lookup, "RPS_INSECURE_DEV_AUTH", defaults.insecure_dev_auth)?,
            auth: defaults.auth,
        })
    }

    /// Ledger host settings.
    pub fn host_config(&self) -> HostConfig {
        HostConfig {
            vault: VaultConfig { min_deposit: self.vault_min_deposit },
            faucet_amount: self.faucet_amount,
            keeper_interval: self.keeper_interval_secs,
            reveal_window: self.reveal_window_secs,
            ..HostConfig::default()
        }
    }

    /// WebSocket server settings.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind_addr,
            max_connections: self.max_connections,
            keeper_interval: Duration::from_secs(self.keeper_interval_secs.max(1)),
            auth: self.auth.clone(),
            insecure_dev_auth: self.insecure_dev_auth,
            ..ServerConfig::default()
        }
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(var) {
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { var, value }),
        },
        None => Ok(default),
    }
}
