//! Ledger Host
//!
//! In-process stand-in for the ledger the contracts run on. It owns every
//! deployed component, assigns ledger time and height, and applies
//! operations one at a time: each operation either completes in full or is
//! rolled back, so no partial effect is ever observable.
//!
//! ## Deployment
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  token    - MemoryToken (faucet-minted test asset)          │
//! │  wallet   - GameWallet over token                           │
//! │  registry - GameRegistry over wallet, ORGANISER on wallet   │
//! │  vault    - NativeVault with a minimum deposit              │
//! │  keeper   - interval-gated timeout sweeper for the registry │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::core::address::Address;
use crate::core::context::{Amount, CallContext, Timestamp};
use crate::escrow::access::Role;
use crate::escrow::token::{AssetTransfer, MemoryToken, TokenError};
use crate::escrow::vault::{NativeVault, VaultConfig};
use crate::escrow::wallet::GameWallet;
use crate::escrow::{EscrowError, EscrowLedger};
use crate::game::keeper::{Keeper, KeeperError};
use crate::game::moves::Move;
use crate::game::registry::{GameError, GameRegistry, RegistryState, Settlement, StartGame, DEFAULT_REVEAL_WINDOW};
use crate::game::state::{Game, GameId, GameStatus, Slot};
use crate::proof::public_inputs::MovePublicInputs;
use crate::proof::verify::{MoveProof, VerifierSet};

/// Registry deployed by the host.
pub type HostRegistry = GameRegistry<GameWallet<MemoryToken>>;

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

// =============================================================================
// CONFIG
// =============================================================================

/// Host settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Ledger time at genesis.
    pub genesis_timestamp: Timestamp,
    /// Account that deploys and administers everything.
    pub deployer: Address,
    /// Vault settings.
    pub vault: VaultConfig,
    /// Test tokens (and native units) minted per faucet call.
    pub faucet_amount: Amount,
    /// Keeper upkeep interval, seconds.
    pub keeper_interval: u64,
    /// Seconds players have to open their moves once a game is committed.
    pub reveal_window: Timestamp,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: 1_700_000_000,
            deployer: Address::derive(&Address::ZERO, "zk-rps/deployer"),
            vault: VaultConfig::default(),
            faucet_amount: 100 * 1_000_000_000_000_000_000,
            keeper_interval: 60,
            reveal_window: DEFAULT_REVEAL_WINDOW,
        }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Which escrow ledger an administrative operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    /// Token wallet (the registry's ledger).
    Wallet,
    /// Native vault.
    Vault,
}

/// A state-changing call, executed as `caller`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Mint test tokens and native units to the caller.
    Faucet,
    /// Approve the wallet to pull `amount` of the caller's tokens.
    ApproveWallet {
        #[serde(with = "crate::core::amount")]
        amount: Amount,
    },
    /// Deposit tokens into the wallet.
    WalletDeposit {
        #[serde(with = "crate::core::amount")]
        amount: Amount,
    },
    /// Attempt a wallet withdrawal (always rejected).
    WalletWithdraw,
    /// Deposit native value into the vault.
    VaultDeposit {
        #[serde(with = "crate::core::amount")]
        value: Amount,
    },
    /// Withdraw the caller's whole vault balance.
    VaultWithdraw,
    /// Grant a role on a ledger (admin only).
    GrantRole { ledger: LedgerKind, role: Role, account: Address },
    /// Revoke a role on a ledger (admin only).
    RevokeRole { ledger: LedgerKind, role: Role, account: Address },
    /// Give up one of the caller's roles.
    RenounceRole { ledger: LedgerKind, role: Role },
    /// Organiser transfer on a ledger: credit `to`, debit `from`.
    Transfer {
        ledger: LedgerKind,
        to: Address,
        from: Address,
        #[serde(with = "crate::core::amount")]
        amount: Amount,
    },
    /// Organiser slash on a ledger.
    Slash {
        ledger: LedgerKind,
        account: Address,
        #[serde(with = "crate::core::amount")]
        amount: Amount,
    },
    /// Start a game from a signed agreement.
    StartGame(StartGame),
    /// Submit a move commitment.
    SubmitMove { game_id: GameId, slot: Slot, proof: MoveProof, inputs: MovePublicInputs },
    /// Open a committed move.
    RevealMove {
        game_id: GameId,
        slot: Slot,
        player_move: Move,
        #[serde(with = "hex_salt")]
        salt: [u8; 32],
    },
    /// Settle a game.
    Finalize { game_id: GameId },
    /// Run keeper upkeep.
    PerformUpkeep,
}

impl Operation {
    /// Short name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Faucet => "faucet",
            Operation::ApproveWallet { .. } => "approve_wallet",
            Operation::WalletDeposit { .. } => "wallet_deposit",
            Operation::WalletWithdraw => "wallet_withdraw",
            Operation::VaultDeposit { .. } => "vault_deposit",
            Operation::VaultWithdraw => "vault_withdraw",
            Operation::GrantRole { .. } => "grant_role",
            Operation::RevokeRole { .. } => "revoke_role",
            Operation::RenounceRole { .. } => "renounce_role",
            Operation::Transfer { .. } => "transfer",
            Operation::Slash { .. } => "slash",
            Operation::StartGame(_) => "start_game",
            Operation::SubmitMove { .. } => "submit_move",
            Operation::RevealMove { .. } => "reveal_move",
            Operation::Finalize { .. } => "finalize",
            Operation::PerformUpkeep => "perform_upkeep",
        }
    }
}

/// Result of a successful operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "receipt", rename_all = "snake_case")]
pub enum Receipt {
    /// Nothing to report.
    Done,
    /// Escrow balance after a deposit.
    Deposited {
        #[serde(with = "crate::core::amount")]
        balance: Amount,
    },
    /// Amount paid back by the vault.
    Withdrawn {
        #[serde(with = "crate::core::amount")]
        amount: Amount,
    },
    /// New game id.
    GameStarted { game_id: GameId },
    /// Status after a move.
    MoveAccepted { game_id: GameId, status: GameStatus },
    /// Move opened.
    MoveRevealed { game_id: GameId, slot: Slot },
    /// Settlement details.
    Finalized(Settlement),
    /// Games settled by upkeep.
    Upkeep { settled: Vec<GameId> },
}

/// Host errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// Escrow rejection.
    #[error(transparent)]
    Escrow(#[from] EscrowError),
    /// Token rejection.
    #[error(transparent)]
    Token(#[from] TokenError),
    /// Registry rejection.
    #[error(transparent)]
    Game(#[from] GameError),
    /// Keeper rejection.
    #[error(transparent)]
    Keeper(#[from] KeeperError),
    /// Native balance too low for the attached value.
    #[error("insufficient native balance: {available} < {requested}")]
    InsufficientNative {
        /// Caller's native balance.
        available: Amount,
        /// Value attached.
        requested: Amount,
    },
    /// Ledger time may not move backwards.
    #[error("clock cannot move back from {current} to {requested}")]
    ClockRegression {
        /// Current ledger time.
        current: Timestamp,
        /// Requested time.
        requested: Timestamp,
    },
    /// Snapshot encode/decode failure.
    #[error("snapshot: {0}")]
    Snapshot(String),
}

impl HostError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Escrow(e) => e.code(),
            Self::Token(_) => "TOKEN_ERROR",
            Self::Game(e) => e.code(),
            Self::Keeper(e) => e.code(),
            Self::InsufficientNative { .. } => "INSUFFICIENT_NATIVE",
            Self::ClockRegression { .. } => "CLOCK_REGRESSION",
            Self::Snapshot(_) => "SNAPSHOT_ERROR",
        }
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete persisted ledger state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Format version.
    pub version: u8,
    /// Host settings.
    pub config: HostConfig,
    /// Ledger time.
    pub timestamp: Timestamp,
    /// Ledger height.
    pub block_height: u64,
    /// Component addresses.
    pub addresses: Deployment,
    /// Wallet (including the token it custodies).
    pub wallet: GameWallet<MemoryToken>,
    /// Vault.
    pub vault: NativeVault,
    /// Registry data.
    pub registry: RegistryState,
    /// Keeper.
    pub keeper: Keeper,
    /// Native balances outside the vault.
    pub native: BTreeMap<Address, Amount>,
}

impl LedgerSnapshot {
    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, HostError> {
        bincode::serialize(self).map_err(|e| HostError::Snapshot(e.to_string()))
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, HostError> {
        let snapshot: Self = bincode::deserialize(data).map_err(|e| HostError::Snapshot(e.to_string()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(HostError::Snapshot(format!("unsupported version {}", snapshot.version)));
        }
        Ok(snapshot)
    }
}

/// Where each component lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    /// Test token.
    pub token: Address,
    /// Token wallet.
    pub wallet: Address,
    /// Game registry.
    pub registry: Address,
    /// Native vault.
    pub vault: Address,
    /// Keeper.
    pub keeper: Address,
}

impl Deployment {
    /// Is `account` one of the deployed components?
    pub fn contains(&self, account: &Address) -> bool {
        [self.token, self.wallet, self.registry, self.vault, self.keeper].contains(account)
    }

    fn derive(deployer: &Address) -> Self {
        Self {
            token: Address::derive(deployer, "token"),
            wallet: Address::derive(deployer, "wallet"),
            registry: Address::derive(deployer, "registry"),
            vault: Address::derive(deployer, "vault"),
            keeper: Address::derive(deployer, "keeper"),
        }
    }
}

// =============================================================================
// HOST
// =============================================================================

#[derive(Clone)]
struct World {
    registry: HostRegistry,
    vault: NativeVault,
    keeper: Keeper,
    native: BTreeMap<Address, Amount>,
}

/// The in-process ledger.
pub struct LedgerHost {
    config: HostConfig,
    addresses: Deployment,
    timestamp: Timestamp,
    block_height: u64,
    world: World,
}

impl LedgerHost {
    /// Genesis: deploy token, wallet, registry (granted ORGANISER), vault, keeper.
    pub fn new(config: HostConfig, verifiers: VerifierSet) -> Result<Self, HostError> {
        let deployer = config.deployer;
        let addresses = Deployment::derive(&deployer);
        let genesis = CallContext::new(deployer, config.genesis_timestamp, 0);

        let token = MemoryToken::new("RPS");
        let mut wallet = GameWallet::new(addresses.wallet, deployer, token);
        wallet.grant_role(&genesis, Role::Organiser, addresses.registry)?;

        let registry = GameRegistry::new(addresses.registry, wallet, verifiers).with_reveal_window(config.reveal_window);
        let vault = NativeVault::new(addresses.vault, deployer, config.vault);
        let keeper = Keeper::new(addresses.keeper, config.keeper_interval, config.genesis_timestamp);

        info!("Ledger host genesis at {} (deployer {})", config.genesis_timestamp, deployer);
        Ok(Self {
            timestamp: config.genesis_timestamp,
            block_height: 0,
            addresses,
            config,
            world: World { registry, vault, keeper, native: BTreeMap::new() },
        })
    }

    /// Restore from a snapshot. Verifiers are not persisted and must be supplied.
    pub fn from_snapshot(snapshot: LedgerSnapshot, verifiers: VerifierSet) -> Self {
        let registry = GameRegistry::from_state(
            snapshot.addresses.registry,
            snapshot.wallet,
            verifiers,
            snapshot.registry,
        )
        .with_reveal_window(snapshot.config.reveal_window);
        info!("Ledger host restored at height {}", snapshot.block_height);
        Self {
            config: snapshot.config,
            addresses: snapshot.addresses,
            timestamp: snapshot.timestamp,
            block_height: snapshot.block_height,
            world: World {
                registry,
                vault: snapshot.vault,
                keeper: snapshot.keeper,
                native: snapshot.native,
            },
        }
    }

    /// Export full state.
    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            config: self.config.clone(),
            timestamp: self.timestamp,
            block_height: self.block_height,
            addresses: self.addresses,
            wallet: self.world.registry.ledger().clone(),
            vault: self.world.vault.clone(),
            registry: self.world.registry.state().clone(),
            keeper: self.world.keeper.clone(),
            native: self.world.native.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Clock
    // -------------------------------------------------------------------------

    /// Current ledger time.
    pub fn now(&self) -> Timestamp {
        self.timestamp
    }

    /// Current ledger height.
    pub fn block_height(&self) -> u64 {
        self.block_height
    }

    /// Move ledger time forward by `secs`.
    pub fn advance_time(&mut self, secs: u64) {
        self.timestamp = self.timestamp.saturating_add(secs);
    }

    /// Set ledger time. It never moves backwards.
    pub fn set_time(&mut self, timestamp: Timestamp) -> Result<(), HostError> {
        if timestamp < self.timestamp {
            return Err(HostError::ClockRegression { current: self.timestamp, requested: timestamp });
        }
        self.timestamp = timestamp;
        Ok(())
    }

    /// Catch ledger time up with an external clock. Earlier readings are ignored.
    pub fn sync_time(&mut self, now: Timestamp) -> bool {
        if now > self.timestamp {
            self.timestamp = now;
            true
        } else {
            false
        }
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    /// Apply `op` as `caller`. On error every component is restored.
    #[instrument(skip(self, op), fields(op = op.name(), caller = %caller))]
    pub fn execute(&mut self, caller: Address, op: Operation) -> Result<Receipt, HostError> {
        let ctx = CallContext::new(caller, self.timestamp, self.block_height + 1);
        let checkpoint = self.world.clone();

        #[cfg(feature = "debug-tracing")]
        debug!(?op, "Applying at height {}", ctx.block_height);

        match self.apply(&ctx, op) {
            Ok(receipt) => {
                self.block_height += 1;
                debug!("Block {} applied", self.block_height);
                Ok(receipt)
            }
            Err(e) => {
                self.world = checkpoint;
                debug!(code = e.code(), "Operation rolled back: {}", e);
                Err(e)
            }
        }
    }

    fn apply(&mut self, ctx: &CallContext, op: Operation) -> Result<Receipt, HostError> {
        let wallet_addr = self.addresses.wallet;
        let world = &mut self.world;

        match op {
            Operation::Faucet => {
                let amount = self.config.faucet_amount;
                world.registry.ledger_mut().token_mut().mint(&ctx.caller, amount)?;
                let native = world.native.entry(ctx.caller).or_insert(0);
                *native = native.checked_add(amount).ok_or(EscrowError::Overflow)?;
                info!("Faucet minted {} to {}", amount, ctx.caller);
                Ok(Receipt::Done)
            }
            Operation::ApproveWallet { amount } => {
                world.registry.ledger_mut().token_mut().approve(&ctx.caller, &wallet_addr, amount);
                Ok(Receipt::Done)
            }
            Operation::WalletDeposit { amount } => {
                let wallet = world.registry.ledger_mut();
                wallet.deposit(ctx, amount)?;
                Ok(Receipt::Deposited { balance: wallet.deposits(&ctx.caller) })
            }
            Operation::WalletWithdraw => {
                let amount = world.registry.ledger_mut().withdraw(ctx)?;
                Ok(Receipt::Withdrawn { amount })
            }
            Operation::VaultDeposit { value } => {
                let available = world.native.get(&ctx.caller).copied().unwrap_or(0);
                if available < value {
                    return Err(HostError::InsufficientNative { available, requested: value });
                }
                world.vault.deposit(&ctx.with_value(value))?;
                world.native.insert(ctx.caller, available - value);
                Ok(Receipt::Deposited { balance: world.vault.deposits(&ctx.caller) })
            }
            Operation::VaultWithdraw => {
                let amount = world.vault.withdraw(ctx)?;
                let native = world.native.entry(ctx.caller).or_insert(0);
                *native = native.checked_add(amount).ok_or(EscrowError::Overflow)?;
                Ok(Receipt::Withdrawn { amount })
            }
            Operation::GrantRole { ledger, role, account } => {
                match ledger {
                    LedgerKind::Wallet => world.registry.ledger_mut().grant_role(ctx, role, account)?,
                    LedgerKind::Vault => world.vault.grant_role(ctx, role, account)?,
                }
                Ok(Receipt::Done)
            }
            Operation::RevokeRole { ledger, role, account } => {
                match ledger {
                    LedgerKind::Wallet => world.registry.ledger_mut().revoke_role(ctx, role, account)?,
                    LedgerKind::Vault => world.vault.revoke_role(ctx, role, account)?,
                }
                Ok(Receipt::Done)
            }
            Operation::RenounceRole { ledger, role } => {
                match ledger {
                    LedgerKind::Wallet => world.registry.ledger_mut().renounce_role(ctx, role),
                    LedgerKind::Vault => world.vault.renounce_role(ctx, role),
                }
                Ok(Receipt::Done)
            }
            Operation::Transfer { ledger, to, from, amount } => {
                match ledger {
                    LedgerKind::Wallet => world.registry.ledger_mut().transfer(ctx, to, from, amount)?,
                    LedgerKind::Vault => world.vault.transfer(ctx, to, from, amount)?,
                }
                Ok(Receipt::Done)
            }
            Operation::Slash { ledger, account, amount } => {
                match ledger {
                    LedgerKind::Wallet => world.registry.ledger_mut().slash(ctx, account, amount)?,
                    LedgerKind::Vault => world.vault.slash(ctx, account, amount)?,
                }
                Ok(Receipt::Done)
            }
            Operation::StartGame(request) => {
                let game_id = world.registry.start_game(ctx, &request)?;
                Ok(Receipt::GameStarted { game_id })
            }
            Operation::SubmitMove { game_id, slot, proof, inputs } => {
                let status = world.registry.submit_move(ctx, game_id, slot, &proof, &inputs)?;
                Ok(Receipt::MoveAccepted { game_id, status })
            }
            Operation::RevealMove { game_id, slot, player_move, salt } => {
                world.registry.reveal_move(ctx, game_id, slot, player_move, &salt)?;
                Ok(Receipt::MoveRevealed { game_id, slot })
            }
            Operation::Finalize { game_id } => {
                let settlement = world.registry.finalize(ctx, game_id)?;
                Ok(Receipt::Finalized(settlement))
            }
            Operation::PerformUpkeep => {
                let settled = world.keeper.perform_upkeep(ctx, &mut world.registry)?;
                Ok(Receipt::Upkeep { settled })
            }
        }
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Component addresses.
    pub fn addresses(&self) -> &Deployment {
        &self.addresses
    }

    /// Deployer / admin account.
    pub fn deployer(&self) -> Address {
        self.config.deployer
    }

    /// Registry.
    pub fn registry(&self) -> &HostRegistry {
        &self.world.registry
    }

    /// Vault.
    pub fn vault(&self) -> &NativeVault {
        &self.world.vault
    }

    /// Keeper.
    pub fn keeper(&self) -> &Keeper {
        &self.world.keeper
    }

    /// Game by id.
    pub fn game(&self, game_id: GameId) -> Option<&Game> {
        self.world.registry.get_game(game_id)
    }

    /// Wallet escrow balance.
    pub fn wallet_deposits(&self, account: &Address) -> Amount {
        self.world.registry.ledger().deposits(account)
    }

    /// Vault escrow balance.
    pub fn vault_deposits(&self, account: &Address) -> Amount {
        self.world.vault.deposits(account)
    }

    /// Test-token balance.
    pub fn token_balance(&self, account: &Address) -> Amount {
        self.world.registry.ledger().token().balance_of(account)
    }

    /// Native balance outside the vault.
    pub fn native_balance(&self, account: &Address) -> Amount {
        self.world.native.get(account).copied().unwrap_or(0)
    }

    /// Is keeper upkeep due now?
    pub fn upkeep_due(&self) -> bool {
        self.world.keeper.check_upkeep(self.timestamp)
    }
}

/// Salts travel as 0x-prefixed hex.
mod hex_salt {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(salt: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(salt)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(D::Error::custom)?;
        bytes.try_into().map_err(|_| D::Error::custom("salt must be 32 bytes"))
    }
}
