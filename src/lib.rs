//! # ZK RPS Server
//!
//! Wagered Rock-Paper-Scissors whose fairness rests on cryptography instead
//! of a referee: moves stay hidden behind proof-backed commitments, games
//! start from one player's signed agreement, and stakes sit in role-gated
//! escrow until settlement.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ZK RPS SERVER                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                 │
//! │  ├── address.rs  - 20-byte account ids                      │
//! │  ├── amount.rs   - Amount wire encoding                     │
//! │  ├── context.rs  - Ledger call context                      │
//! │  └── hash.rs     - Keccak-256, packed encoding, SHA-256     │
//! │                                                             │
//! │  escrow/         - Stake custody                            │
//! │  ├── access.rs   - Role registry                            │
//! │  ├── token.rs    - Asset-transfer capability                │
//! │  ├── wallet.rs   - Token wallet (no withdrawals)            │
//! │  └── vault.rs    - Native-value vault                       │
//! │                                                             │
//! │  proof/          - Cryptographic gates                      │
//! │  ├── agreement.rs     - Signed start agreements             │
//! │  ├── commitment.rs    - Move commitments                    │
//! │  ├── public_inputs.rs - Verifier statements                 │
//! │  └── verify.rs        - Proof verifier capability           │
//! │                                                             │
//! │  game/           - Game state machine                       │
//! │  ├── moves.rs    - Precedence                               │
//! │  ├── state.rs    - Game records                             │
//! │  ├── registry.rs - start / submit / reveal / finalize       │
//! │  ├── events.rs   - Transition log                           │
//! │  └── keeper.rs   - Timeout sweeper                          │
//! │                                                             │
//! │  host.rs         - In-process ledger (atomic operations)    │
//! │  config.rs       - Environment configuration                │
//! │                                                             │
//! │  network/        - Networking (non-deterministic)           │
//! │  ├── auth.rs     - JWT validation                           │
//! │  ├── protocol.rs - Message types                            │
//! │  └── server.rs   - WebSocket server + keeper loop           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! `core/`, `escrow/`, `proof/`, `game/` and `host` never read system time
//! or randomness. Ledger time and height come from the host; only
//! `network/` consults the wall clock to advance it.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod escrow;
pub mod game;
pub mod host;
pub mod network;
pub mod proof;

// Re-export commonly used types
pub use crate::core::{Address, Amount, CallContext, Timestamp};
pub use escrow::{EscrowError, EscrowLedger, GameWallet, MemoryToken, NativeVault, Role};
pub use game::{Game, GameError, GameId, GameRegistry, GameStatus, Keeper, Move, Outcome, Slot};
pub use host::{HostConfig, HostError, LedgerHost, Operation, Receipt};
pub use proof::{AgreementSigner, GameAgreement, MoveOpening, VerifierSet};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
