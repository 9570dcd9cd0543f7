//! Network Layer
//!
//! WebSocket front end for the ledger host. This layer is
//! **non-deterministic**: it reads wall-clock time to advance the ledger
//! clock. All state changes run through `host::LedgerHost`.

pub mod auth;
pub mod protocol;
pub mod server;

pub use auth::{authenticate, validate_token, AuthConfig, AuthError, TokenClaims};
pub use protocol::{
    AuthRequest, AuthResult, BalanceInfo, ClientMessage, ErrorCode, LedgerStatus, ServerError, ServerMessage,
};
pub use server::{GameServer, GameServerError, ServerConfig};
