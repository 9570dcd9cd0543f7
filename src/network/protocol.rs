//! Protocol Messages
//!
//! Wire format for client-server communication over WebSocket.
//! All messages are JSON; binary frames carry the same UTF-8 JSON.
//! Amounts are decimal strings.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::context::{Amount, Timestamp};
use crate::game::events::GameEvent;
use crate::game::state::{Game, GameId, GameStatus};
use crate::host::{Operation, Receipt};

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Authenticate with the server.
    Auth(AuthRequest),

    /// Execute a ledger operation as the authenticated account.
    Execute {
        /// Echoed on the reply.
        #[serde(default)]
        request_id: Option<u64>,
        /// The operation.
        operation: Operation,
    },

    /// Look up a game.
    GetGame {
        /// Game id.
        game_id: GameId,
    },

    /// Number of games ever started.
    GetCounter,

    /// Balances of `account` (defaults to the session account).
    GetBalances {
        /// Account to inspect.
        #[serde(default)]
        account: Option<Address>,
    },

    /// Ids of games not yet finalized.
    GetOpenGames,

    /// Ledger clock and keeper state.
    GetLedgerStatus,

    /// Ping for latency measurement.
    Ping {
        /// Client timestamp, echoed back.
        timestamp: u64,
    },
}

/// Authentication request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// JWT whose `sub` is the caller address. With auth unconfigured, the
    /// address itself.
    pub token: String,
    /// Client version for compatibility check.
    #[serde(default)]
    pub client_version: String,
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Authentication result.
    AuthResult(AuthResult),

    /// Operation applied.
    Receipt {
        /// Request id from the `execute` message.
        request_id: Option<u64>,
        /// Ledger height the operation landed in.
        block_height: u64,
        /// What happened.
        receipt: Receipt,
    },

    /// Game lookup result.
    Game {
        /// Requested id.
        game_id: GameId,
        /// Derived status, if the game exists.
        status: Option<GameStatus>,
        /// Record, if the game exists.
        game: Option<Game>,
    },

    /// Game counter.
    Counter {
        /// Games ever started.
        counter: GameId,
    },

    /// Account balances.
    Balances(BalanceInfo),

    /// Non-finalized games.
    OpenGames {
        /// Their ids.
        game_ids: Vec<GameId>,
    },

    /// Ledger clock and keeper state.
    LedgerStatus(LedgerStatus),

    /// Registry events produced by the latest block.
    Events {
        /// New events, in order.
        events: Vec<GameEvent>,
    },

    /// Pong response.
    Pong {
        /// Echoed client timestamp.
        timestamp: u64,
        /// Server time (ms).
        server_time: u64,
    },

    /// Error message.
    Error(ServerError),

    /// Server is shutting down.
    Shutdown {
        /// Reason.
        reason: String,
    },
}

/// Authentication result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether auth succeeded.
    pub success: bool,
    /// Session account.
    pub address: Option<Address>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Server version.
    pub server_version: String,
}

/// Balances of one account across the deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceInfo {
    /// Account inspected.
    pub account: Address,
    /// Escrowed in the token wallet.
    #[serde(with = "crate::core::amount")]
    pub wallet: Amount,
    /// Escrowed in the native vault.
    #[serde(with = "crate::core::amount")]
    pub vault: Amount,
    /// Test tokens held outright.
    #[serde(with = "crate::core::amount")]
    pub token: Amount,
    /// Native units held outright.
    #[serde(with = "crate::core::amount")]
    pub native: Amount,
}

/// Ledger clock and keeper state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatus {
    /// Ledger time.
    pub timestamp: Timestamp,
    /// Ledger height.
    pub block_height: u64,
    /// Games ever started.
    pub counter: GameId,
    /// Would upkeep run now?
    pub upkeep_due: bool,
}

/// Error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    /// Error class.
    pub code: ErrorCode,
    /// Stable ledger reason code for `rejected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Request id, when the error answers an `execute`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Error without a ledger reason.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, reason: None, request_id: None, message: message.into() }
    }

    /// Ledger rejection carrying a stable reason code.
    pub fn rejected(request_id: Option<u64>, reason: &str, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Rejected,
            reason: Some(reason.to_string()),
            request_id,
            message: message.into(),
        }
    }
}

/// Error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Authentication failed.
    AuthFailed,
    /// Not authenticated.
    NotAuthenticated,
    /// Token expired.
    TokenExpired,
    /// Malformed message.
    InvalidInput,
    /// The ledger refused the operation.
    Rejected,
    /// Too many connections.
    ServerOverloaded,
    /// Internal server error.
    InternalError,
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl ClientMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Deserialize from a binary frame holding UTF-8 JSON.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl ServerMessage {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::registry::StartGame;
    use crate::proof::agreement::{AgreementSigner, GameAgreement};

    #[test]
    fn test_execute_wire_shape() {
        let json = r#"{"type":"execute","request_id":7,"operation":{"op":"wallet_deposit","amount":"100000000000000000000"}}"#;
        let msg = ClientMessage::from_json(json).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Execute {
                request_id: Some(7),
                operation: Operation::WalletDeposit { amount: 100_000_000_000_000_000_000 },
            }
        );
    }

    #[test]
    fn test_start_game_round_trip() {
        let signer = AgreementSigner::from_secret(&[0x42; 32]).unwrap();
        let p0 = signer.address();
        let terms = GameAgreement { principal0: p0, proxy0: p0, wager: 5 * 10u128.pow(19), valid_until: 1_700_000_100 };
        let msg = ClientMessage::Execute {
            request_id: None,
            operation: Operation::StartGame(StartGame {
                principal0: p0,
                proxy0: p0,
                principal1: Address::repeat(0x0b),
                wager: terms.wager,
                valid_until: terms.valid_until,
                signature: signer.sign(&terms).unwrap(),
            }),
        };

        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""op":"start_game""#));
        assert_eq!(ClientMessage::from_json(&json).unwrap(), msg);
        assert_eq!(ClientMessage::from_slice(json.as_bytes()).unwrap(), msg);
    }

    #[test]
    fn test_optional_fields_default() {
        let msg = ClientMessage::from_json(r#"{"type":"get_balances"}"#).unwrap();
        assert_eq!(msg, ClientMessage::GetBalances { account: None });

        let msg = ClientMessage::from_json(r#"{"type":"auth","token":"abc"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Auth(AuthRequest { ref token, .. }) if token == "abc"));
    }

    #[test]
    fn test_rejection_carries_reason() {
        let msg = ServerMessage::Error(ServerError::rejected(Some(3), "SLOT_OCCUPIED", "slot 0 already committed"));
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""code":"rejected""#));
        assert!(json.contains(r#""reason":"SLOT_OCCUPIED""#));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_balances_round_trip() {
        let msg = ServerMessage::Balances(BalanceInfo {
            account: Address::repeat(0x0a),
            wallet: u128::MAX,
            vault: 0,
            token: 10u128.pow(20),
            native: 1,
        });
        let json = msg.to_json().unwrap();
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(ClientMessage::from_json(r#"{"type":"matchmaking"}"#).is_err());
    }
}
