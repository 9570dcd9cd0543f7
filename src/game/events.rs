//! Game Events
//!
//! Append-only log of registry transitions, for indexers and the wire.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::context::{Amount, Timestamp};
use crate::game::moves::Move;
use crate::game::state::{GameId, Resolution, Slot};
use crate::proof::commitment::MoveCommitment;

/// Event payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEventData {
    /// Agreement accepted and wagers locked.
    GameStarted {
        principals: [Address; 2],
        proxies: [Address; 2],
        #[serde(with = "crate::core::amount")]
        wager: Amount,
        valid_until: Timestamp,
    },

    /// A move was admitted.
    MoveCommitted {
        slot: Slot,
        proxy: Address,
        commitment: MoveCommitment,
    },

    /// Both moves in; reveals open.
    GameCommitted {
        reveal_deadline: Timestamp,
    },

    /// A commitment was opened.
    MoveRevealed {
        slot: Slot,
        player_move: Move,
    },

    /// Settled.
    GameFinalized {
        resolution: Resolution,
        #[serde(with = "crate::core::amount::pairs")]
        payouts: Vec<(Address, Amount)>,
    },
}

/// A registry event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Ledger time.
    pub at: Timestamp,

    /// Ledger height.
    pub block_height: u64,

    /// Game concerned.
    pub game_id: GameId,

    /// Payload.
    pub data: GameEventData,
}

impl GameEvent {
    /// Create an event.
    pub fn new(at: Timestamp, block_height: u64, game_id: GameId, data: GameEventData) -> Self {
        Self { at, block_height, game_id, data }
    }

    /// Short kind label, for logs.
    pub fn kind(&self) -> &'static str {
        match self.data {
            GameEventData::GameStarted { .. } => "game_started",
            GameEventData::MoveCommitted { .. } => "move_committed",
            GameEventData::GameCommitted { .. } => "game_committed",
            GameEventData::MoveRevealed { .. } => "move_revealed",
            GameEventData::GameFinalized { .. } => "game_finalized",
        }
    }
}
