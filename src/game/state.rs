//! Game State
//!
//! Game records held by the registry. A game is never deleted: once
//! `finalized_at` is set it stays as history.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::context::{Amount, Timestamp};
use crate::game::moves::{Move, Outcome};
use crate::proof::commitment::MoveCommitment;

/// Game identifier. Ids start at 1; 0 is never assigned.
pub type GameId = u64;

// =============================================================================
// SLOTS
// =============================================================================

/// One of the two player positions in a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// The player who signed the start agreement.
    Player0,
    /// The player who submitted it.
    Player1,
}

impl Slot {
    /// Both slots, in order.
    pub const BOTH: [Slot; 2] = [Slot::Player0, Slot::Player1];

    /// Array index.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Slot::Player0 => 0,
            Slot::Player1 => 1,
        }
    }

    /// Slot from index.
    pub fn from_index(index: u8) -> Option<Slot> {
        match index {
            0 => Some(Slot::Player0),
            1 => Some(Slot::Player1),
            _ => None,
        }
    }

    /// The opposing slot.
    #[inline]
    pub fn other(self) -> Slot {
        match self {
            Slot::Player0 => Slot::Player1,
            Slot::Player1 => Slot::Player0,
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.index())
    }
}

// =============================================================================
// MOVES ON RECORD
// =============================================================================

/// A move admitted by the verifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedMove {
    /// Published commitment.
    pub commitment: MoveCommitment,
    /// Ledger time of submission.
    pub committed_at: Timestamp,
    /// Opened move. `None` until the player reveals, which is only
    /// possible once both slots are committed.
    pub revealed: Option<Move>,
}

impl CommittedMove {
    /// Fresh commitment, not yet opened.
    pub fn sealed(commitment: MoveCommitment, committed_at: Timestamp) -> Self {
        Self { commitment, committed_at, revealed: None }
    }
}

/// How a game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Both moves opened; scored by precedence.
    Played(Outcome),
    /// Only `winner` committed before the agreement deadline, or only
    /// `winner` revealed before the reveal deadline.
    Forfeit {
        /// The slot that kept to the protocol.
        winner: Slot,
    },
    /// Nobody committed, or nobody revealed; wagers returned.
    Abandoned,
}

/// Derived lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// At least one commitment missing.
    Pending,
    /// Both commitments present, not yet settled. Moves are opened here.
    Committed,
    /// Settled. Terminal.
    Finalized,
}

// =============================================================================
// GAME
// =============================================================================

/// A single wagered game.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Game id.
    pub id: GameId,

    /// Economic principals funding and receiving the wager.
    pub player_addrs: [Address; 2],

    /// Addresses allowed to submit moves for each principal.
    pub player_proxy_addrs: [Address; 2],

    /// Per-player stake.
    #[serde(with = "crate::core::amount")]
    pub wager: Amount,

    /// Agreement deadline; also the move deadline for the timeout path.
    pub valid_until: Timestamp,

    /// Ledger time the game was started.
    pub started_at: Timestamp,

    /// Admitted moves by slot.
    pub move_commitments: [Option<CommittedMove>; 2],

    /// Last ledger time to reveal without forfeiting. 0 until both slots
    /// are committed.
    pub reveal_deadline: Timestamp,

    /// 0 while open; settlement time afterwards.
    pub finalized_at: Timestamp,

    /// Set together with `finalized_at`.
    pub resolution: Option<Resolution>,
}

impl Game {
    /// Lifecycle state.
    pub fn status(&self) -> GameStatus {
        if self.finalized_at != 0 {
            GameStatus::Finalized
        } else if self.move_commitments.iter().all(Option::is_some) {
            GameStatus::Committed
        } else {
            GameStatus::Pending
        }
    }

    /// Is the game settled?
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized_at != 0
    }

    /// Principal in `slot`.
    #[inline]
    pub fn principal(&self, slot: Slot) -> Address {
        self.player_addrs[slot.index()]
    }

    /// Proxy in `slot`.
    #[inline]
    pub fn proxy(&self, slot: Slot) -> Address {
        self.player_proxy_addrs[slot.index()]
    }

    /// Move on record for `slot`.
    #[inline]
    pub fn committed(&self, slot: Slot) -> Option<&CommittedMove> {
        self.move_commitments[slot.index()].as_ref()
    }

    /// Opened move for `slot`, if revealed.
    #[inline]
    pub fn revealed(&self, slot: Slot) -> Option<Move> {
        self.committed(slot).and_then(|m| m.revealed)
    }

    /// Deadline elapsed at `now`?
    #[inline]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.valid_until
    }

    /// Reveal deadline elapsed at `now`? Never true before both commit.
    #[inline]
    pub fn reveal_expired(&self, now: Timestamp) -> bool {
        self.reveal_deadline != 0 && now > self.reveal_deadline
    }

    /// Combined stake held for this game.
    pub fn pot(&self) -> Option<Amount> {
        self.wager.checked_mul(2)
    }
}
