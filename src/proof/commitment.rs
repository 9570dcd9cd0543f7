//! Move Commitment Protocol
//!
//! A player commits to a move by publishing a hash of it, bound to the game,
//! the slot, and the committing address, blinded with a 32-byte salt.
//! The opening (move + salt) is what a prover uses as its private witness,
//! and what the player publishes once both commitments are on record.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::address::Address;
use crate::core::hash::Hash32;
use crate::game::moves::Move;
use crate::proof::public_inputs::{InitPublicInputs, MovePublicInputs};

/// Domain separator for move commitments.
pub const MOVE_COMMITMENT_DOMAIN: &[u8] = b"ZK_RPS_MOVE_V1";

/// Opaque move commitment as stored on a game.
pub type MoveCommitment = Hash32;

/// Secret opening of a move commitment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOpening {
    /// Game the move belongs to.
    pub game_id: u64,
    /// Player slot (0 or 1).
    pub slot: u8,
    /// Address submitting the move.
    pub committer: Address,
    /// The move.
    pub player_move: Move,
    /// Blinding salt.
    pub salt: [u8; 32],
}

impl MoveOpening {
    /// Create an opening.
    pub fn new(game_id: u64, slot: u8, committer: Address, player_move: Move, salt: [u8; 32]) -> Self {
        Self { game_id, slot, committer, player_move, salt }
    }

    /// Commitment this opening produces.
    pub fn commitment(&self) -> MoveCommitment {
        compute_move_commitment(self.game_id, self.slot, &self.committer, self.player_move, &self.salt)
    }

    /// Check the opening against a published commitment.
    pub fn opens(&self, commitment: &MoveCommitment) -> bool {
        self.commitment() == *commitment
    }

    /// Init-circuit statement for this move.
    pub fn init_inputs(&self) -> InitPublicInputs {
        InitPublicInputs {
            game_id: self.game_id,
            slot: self.slot,
            committer: self.committer,
            commitment: self.commitment(),
        }
    }

    /// Full statement. `prior` is the opponent's commitment when they moved first.
    pub fn public_inputs(&self, prior: Option<MoveCommitment>) -> MovePublicInputs {
        MovePublicInputs {
            game_id: self.game_id,
            slot: self.slot,
            committer: self.committer,
            commitment: self.commitment(),
            prior_commitment: prior.unwrap_or([0u8; 32]),
        }
    }
}

/// Compute `sha256(domain ‖ game_id ‖ slot ‖ committer ‖ move ‖ salt)`.
pub fn compute_move_commitment(
    game_id: u64,
    slot: u8,
    committer: &Address,
    player_move: Move,
    salt: &[u8; 32],
) -> MoveCommitment {
    let mut hasher = Sha256::new();
    hasher.update(MOVE_COMMITMENT_DOMAIN);
    hasher.update(game_id.to_be_bytes());
    hasher.update([slot]);
    hasher.update(committer.as_bytes());
    hasher.update([player_move.code()]);
    hasher.update(salt);
    hasher.finalize().into()
}
