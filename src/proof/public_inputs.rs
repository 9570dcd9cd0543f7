//! Proof Public Inputs
//!
//! Statements the move circuits prove, encoded as 32-byte big-endian words
//! (one word per field) for the verifiers.
//!
//! Word layout:
//!
//! ```text
//! 0 game_id | 1 slot | 2 committer | 3 commitment      <- init circuit
//! 4 prior_commitment                                   <- move circuits
//! ```
//!
//! No word carries the move itself. It stays behind the commitment until
//! both slots are filled and the players open them.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::hash::{u256_word, Hash32};

/// One public-input word.
pub type Word = [u8; 32];

/// Words in the init-circuit statement.
pub const INIT_INPUT_WORD_COUNT: usize = 4;

/// Words in the move-circuit statement.
pub const MOVE_INPUT_WORD_COUNT: usize = 5;

/// Which move circuit applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovePhase {
    /// First move in the game: no prior commitment.
    A,
    /// Second move: chained to the opponent's commitment.
    B,
}

/// Statement for the init circuit: the commitment is well formed for
/// this game, slot and committer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPublicInputs {
    /// Game the move belongs to.
    pub game_id: u64,
    /// Player slot.
    pub slot: u8,
    /// Address that submits the move.
    pub committer: Address,
    /// Commitment being proven.
    pub commitment: Hash32,
}

impl InitPublicInputs {
    /// Encode as words.
    pub fn to_words(&self) -> [Word; INIT_INPUT_WORD_COUNT] {
        [
            u256_word(self.game_id as u128),
            u256_word(self.slot as u128),
            address_word(&self.committer),
            self.commitment,
        ]
    }

    /// Decode from words.
    pub fn from_words(words: &[Word]) -> Option<Self> {
        if words.len() < INIT_INPUT_WORD_COUNT {
            return None;
        }
        Some(Self {
            game_id: word_to_u64(&words[0])?,
            slot: word_to_u8(&words[1])?,
            committer: word_to_address(&words[2])?,
            commitment: words[3],
        })
    }
}

/// Statement for the moveA/moveB circuits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePublicInputs {
    /// Game the move belongs to.
    pub game_id: u64,
    /// Player slot.
    pub slot: u8,
    /// Address that submits the move.
    pub committer: Address,
    /// New move commitment.
    pub commitment: Hash32,
    /// Opponent's stored commitment, or zero if they have not moved.
    pub prior_commitment: Hash32,
}

impl MovePublicInputs {
    /// Phase implied by the prior commitment.
    pub fn phase(&self) -> MovePhase {
        if self.prior_commitment == [0u8; 32] {
            MovePhase::A
        } else {
            MovePhase::B
        }
    }

    /// The init-circuit prefix of this statement.
    pub fn init_view(&self) -> InitPublicInputs {
        InitPublicInputs {
            game_id: self.game_id,
            slot: self.slot,
            committer: self.committer,
            commitment: self.commitment,
        }
    }

    /// Encode as words.
    pub fn to_words(&self) -> [Word; MOVE_INPUT_WORD_COUNT] {
        let init = self.init_view().to_words();
        [init[0], init[1], init[2], init[3], self.prior_commitment]
    }

    /// Decode from words.
    pub fn from_words(words: &[Word]) -> Option<Self> {
        if words.len() != MOVE_INPUT_WORD_COUNT {
            return None;
        }
        let init = InitPublicInputs::from_words(&words[..INIT_INPUT_WORD_COUNT])?;
        Some(Self {
            game_id: init.game_id,
            slot: init.slot,
            committer: init.committer,
            commitment: init.commitment,
            prior_commitment: words[4],
        })
    }

    /// Flat byte encoding (words concatenated).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_words().concat()
    }

    /// Parse the flat byte encoding.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() != MOVE_INPUT_WORD_COUNT * 32 {
            return None;
        }
        let words: Vec<Word> = data
            .chunks_exact(32)
            .map(|chunk| {
                let mut word = [0u8; 32];
                word.copy_from_slice(chunk);
                word
            })
            .collect();
        Self::from_words(&words)
    }
}

/// Address left-padded to a word.
pub fn address_word(address: &Address) -> Word {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn word_to_address(word: &Word) -> Option<Address> {
    if word[..12].iter().any(|b| *b != 0) {
        return None;
    }
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Some(Address::new(bytes))
}

fn word_to_u64(word: &Word) -> Option<u64> {
    if word[..24].iter().any(|b| *b != 0) {
        return None;
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Some(u64::from_be_bytes(bytes))
}

fn word_to_u8(word: &Word) -> Option<u8> {
    if word[..31].iter().any(|b| *b != 0) {
        return None;
    }
    Some(word[31])
}
