//! Moves and Precedence
//!
//! Rock beats Scissors, Scissors beats Paper, Paper beats Rock.
//! Identical moves draw.

use serde::{Deserialize, Serialize};

/// A Rock-Paper-Scissors move.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Move {
    /// Beats Scissors.
    Rock = 0,
    /// Beats Rock.
    Paper = 1,
    /// Beats Paper.
    Scissors = 2,
}

impl Move {
    /// All moves, in code order.
    pub const ALL: [Move; 3] = [Move::Rock, Move::Paper, Move::Scissors];

    /// Wire code (0-2).
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Move from wire code.
    pub fn from_code(code: u8) -> Option<Move> {
        match code {
            0 => Some(Move::Rock),
            1 => Some(Move::Paper),
            2 => Some(Move::Scissors),
            _ => None,
        }
    }

    /// The move this one defeats.
    #[inline]
    pub fn beats(self) -> Move {
        match self {
            Move::Rock => Move::Scissors,
            Move::Paper => Move::Rock,
            Move::Scissors => Move::Paper,
        }
    }
}

/// Result of a game, from the registry's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Player in slot 0 won.
    Player0Wins,
    /// Player in slot 1 won.
    Player1Wins,
    /// Same move.
    Draw,
}

impl Outcome {
    /// Winning slot index, if any.
    pub fn winner_index(self) -> Option<usize> {
        match self {
            Outcome::Player0Wins => Some(0),
            Outcome::Player1Wins => Some(1),
            Outcome::Draw => None,
        }
    }
}

/// Score two moves.
pub fn resolve(move0: Move, move1: Move) -> Outcome {
    if move0 == move1 {
        Outcome::Draw
    } else if move0.beats() == move1 {
        Outcome::Player0Wins
    } else {
        Outcome::Player1Wins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_precedence_table() {
        assert_eq!(resolve(Move::Rock, Move::Scissors), Outcome::Player0Wins);
        assert_eq!(resolve(Move::Scissors, Move::Paper), Outcome::Player0Wins);
        assert_eq!(resolve(Move::Paper, Move::Rock), Outcome::Player0Wins);

        assert_eq!(resolve(Move::Scissors, Move::Rock), Outcome::Player1Wins);
        assert_eq!(resolve(Move::Paper, Move::Scissors), Outcome::Player1Wins);
        assert_eq!(resolve(Move::Rock, Move::Paper), Outcome::Player1Wins);

        for m in Move::ALL {
            assert_eq!(resolve(m, m), Outcome::Draw);
        }
    }

    #[test]
    fn test_codes() {
        for m in Move::ALL {
            assert_eq!(Move::from_code(m.code()), Some(m));
        }
        assert_eq!(Move::from_code(3), None);
    }

    fn any_move() -> impl Strategy<Value = Move> {
        prop::sample::select(Move::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_resolve_is_antisymmetric(a in any_move(), b in any_move()) {
            let forward = resolve(a, b);
            let backward = resolve(b, a);
            let mirrored = match forward {
                Outcome::Player0Wins => Outcome::Player1Wins,
                Outcome::Player1Wins => Outcome::Player0Wins,
                Outcome::Draw => Outcome::Draw,
            };
            prop_assert_eq!(backward, mirrored);
        }
    }
}
