//! Game Logic Module
//!
//! Wagered Rock-Paper-Scissors over a proof-gated commit protocol.
//!
//! ## Module Structure
//!
//! - `moves`: Move codes and precedence
//! - `state`: Game records, slots, derived status
//! - `registry`: The game state machine (start, move, finalize)
//! - `events`: Transition log
//! - `keeper`: Interval-driven timeout sweeper

pub mod events;
pub mod keeper;
pub mod moves;
pub mod registry;
pub mod state;

// Re-export key types
pub use events::{GameEvent, GameEventData};
pub use keeper::{Keeper, KeeperError};
pub use moves::{resolve, Move, Outcome};
pub use registry::{GameError, GameRegistry, RegistryState, Settlement, StartGame};
pub use state::{CommittedMove, Game, GameId, GameStatus, Resolution, Slot};
