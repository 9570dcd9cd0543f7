//! Core deterministic primitives.
//!
//! Addresses, hashing and the ledger call context. Nothing here reads
//! system time or randomness.

pub mod address;
pub mod amount;
pub mod context;
pub mod hash;

// Re-export core types
pub use address::{Address, AddressError};
pub use context::{Amount, CallContext, Timestamp};
pub use hash::{keccak256, Hash32, PackedEncoder};
