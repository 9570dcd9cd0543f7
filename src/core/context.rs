//! Call Context
//!
//! Everything an operation may observe about the ledger it runs on.
//! Time is ledger time, never wall-clock time of any one party.

use serde::{Deserialize, Serialize};

use super::address::Address;

/// Amount of value (token units or native units).
pub type Amount = u128;

/// Unix timestamp in seconds, as exposed by the ledger.
pub type Timestamp = u64;

/// Context of a single ledger call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// Immediate caller of the operation.
    pub caller: Address,
    /// Ledger timestamp.
    pub timestamp: Timestamp,
    /// Ledger block height.
    pub block_height: u64,
    /// Native value attached to the call.
    pub value: Amount,
}

impl CallContext {
    /// Context for `caller` at the given ledger time, no value attached.
    pub fn new(caller: Address, timestamp: Timestamp, block_height: u64) -> Self {
        Self {
            caller,
            timestamp,
            block_height,
            value: 0,
        }
    }

    /// Attach native value.
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// Same ledger instant, different caller (used for contract-to-contract calls).
    pub fn as_caller(&self, caller: Address) -> Self {
        Self {
            caller,
            value: 0,
            ..*self
        }
    }
}
