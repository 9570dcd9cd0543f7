//! Upkeep Keeper
//!
//! Interval-gated sweeper for the timeout path. The registry never expires
//! games on its own; the keeper finalizes every game stuck past a deadline
//! (pending past the agreement deadline, or committed past the reveal
//! deadline), at most once per interval.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::address::Address;
use crate::core::context::{CallContext, Timestamp};
use crate::escrow::EscrowLedger;
use crate::game::registry::GameRegistry;
use crate::game::state::GameId;

/// Keeper errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeeperError {
    /// Upkeep attempted before the interval elapsed.
    #[error("Time interval not met")]
    IntervalNotMet {
        /// Seconds until upkeep is due.
        remaining: u64,
    },
}

impl KeeperError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IntervalNotMet { .. } => "INTERVAL_NOT_MET",
        }
    }
}

/// Interval-driven upkeep state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keeper {
    /// Address the keeper calls `finalize` as.
    address: Address,
    /// Minimum seconds between upkeeps.
    interval: u64,
    /// Ledger time of the last upkeep (or deployment).
    last_timestamp: Timestamp,
    /// Number of upkeeps performed.
    counter: u64,
}

impl Keeper {
    /// Deploy a keeper at ledger time `now`.
    pub fn new(address: Address, interval: u64, now: Timestamp) -> Self {
        info!("Keeper {} deployed (interval {}s)", address, interval);
        Self {
            address,
            interval,
            last_timestamp: now,
            counter: 0,
        }
    }

    /// Keeper address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Upkeep interval in seconds.
    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Upkeeps performed so far.
    pub fn counter(&self) -> u64 {
        self.counter
    }

    /// Is upkeep due at `now`? Strictly more than `interval` must have passed.
    pub fn check_upkeep(&self, now: Timestamp) -> bool {
        now.saturating_sub(self.last_timestamp) > self.interval
    }

    /// Finalize every timed-out game. Returns the settled ids.
    ///
    /// A game that fails to settle is logged and left for the next run.
    pub fn perform_upkeep<L: EscrowLedger>(
        &mut self,
        ctx: &CallContext,
        registry: &mut GameRegistry<L>,
    ) -> Result<Vec<GameId>, KeeperError> {
        if !self.check_upkeep(ctx.timestamp) {
            let elapsed = ctx.timestamp.saturating_sub(self.last_timestamp);
            let remaining = self.interval.saturating_sub(elapsed) + 1;
            debug!("Upkeep not due for another {}s", remaining);
            return Err(KeeperError::IntervalNotMet { remaining });
        }

        self.last_timestamp = ctx.timestamp;
        self.counter += 1;

        let as_keeper = ctx.as_caller(self.address);
        let mut settled = Vec::new();
        for game_id in registry.timed_out(ctx.timestamp) {
            match registry.finalize(&as_keeper, game_id) {
                Ok(_) => settled.push(game_id),
                Err(e) => warn!("Upkeep could not finalize game {}: {} ({})", game_id, e, e.code()),
            }
        }

        info!("Upkeep #{} settled {} expired game(s)", self.counter, settled.len());
        Ok(settled)
    }
}
