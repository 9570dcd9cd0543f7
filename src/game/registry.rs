//! Game Registry
//!
//! The authoritative state machine for wagered games.
//!
//! ```text
//!   start_game ──► Pending ──submit_move×2──► Committed ──reveal_move×2, finalize──► Finalized
//!                     │                           │                                    ▲
//!                     │                           └── finalize (after reveal_deadline) ┤
//!                     └────────────── finalize (after valid_until) ────────────────────┘
//! ```
//!
//! Moves go in as proof-backed commitments only. Nobody, the registry
//! included, learns a move until both slots are filled; then each proxy
//! opens its own commitment. A player who does not open in time forfeits
//! to one who did.
//!
//! Every operation validates fully before touching state, so a rejected
//! call leaves games, counter, and escrow balances unchanged. Wagers are
//! locked by moving them into the registry's own escrow account and paid
//! out of it on settlement, which requires the registry to hold
//! `ORGANISER` on its ledger.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::address::Address;
use crate::core::context::{Amount, CallContext, Timestamp};
use crate::core::hash::Hash32;
use crate::escrow::{EscrowError, EscrowLedger};
use crate::game::events::{GameEvent, GameEventData};
use crate::game::moves::{resolve, Move, Outcome};
use crate::game::state::{CommittedMove, Game, GameId, GameStatus, Resolution, Slot};
use crate::proof::agreement::{AgreementError, AgreementSignature, GameAgreement};
use crate::proof::commitment::MoveOpening;
use crate::proof::public_inputs::MovePublicInputs;
use crate::proof::verify::{MoveProof, VerifierSet};

// =============================================================================
// ERRORS
// =============================================================================

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    /// Submitted after the agreement deadline.
    #[error("agreement expired at {valid_until} (now {now})")]
    ExpiredAgreement {
        /// Agreement deadline.
        valid_until: Timestamp,
        /// Ledger time of submission.
        now: Timestamp,
    },

    /// Signature does not recover to principal 0.
    #[error("invalid signature: {0}")]
    InvalidSignature(#[from] AgreementError),

    /// These signed terms already started a game.
    #[error("agreement 0x{} already used", hex::encode(.0))]
    AgreementReplayed(Hash32),

    /// A principal cannot cover the wager.
    #[error("insufficient escrow for {account}: {available} < {required}")]
    InsufficientEscrow {
        /// Principal short of funds.
        account: Address,
        /// Escrowed balance.
        available: Amount,
        /// Amount the game needs locked.
        required: Amount,
    },

    /// No game with this id.
    #[error("game {0} not found")]
    GameNotFound(GameId),

    /// Move already recorded for this slot.
    #[error("slot {slot} of game {game_id} is occupied")]
    SlotOccupied {
        /// Game id.
        game_id: GameId,
        /// Slot.
        slot: Slot,
    },

    /// Caller is not the proxy for the slot.
    #[error("{caller} is not the proxy for slot {slot} of game {game_id}")]
    Unauthorized {
        /// Game id.
        game_id: GameId,
        /// Slot.
        slot: Slot,
        /// Offending caller.
        caller: Address,
    },

    /// Proof or its public inputs were not accepted.
    #[error("proof rejected: {0}")]
    ProofRejected(String),

    /// Reveal attempted while a slot is still uncommitted.
    #[error("game {0} is not committed yet")]
    NotRevealable(GameId),

    /// Slot already opened.
    #[error("slot {slot} of game {game_id} is already revealed")]
    AlreadyRevealed {
        /// Game id.
        game_id: GameId,
        /// Slot.
        slot: Slot,
    },

    /// Move and salt do not open the stored commitment.
    #[error("opening does not match the commitment in slot {slot} of game {game_id}")]
    InvalidReveal {
        /// Game id.
        game_id: GameId,
        /// Slot.
        slot: Slot,
    },

    /// Move submitted to a settled game.
    #[error("game {0} is finalized")]
    GameFinalized(GameId),

    /// Second finalize call.
    #[error("game {0} already finalized")]
    AlreadyFinalized(GameId),

    /// Game neither ready nor past its deadline.
    #[error("game {game_id} cannot be finalized before {deadline}")]
    NotFinalizable {
        /// Game id.
        game_id: GameId,
        /// Agreement deadline while pending, reveal deadline once committed.
        deadline: Timestamp,
    },

    /// Wager does not fit the ledger's arithmetic.
    #[error("wager overflow")]
    WagerOverflow,

    /// Escrow ledger refused a movement.
    #[error("escrow: {0}")]
    Escrow(#[from] EscrowError),
}

impl GameError {
    /// Stable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExpiredAgreement { .. } => "EXPIRED_AGREEMENT",
            Self::InvalidSignature(_) => "INVALID_SIGNATURE",
            Self::AgreementReplayed(_) => "AGREEMENT_REPLAYED",
            Self::InsufficientEscrow { .. } => "INSUFFICIENT_ESCROW",
            Self::GameNotFound(_) => "GAME_NOT_FOUND",
            Self::SlotOccupied { .. } => "SLOT_OCCUPIED",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::ProofRejected(_) => "PROOF_REJECTED",
            Self::NotRevealable(_) => "NOT_REVEALABLE",
            Self::AlreadyRevealed { .. } => "ALREADY_REVEALED",
            Self::InvalidReveal { .. } => "INVALID_REVEAL",
            Self::GameFinalized(_) => "GAME_FINALIZED",
            Self::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            Self::NotFinalizable { .. } => "NOT_FINALIZABLE",
            Self::WagerOverflow => "WAGER_OVERFLOW",
            Self::Escrow(e) => e.code(),
        }
    }
}

// =============================================================================
// REQUESTS AND RESULTS
// =============================================================================

/// Arguments of `start_game`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartGame {
    /// Player 0's principal (the signer).
    pub principal0: Address,
    /// Player 0's proxy.
    pub proxy0: Address,
    /// Player 1's principal.
    pub principal1: Address,
    /// Per-player stake.
    #[serde(with = "crate::core::amount")]
    pub wager: Amount,
    /// Agreement deadline.
    pub valid_until: Timestamp,
    /// Player 0's signature over the agreement.
    pub signature: AgreementSignature,
}

impl StartGame {
    /// The signed terms.
    pub fn agreement(&self) -> GameAgreement {
        GameAgreement {
            principal0: self.principal0,
            proxy0: self.proxy0,
            wager: self.wager,
            valid_until: self.valid_until,
        }
    }
}

/// Outcome of `finalize`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// Game settled.
    pub game_id: GameId,
    /// How it ended.
    pub resolution: Resolution,
    /// Escrow credits made, in order.
    #[serde(with = "crate::core::amount::pairs")]
    pub payouts: Vec<(Address, Amount)>,
}

/// Serializable registry data (everything but the ledger and verifiers).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    /// Last assigned id.
    pub counter: GameId,
    /// Games by id.
    pub games: BTreeMap<GameId, Game>,
    /// Transition log.
    pub events: Vec<GameEvent>,
    /// Digests of agreements that started a game. Each starts at most one.
    #[serde(default)]
    pub consumed_agreements: BTreeSet<Hash32>,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Seconds both players have to open their commitments once the game is
/// committed.
pub const DEFAULT_REVEAL_WINDOW: Timestamp = 600;

/// Game registry over an escrow ledger.
#[derive(Clone)]
pub struct GameRegistry<L> {
    address: Address,
    ledger: L,
    verifiers: VerifierSet,
    reveal_window: Timestamp,
    state: RegistryState,
}

impl<L: EscrowLedger> GameRegistry<L> {
    /// Deploy a registry at `address`. It still needs `ORGANISER` on `ledger`.
    pub fn new(address: Address, ledger: L, verifiers: VerifierSet) -> Self {
        info!("GameRegistry deployed at {} ({:?})", address, verifiers);
        Self {
            address,
            ledger,
            verifiers,
            reveal_window: DEFAULT_REVEAL_WINDOW,
            state: RegistryState::default(),
        }
    }

    /// Rebuild from persisted state.
    pub fn from_state(address: Address, ledger: L, verifiers: VerifierSet, state: RegistryState) -> Self {
        Self { address, ledger, verifiers, reveal_window: DEFAULT_REVEAL_WINDOW, state }
    }

    /// Override the reveal window (seconds).
    pub fn with_reveal_window(mut self, secs: Timestamp) -> Self {
        self.reveal_window = secs;
        self
    }

    /// Reveal window in seconds.
    pub fn reveal_window(&self) -> Timestamp {
        self.reveal_window
    }

    /// Registry address (also its escrow account).
    pub fn address(&self) -> Address {
        self.address
    }

    /// Escrow ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Escrow ledger, mutable (deposits and role admin go straight to it).
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    /// Persisted data.
    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Last assigned game id (number of games ever started).
    pub fn counter(&self) -> GameId {
        self.state.counter
    }

    /// Game by id.
    pub fn get_game(&self, game_id: GameId) -> Option<&Game> {
        self.state.games.get(&game_id)
    }

    /// Lifecycle state of a game.
    pub fn status(&self, game_id: GameId) -> Option<GameStatus> {
        self.get_game(game_id).map(Game::status)
    }

    /// Ids of games not yet finalized.
    pub fn open_games(&self) -> Vec<GameId> {
        self.state
            .games
            .values()
            .filter(|g| !g.is_finalized())
            .map(|g| g.id)
            .collect()
    }

    /// Pending games whose deadline has passed at `now`.
    pub fn expired_pending(&self, now: Timestamp) -> Vec<GameId> {
        self.state
            .games
            .values()
            .filter(|g| g.status() == GameStatus::Pending && g.is_expired(now))
            .map(|g| g.id)
            .collect()
    }

    /// Games the timeout path can settle at `now`: pending past the agreement
    /// deadline, or committed past the reveal deadline.
    pub fn timed_out(&self, now: Timestamp) -> Vec<GameId> {
        self.state
            .games
            .values()
            .filter(|g| match g.status() {
                GameStatus::Pending => g.is_expired(now),
                GameStatus::Committed => g.reveal_expired(now),
                GameStatus::Finalized => false,
            })
            .map(|g| g.id)
            .collect()
    }

    /// Has this agreement already started a game?
    pub fn is_consumed(&self, agreement: &GameAgreement) -> bool {
        self.state.consumed_agreements.contains(&agreement.digest())
    }

    /// Transition log.
    pub fn events(&self) -> &[GameEvent] {
        &self.state.events
    }

    // -------------------------------------------------------------------------
    // startGame
    // -------------------------------------------------------------------------

    /// Start a game from player 0's signed agreement.
    ///
    /// Anyone may submit; the submitter becomes player 1's proxy. A given
    /// set of signed terms starts at most one game.
    #[instrument(skip(self, request), fields(caller = %ctx.caller, principal0 = %request.principal0))]
    pub fn start_game(&mut self, ctx: &CallContext, request: &StartGame) -> Result<GameId, GameError> {
        let result = self.try_start_game(ctx, request);
        if let Err(e) = &result {
            debug!(code = e.code(), "start_game rejected: {}", e);
        }
        result
    }

    fn try_start_game(&mut self, ctx: &CallContext, request: &StartGame) -> Result<GameId, GameError> {
        if ctx.timestamp > request.valid_until {
            return Err(GameError::ExpiredAgreement {
                valid_until: request.valid_until,
                now: ctx.timestamp,
            });
        }

        let agreement = request.agreement();
        agreement.verify(&request.signature, &request.principal0)?;
        let digest = agreement.digest();
        if self.state.consumed_agreements.contains(&digest) {
            return Err(GameError::AgreementReplayed(digest));
        }

        let wager = request.wager;
        let principals = [request.principal0, request.principal1];
        self.check_escrow(&principals, wager)?;

        let game_id = self.state.counter.checked_add(1).ok_or(GameError::WagerOverflow)?;

        if wager > 0 {
            let as_registry = ctx.as_caller(self.address);
            for principal in principals {
                self.ledger.transfer(&as_registry, self.address, principal, wager)?;
            }
        }

        let game = Game {
            id: game_id,
            player_addrs: principals,
            player_proxy_addrs: [request.proxy0, ctx.caller],
            wager,
            valid_until: request.valid_until,
            started_at: ctx.timestamp,
            move_commitments: [None, None],
            reveal_deadline: 0,
            finalized_at: 0,
            resolution: None,
        };

        self.state.counter = game_id;
        self.state.consumed_agreements.insert(digest);
        self.push_event(
            ctx,
            game_id,
            GameEventData::GameStarted {
                principals: game.player_addrs,
                proxies: game.player_proxy_addrs,
                wager,
                valid_until: game.valid_until,
            },
        );
        self.state.games.insert(game_id, game);

        info!(
            "Game {} started: {} vs {} for {} (valid until {})",
            game_id, principals[0], principals[1], wager, request.valid_until
        );
        Ok(game_id)
    }

    /// Both principals can cover the wager (twice over if they are the same account).
    fn check_escrow(&self, principals: &[Address; 2], wager: Amount) -> Result<(), GameError> {
        let pot = wager.checked_mul(2).ok_or(GameError::WagerOverflow)?;
        let same = principals[0] == principals[1];
        for principal in principals {
            let required = if same { pot } else { wager };
            let available = self.ledger.deposits(principal);
            if available < required {
                return Err(GameError::InsufficientEscrow {
                    account: *principal,
                    available,
                    required,
                });
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // submitMove
    // -------------------------------------------------------------------------

    /// Record a proof-backed move commitment in `slot`.
    ///
    /// The first move in a game is checked by moveA, the second by moveB
    /// chained to the first; both also pass the init circuit. Only the
    /// commitment is stored. The second commitment opens the reveal window.
    #[instrument(skip(self, proof, inputs), fields(caller = %ctx.caller))]
    pub fn submit_move(
        &mut self,
        ctx: &CallContext,
        game_id: GameId,
        slot: Slot,
        proof: &MoveProof,
        inputs: &MovePublicInputs,
    ) -> Result<GameStatus, GameError> {
        let result = self.try_submit_move(ctx, game_id, slot, proof, inputs);
        if let Err(e) = &result {
            debug!(code = e.code(), "submit_move rejected: {}", e);
        }
        result
    }

    fn try_submit_move(
        &mut self,
        ctx: &CallContext,
        game_id: GameId,
        slot: Slot,
        proof: &MoveProof,
        inputs: &MovePublicInputs,
    ) -> Result<GameStatus, GameError> {
        let game = self.state.games.get(&game_id).ok_or(GameError::GameNotFound(game_id))?;

        if game.is_finalized() {
            return Err(GameError::GameFinalized(game_id));
        }
        if game.committed(slot).is_some() {
            return Err(GameError::SlotOccupied { game_id, slot });
        }
        if game.proxy(slot) != ctx.caller {
            return Err(GameError::Unauthorized { game_id, slot, caller: ctx.caller });
        }

        if inputs.game_id != game_id {
            return Err(GameError::ProofRejected(format!(
                "public inputs bind game {}, not {}",
                inputs.game_id, game_id
            )));
        }
        if inputs.slot as usize != slot.index() {
            return Err(GameError::ProofRejected(format!(
                "public inputs bind slot {}, not {}",
                inputs.slot, slot
            )));
        }
        if inputs.committer != ctx.caller {
            return Err(GameError::ProofRejected(format!(
                "public inputs bind committer {}, not {}",
                inputs.committer, ctx.caller
            )));
        }

        let prior = game.committed(slot.other()).map(|m| m.commitment).unwrap_or([0u8; 32]);
        if inputs.prior_commitment != prior {
            return Err(GameError::ProofRejected("prior commitment does not match opponent".into()));
        }

        #[cfg(feature = "debug-tracing")]
        debug!("public inputs: {}", hex::encode(inputs.to_bytes()));

        if let Err(e) = self.verifiers.verify_move(proof, inputs) {
            warn!("Game {} slot {}: {}", game_id, slot, e);
            return Err(GameError::ProofRejected(e.to_string()));
        }

        let reveal_deadline = ctx.timestamp.saturating_add(self.reveal_window);
        let status = match self.state.games.get_mut(&game_id) {
            Some(game) => {
                game.move_commitments[slot.index()] = Some(CommittedMove::sealed(inputs.commitment, ctx.timestamp));
                if game.status() == GameStatus::Committed {
                    game.reveal_deadline = reveal_deadline;
                }
                game.status()
            }
            None => return Err(GameError::GameNotFound(game_id)),
        };

        self.push_event(
            ctx,
            game_id,
            GameEventData::MoveCommitted { slot, proxy: ctx.caller, commitment: inputs.commitment },
        );
        info!("Game {} slot {} committed by {}", game_id, slot, ctx.caller);

        if status == GameStatus::Committed {
            self.push_event(ctx, game_id, GameEventData::GameCommitted { reveal_deadline });
            info!("Game {} committed, reveals due by {}", game_id, reveal_deadline);
        }
        Ok(status)
    }

    // -------------------------------------------------------------------------
    // revealMove
    // -------------------------------------------------------------------------

    /// Open the commitment in `slot`. Only its proxy may, and only once both
    /// slots are committed. Late reveals are accepted until the game is
    /// finalized.
    #[instrument(skip(self, salt), fields(caller = %ctx.caller))]
    pub fn reveal_move(
        &mut self,
        ctx: &CallContext,
        game_id: GameId,
        slot: Slot,
        player_move: Move,
        salt: &[u8; 32],
    ) -> Result<(), GameError> {
        let result = self.try_reveal_move(ctx, game_id, slot, player_move, salt);
        if let Err(e) = &result {
            debug!(code = e.code(), "reveal_move rejected: {}", e);
        }
        result
    }

    fn try_reveal_move(
        &mut self,
        ctx: &CallContext,
        game_id: GameId,
        slot: Slot,
        player_move: Move,
        salt: &[u8; 32],
    ) -> Result<(), GameError> {
        let game = self.state.games.get(&game_id).ok_or(GameError::GameNotFound(game_id))?;

        match game.status() {
            GameStatus::Finalized => return Err(GameError::GameFinalized(game_id)),
            GameStatus::Pending => return Err(GameError::NotRevealable(game_id)),
            GameStatus::Committed => {}
        }
        if game.proxy(slot) != ctx.caller {
            return Err(GameError::Unauthorized { game_id, slot, caller: ctx.caller });
        }
        let commitment = match game.committed(slot) {
            Some(m) if m.revealed.is_some() => return Err(GameError::AlreadyRevealed { game_id, slot }),
            Some(m) => m.commitment,
            None => return Err(GameError::NotRevealable(game_id)),
        };

        let opening = MoveOpening::new(game_id, slot.index() as u8, game.proxy(slot), player_move, *salt);
        if !opening.opens(&commitment) {
            return Err(GameError::InvalidReveal { game_id, slot });
        }

        if let Some(m) = self
            .state
            .games
            .get_mut(&game_id)
            .and_then(|g| g.move_commitments[slot.index()].as_mut())
        {
            m.revealed = Some(player_move);
        }

        self.push_event(ctx, game_id, GameEventData::MoveRevealed { slot, player_move });
        info!("Game {} slot {} revealed", game_id, slot);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // finalize
    // -------------------------------------------------------------------------

    /// Settle a game. Callable by anyone once both moves are revealed, or
    /// once the relevant deadline has passed.
    #[instrument(skip(self), fields(caller = %ctx.caller))]
    pub fn finalize(&mut self, ctx: &CallContext, game_id: GameId) -> Result<Settlement, GameError> {
        let result = self.try_finalize(ctx, game_id);
        if let Err(e) = &result {
            debug!(code = e.code(), "finalize rejected: {}", e);
        }
        result
    }

    fn try_finalize(&mut self, ctx: &CallContext, game_id: GameId) -> Result<Settlement, GameError> {
        let game = self.state.games.get(&game_id).ok_or(GameError::GameNotFound(game_id))?;
        let (resolution, payouts) = settle(game, ctx.timestamp)?;

        let owed = payouts
            .iter()
            .try_fold(0 as Amount, |acc, (_, amount)| acc.checked_add(*amount))
            .ok_or(GameError::WagerOverflow)?;
        let held = self.ledger.deposits(&self.address);
        if held < owed {
            return Err(GameError::Escrow(EscrowError::InsufficientBalance {
                account: self.address,
                available: held,
                requested: owed,
            }));
        }

        let as_registry = ctx.as_caller(self.address);
        for (to, amount) in &payouts {
            self.ledger.transfer(&as_registry, *to, self.address, *amount)?;
        }

        if let Some(game) = self.state.games.get_mut(&game_id) {
            // 0 means "open", so settlement time is at least 1.
            game.finalized_at = ctx.timestamp.max(1);
            game.resolution = Some(resolution);
        }

        self.push_event(
            ctx,
            game_id,
            GameEventData::GameFinalized { resolution, payouts: payouts.clone() },
        );
        info!("Game {} finalized: {:?}", game_id, resolution);

        Ok(Settlement { game_id, resolution, payouts })
    }

    fn push_event(&mut self, ctx: &CallContext, game_id: GameId, data: GameEventData) {
        let event = GameEvent::new(ctx.timestamp, ctx.block_height, game_id, data);
        debug!("event {} for game {}", event.kind(), game_id);
        self.state.events.push(event);
    }
}

/// Work out how a game settles at `now`, without touching anything.
fn settle(game: &Game, now: Timestamp) -> Result<(Resolution, Vec<(Address, Amount)>), GameError> {
    let pot = game.pot().ok_or(GameError::WagerOverflow)?;
    let refund = || {
        vec![
            (game.principal(Slot::Player0), game.wager),
            (game.principal(Slot::Player1), game.wager),
        ]
    };

    let (resolution, payouts) = match game.status() {
        GameStatus::Finalized => return Err(GameError::AlreadyFinalized(game.id)),
        GameStatus::Committed => match (game.revealed(Slot::Player0), game.revealed(Slot::Player1)) {
            (Some(m0), Some(m1)) => {
                let outcome = resolve(m0, m1);
                let payouts = match outcome {
                    Outcome::Player0Wins => vec![(game.principal(Slot::Player0), pot)],
                    Outcome::Player1Wins => vec![(game.principal(Slot::Player1), pot)],
                    Outcome::Draw => refund(),
                };
                (Resolution::Played(outcome), payouts)
            }
            _ if !game.reveal_expired(now) => {
                return Err(GameError::NotFinalizable { game_id: game.id, deadline: game.reveal_deadline });
            }
            (Some(_), None) => (Resolution::Forfeit { winner: Slot::Player0 }, vec![(game.principal(Slot::Player0), pot)]),
            (None, Some(_)) => (Resolution::Forfeit { winner: Slot::Player1 }, vec![(game.principal(Slot::Player1), pot)]),
            (None, None) => (Resolution::Abandoned, refund()),
        },
        GameStatus::Pending => {
            if !game.is_expired(now) {
                return Err(GameError::NotFinalizable { game_id: game.id, deadline: game.valid_until });
            }
            match Slot::BOTH.into_iter().find(|s| game.committed(*s).is_some()) {
                Some(winner) => (Resolution::Forfeit { winner }, vec![(game.principal(winner), pot)]),
                None => (Resolution::Abandoned, refund()),
            }
        }
    };

    let payouts = payouts.into_iter().filter(|(_, amount)| *amount > 0).collect();
    Ok((resolution, payouts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::escrow::access::Role;
    use crate::escrow::token::MemoryToken;
    use crate::escrow::wallet::GameWallet;
    use crate::proof::agreement::AgreementSigner;
    use crate::proof::verify::{DigestVerifier, FixedVerifier};

    const DEPLOYER: Address = Address::repeat(0xd0);
    const WALLET: Address = Address::repeat(0x77);
    const REGISTRY: Address = Address::repeat(0x88);
    const PLAYER1: Address = Address::repeat(0x0b);
    const STRANGER: Address = Address::repeat(0x0c);
    const NOW: Timestamp = 1_700_000_000;
    const ETHER: Amount = 1_000_000_000_000_000_000;

    type Registry = GameRegistry<GameWallet<MemoryToken>>;

    struct Fixture {
        registry: Registry,
        signer: AgreementSigner,
        openings: BTreeMap<(GameId, usize), MoveOpening>,
    }

    impl Fixture {
        fn player0(&self) -> Address {
            self.signer.address()
        }

        fn ctx(&self, caller: Address) -> CallContext {
            CallContext::new(caller, NOW, 10)
        }

        fn request(&self, wager: Amount, valid_until: Timestamp) -> StartGame {
            let p0 = self.player0();
            let agreement = GameAgreement { principal0: p0, proxy0: p0, wager, valid_until };
            StartGame {
                principal0: p0,
                proxy0: p0,
                principal1: PLAYER1,
                wager,
                valid_until,
                signature: self.signer.sign(&agreement).unwrap(),
            }
        }

        fn start(&mut self, wager: Amount) -> GameId {
            self.start_until(wager, NOW + 1_000)
        }

        fn start_until(&mut self, wager: Amount, valid_until: Timestamp) -> GameId {
            let request = self.request(wager, valid_until);
            let ctx = self.ctx(PLAYER1);
            self.registry.start_game(&ctx, &request).unwrap()
        }

        fn play(&mut self, game_id: GameId, slot: Slot, caller: Address, mv: Move, at: Timestamp) -> Result<GameStatus, GameError> {
            let prior = self
                .registry
                .get_game(game_id)
                .and_then(|g| g.committed(slot.other()))
                .map(|m| m.commitment);
            let opening = MoveOpening::new(game_id, slot.index() as u8, caller, mv, rand::random());
            let inputs = opening.public_inputs(prior);
            let ctx = CallContext::new(caller, at, 11);
            let status = self.registry.submit_move(&ctx, game_id, slot, &DigestVerifier::prove(&inputs), &inputs)?;
            self.openings.insert((game_id, slot.index()), opening);
            Ok(status)
        }

        fn reveal(&mut self, game_id: GameId, slot: Slot, at: Timestamp) -> Result<(), GameError> {
            let opening = self.openings[&(game_id, slot.index())].clone();
            let ctx = CallContext::new(opening.committer, at, 12);
            self.registry.reveal_move(&ctx, game_id, slot, opening.player_move, &opening.salt)
        }

        /// Commit both moves, then open both.
        fn play_out(&mut self, game_id: GameId, m0: Move, m1: Move) {
            self.commit_both(game_id, m0, m1);
            self.reveal(game_id, Slot::Player0, NOW + 3).unwrap();
            self.reveal(game_id, Slot::Player1, NOW + 4).unwrap();
        }

        fn commit_both(&mut self, game_id: GameId, m0: Move, m1: Move) {
            let p0 = self.player0();
            self.play(game_id, Slot::Player0, p0, m0, NOW + 1).unwrap();
            self.play(game_id, Slot::Player1, PLAYER1, m1, NOW + 2).unwrap();
        }

        fn deposits(&self, account: &Address) -> Amount {
            self.registry.ledger().deposits(account)
        }
    }

    fn setup_with(verifiers: VerifierSet) -> Fixture {
        let signer = AgreementSigner::from_secret(&[0x42; 32]).unwrap();
        let player0 = signer.address();

        let mut token = MemoryToken::new("TST");
        for p in [player0, PLAYER1] {
            token.mint(&p, 100 * ETHER).unwrap();
            token.approve(&p, &WALLET, 100 * ETHER);
        }
        let mut wallet = GameWallet::new(WALLET, DEPLOYER, token);
        let deploy = CallContext::new(DEPLOYER, NOW, 1);
        wallet.grant_role(&deploy, Role::Organiser, REGISTRY).unwrap();
        for p in [player0, PLAYER1] {
            wallet.deposit(&CallContext::new(p, NOW, 2), ETHER).unwrap();
        }

        Fixture {
            registry: GameRegistry::new(REGISTRY, wallet, verifiers),
            signer,
            openings: BTreeMap::new(),
        }
    }

    fn setup() -> Fixture {
        setup_with(VerifierSet::digest())
    }

    #[test]
    fn test_start_game() {
        let mut f = setup();
        let id = f.start(100);

        assert_eq!(id, 1);
        assert_eq!(f.registry.counter(), 1);

        let game = f.registry.get_game(id).unwrap();
        assert_eq!(game.player_addrs, [f.player0(), PLAYER1]);
        assert_eq!(game.player_proxy_addrs, [f.player0(), PLAYER1]);
        assert_eq!(game.finalized_at, 0);
        assert_eq!(game.reveal_deadline, 0);
        assert_eq!(game.wager, 100);
        assert_eq!(game.status(), GameStatus::Pending);

        assert_eq!(f.deposits(&f.player0()), ETHER - 100);
        assert_eq!(f.deposits(&REGISTRY), 200);
    }

    #[test]
    fn test_counter_increments_per_game() {
        let mut f = setup();
        for expected in 1..=3 {
            // Each game needs its own signed terms.
            assert_eq!(f.start_until(1, NOW + 1_000 + expected), expected);
            assert_eq!(f.registry.counter(), expected);
        }
        assert_eq!(f.deposits(&REGISTRY), 6);
    }

    #[test]
    fn test_agreement_starts_one_game() {
        let mut f = setup();
        let request = f.request(100, NOW + 1_000);
        let first = f.registry.start_game(&f.ctx(PLAYER1), &request).unwrap();
        assert!(f.registry.is_consumed(&request.agreement()));

        let before = f.registry.state().clone();
        let balances = (f.deposits(&f.player0()), f.deposits(&PLAYER1), f.deposits(&REGISTRY));

        for submitter in [PLAYER1, STRANGER] {
            let result = f.registry.start_game(&f.ctx(submitter), &request);
            assert_eq!(result, Err(GameError::AgreementReplayed(request.agreement().digest())));
            assert_eq!(result.unwrap_err().code(), "AGREEMENT_REPLAYED");
        }

        assert_eq!(f.registry.counter(), first);
        assert_eq!(f.registry.state(), &before);
        assert_eq!((f.deposits(&f.player0()), f.deposits(&PLAYER1), f.deposits(&REGISTRY)), balances);
    }

    #[test]
    fn test_replay_rejected_after_game_finalized() {
        let mut f = setup();
        let request = f.request(100, NOW + 1_000);
        let id = f.registry.start_game(&f.ctx(PLAYER1), &request).unwrap();
        f.play_out(id, Move::Rock, Move::Paper);
        f.registry.finalize(&f.ctx(STRANGER), id).unwrap();

        let result = f.registry.start_game(&f.ctx(PLAYER1), &request);
        assert!(matches!(result, Err(GameError::AgreementReplayed(_))));
        assert_eq!(f.deposits(&REGISTRY), 0);
    }

    #[test]
    fn test_expired_agreement() {
        let mut f = setup();
        let request = f.request(100, NOW - 1);
        let result = f.registry.start_game(&f.ctx(PLAYER1), &request);
        assert_eq!(result, Err(GameError::ExpiredAgreement { valid_until: NOW - 1, now: NOW }));
        assert_eq!(f.registry.counter(), 0);
        assert!(!f.registry.is_consumed(&request.agreement()));

        // The deadline itself is still valid.
        let request = f.request(100, NOW);
        assert!(f.registry.start_game(&f.ctx(PLAYER1), &request).is_ok());
    }

    #[test]
    fn test_signature_over_other_terms_rejected() {
        let mut f = setup();
        let mut request = f.request(100, NOW + 1_000);
        request.wager = 101;

        let result = f.registry.start_game(&f.ctx(PLAYER1), &request);
        assert!(matches!(result, Err(GameError::InvalidSignature(_))));
        assert_eq!(result.unwrap_err().code(), "INVALID_SIGNATURE");
        assert_eq!(f.registry.counter(), 0);
        assert_eq!(f.deposits(&REGISTRY), 0);
    }

    #[test]
    fn test_signature_by_other_signer_rejected() {
        let mut f = setup();
        let mallory = AgreementSigner::from_secret(&[0x13; 32]).unwrap();
        let mut request = f.request(100, NOW + 1_000);
        request.signature = mallory.sign(&request.agreement()).unwrap();

        let result = f.registry.start_game(&f.ctx(PLAYER1), &request);
        assert!(matches!(result, Err(GameError::InvalidSignature(AgreementError::SignerMismatch { .. }))));
    }

    #[test]
    fn test_insufficient_escrow_locks_nothing() {
        let mut f = setup();
        let request = f.request(2 * ETHER, NOW + 1_000);
        let result = f.registry.start_game(&f.ctx(PLAYER1), &request);

        assert!(matches!(result, Err(GameError::InsufficientEscrow { required, .. }) if required == 2 * ETHER));
        assert_eq!(f.registry.counter(), 0);
        assert_eq!(f.deposits(&f.player0()), ETHER);
        assert_eq!(f.deposits(&PLAYER1), ETHER);
        // Terms were never used, so they remain available.
        assert!(!f.registry.is_consumed(&request.agreement()));
    }

    #[test]
    fn test_registry_without_organiser_cannot_lock() {
        let mut f = setup();
        let deploy = CallContext::new(DEPLOYER, NOW, 1);
        f.registry.ledger_mut().revoke_role(&deploy, Role::Organiser, REGISTRY).unwrap();

        let request = f.request(100, NOW + 1_000);
        let result = f.registry.start_game(&f.ctx(PLAYER1), &request);
        assert_eq!(result.unwrap_err().code(), "UNAUTHORIZED");
        assert_eq!(f.registry.counter(), 0);
    }

    #[test]
    fn test_full_game_winner_takes_pot() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();

        assert_eq!(f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1), Ok(GameStatus::Pending));
        assert_eq!(f.play(id, Slot::Player1, PLAYER1, Move::Scissors, NOW + 2), Ok(GameStatus::Committed));
        assert_eq!(f.registry.get_game(id).unwrap().reveal_deadline, NOW + 2 + DEFAULT_REVEAL_WINDOW);
        f.reveal(id, Slot::Player1, NOW + 3).unwrap();
        f.reveal(id, Slot::Player0, NOW + 4).unwrap();

        let settlement = f.registry.finalize(&f.ctx(STRANGER), id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Played(Outcome::Player0Wins));
        assert_eq!(settlement.payouts, vec![(p0, 200)]);

        assert_eq!(f.deposits(&p0), ETHER + 100);
        assert_eq!(f.deposits(&PLAYER1), ETHER - 100);
        assert_eq!(f.deposits(&REGISTRY), 0);
        assert_eq!(f.registry.status(id), Some(GameStatus::Finalized));
    }

    #[test]
    fn test_draw_returns_wagers() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();

        f.play(id, Slot::Player1, PLAYER1, Move::Paper, NOW + 1).unwrap();
        f.play(id, Slot::Player0, p0, Move::Paper, NOW + 2).unwrap();
        f.reveal(id, Slot::Player0, NOW + 3).unwrap();
        f.reveal(id, Slot::Player1, NOW + 3).unwrap();

        let settlement = f.registry.finalize(&f.ctx(PLAYER1), id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Played(Outcome::Draw));
        assert_eq!(f.deposits(&p0), ETHER);
        assert_eq!(f.deposits(&PLAYER1), ETHER);
    }

    #[test]
    fn test_committed_move_stays_hidden() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();

        let game = f.registry.get_game(id).unwrap();
        let stored = game.committed(Slot::Player0).unwrap();
        assert_eq!(stored.revealed, None);
        assert_eq!(game.revealed(Slot::Player0), None);

        // The same record for any of the three moves differs only in the hash.
        let json = serde_json::to_value(stored).unwrap();
        assert_eq!(json["revealed"], serde_json::Value::Null);
        for mv in ["Rock", "Paper", "Scissors", "rock", "paper", "scissors"] {
            assert!(!json.to_string().contains(mv));
        }
        for event in f.registry.events() {
            assert!(!matches!(event.data, GameEventData::MoveRevealed { .. }));
        }

        // Nor can the first mover open early.
        assert_eq!(f.reveal(id, Slot::Player0, NOW + 2), Err(GameError::NotRevealable(id)));
        assert_eq!(f.registry.get_game(id).unwrap().revealed(Slot::Player0), None);
    }

    #[test]
    fn test_reveal_requires_matching_opening() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();
        f.play(id, Slot::Player1, PLAYER1, Move::Paper, NOW + 2).unwrap();

        let salt = f.openings[&(id, 0)].salt;
        let ctx = CallContext::new(p0, NOW + 3, 12);

        // Claiming a different move than committed.
        let result = f.registry.reveal_move(&ctx, id, Slot::Player0, Move::Scissors, &salt);
        assert_eq!(result, Err(GameError::InvalidReveal { game_id: id, slot: Slot::Player0 }));
        assert_eq!(result.unwrap_err().code(), "INVALID_REVEAL");

        // Right move, wrong salt.
        let result = f.registry.reveal_move(&ctx, id, Slot::Player0, Move::Rock, &[0u8; 32]);
        assert!(matches!(result, Err(GameError::InvalidReveal { .. })));

        // Only the slot's proxy may open it.
        let ctx = CallContext::new(STRANGER, NOW + 3, 12);
        let result = f.registry.reveal_move(&ctx, id, Slot::Player0, Move::Rock, &salt);
        assert!(matches!(result, Err(GameError::Unauthorized { caller: STRANGER, .. })));

        assert_eq!(f.registry.get_game(id).unwrap().revealed(Slot::Player0), None);
        f.reveal(id, Slot::Player0, NOW + 4).unwrap();
        assert_eq!(f.registry.get_game(id).unwrap().revealed(Slot::Player0), Some(Move::Rock));
        assert_eq!(
            f.reveal(id, Slot::Player0, NOW + 5),
            Err(GameError::AlreadyRevealed { game_id: id, slot: Slot::Player0 })
        );
    }

    #[test]
    fn test_committed_not_finalizable_before_reveals() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();
        f.play(id, Slot::Player1, PLAYER1, Move::Paper, NOW + 2).unwrap();
        f.reveal(id, Slot::Player0, NOW + 3).unwrap();

        let deadline = NOW + 2 + DEFAULT_REVEAL_WINDOW;
        let at_deadline = CallContext::new(STRANGER, deadline, 30);
        assert_eq!(
            f.registry.finalize(&at_deadline, id),
            Err(GameError::NotFinalizable { game_id: id, deadline })
        );
        assert_eq!(f.registry.timed_out(deadline), Vec::<GameId>::new());
        assert_eq!(f.registry.timed_out(deadline + 1), vec![id]);
    }

    #[test]
    fn test_unrevealed_move_forfeits() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        // Player 1 commits the winning move but never opens it.
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();
        f.play(id, Slot::Player1, PLAYER1, Move::Paper, NOW + 2).unwrap();
        f.reveal(id, Slot::Player0, NOW + 3).unwrap();

        let later = CallContext::new(STRANGER, NOW + 3 + DEFAULT_REVEAL_WINDOW, 30);
        let settlement = f.registry.finalize(&later, id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Forfeit { winner: Slot::Player0 });
        assert_eq!(f.deposits(&p0), ETHER + 100);
        assert_eq!(f.deposits(&PLAYER1), ETHER - 100);
    }

    #[test]
    fn test_no_reveals_abandoned() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();
        f.play(id, Slot::Player1, PLAYER1, Move::Paper, NOW + 2).unwrap();

        let later = CallContext::new(STRANGER, NOW + 3 + DEFAULT_REVEAL_WINDOW, 30);
        let settlement = f.registry.finalize(&later, id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Abandoned);
        assert_eq!(f.deposits(&p0), ETHER);
        assert_eq!(f.deposits(&PLAYER1), ETHER);
    }

    #[test]
    fn test_late_reveal_accepted_until_finalized() {
        let mut f = setup();
        let id = f.start(100);
        f.commit_both(id, Move::Rock, Move::Paper);
        let late = NOW + 10 * DEFAULT_REVEAL_WINDOW;
        f.reveal(id, Slot::Player0, late).unwrap();
        f.reveal(id, Slot::Player1, late).unwrap();

        let settlement = f.registry.finalize(&CallContext::new(STRANGER, late, 30), id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Played(Outcome::Player1Wins));
        assert_eq!(f.reveal(id, Slot::Player0, late), Err(GameError::GameFinalized(id)));
    }

    #[test]
    fn test_custom_reveal_window() {
        let mut f = setup();
        f.registry = f.registry.clone().with_reveal_window(5);
        assert_eq!(f.registry.reveal_window(), 5);

        let id = f.start(100);
        f.commit_both(id, Move::Rock, Move::Paper);
        assert_eq!(f.registry.get_game(id).unwrap().reveal_deadline, NOW + 7);
    }

    #[test]
    fn test_double_finalize_rejected() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play_out(id, Move::Rock, Move::Paper);

        f.registry.finalize(&f.ctx(STRANGER), id).unwrap();
        let balances = (f.deposits(&p0), f.deposits(&PLAYER1));

        assert_eq!(f.registry.finalize(&f.ctx(STRANGER), id), Err(GameError::AlreadyFinalized(id)));
        assert_eq!((f.deposits(&p0), f.deposits(&PLAYER1)), balances);
    }

    #[test]
    fn test_occupied_slot_rejected_for_any_caller() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();

        for caller in [p0, PLAYER1, STRANGER] {
            let result = f.play(id, Slot::Player0, caller, Move::Paper, NOW + 2);
            assert_eq!(result, Err(GameError::SlotOccupied { game_id: id, slot: Slot::Player0 }));
        }
    }

    #[test]
    fn test_wrong_proxy_unauthorized() {
        let mut f = setup();
        let id = f.start(100);
        let result = f.play(id, Slot::Player0, STRANGER, Move::Rock, NOW + 1);
        assert!(matches!(result, Err(GameError::Unauthorized { caller: STRANGER, .. })));
    }

    #[test]
    fn test_move_on_finalized_game_rejected() {
        let mut f = setup();
        let id = f.start(100);
        let later = CallContext::new(STRANGER, NOW + 2_000, 20);
        f.registry.finalize(&later, id).unwrap();

        let result = f.play(id, Slot::Player0, f.player0(), Move::Rock, NOW + 2_001);
        assert_eq!(result, Err(GameError::GameFinalized(id)));
    }

    #[test]
    fn test_replay_into_other_game_rejected() {
        let mut f = setup();
        let first = f.start_until(100, NOW + 1_000);
        let second = f.start_until(100, NOW + 1_001);
        let p0 = f.player0();

        let opening = MoveOpening::new(first, 0, p0, Move::Rock, [1u8; 32]);
        let inputs = opening.public_inputs(None);
        let proof = DigestVerifier::prove(&inputs);

        let ctx = f.ctx(p0);
        f.registry.submit_move(&ctx, first, Slot::Player0, &proof, &inputs).unwrap();

        let result = f.registry.submit_move(&ctx, second, Slot::Player0, &proof, &inputs);
        assert!(matches!(result, Err(GameError::ProofRejected(_))));

        let result = f.registry.submit_move(&ctx, first, Slot::Player1, &proof, &inputs);
        assert!(matches!(result, Err(GameError::SlotOccupied { .. }) | Err(GameError::Unauthorized { .. })));
    }

    #[test]
    fn test_phase_b_must_chain_to_opponent() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();

        // Second mover claims no prior commitment (phase A statement).
        let opening = MoveOpening::new(id, 1, PLAYER1, Move::Paper, [2u8; 32]);
        let inputs = opening.public_inputs(None);
        let result = f.registry.submit_move(
            &f.ctx(PLAYER1),
            id,
            Slot::Player1,
            &DigestVerifier::prove(&inputs),
            &inputs,
        );
        assert!(matches!(result, Err(GameError::ProofRejected(_))));
        assert_eq!(f.registry.status(id), Some(GameStatus::Pending));
    }

    #[test]
    fn test_rejecting_verifier() {
        let verifiers = VerifierSet::new(
            Arc::new(FixedVerifier(true)),
            Arc::new(FixedVerifier(true)),
            Arc::new(FixedVerifier(false)),
        );
        let mut f = setup_with(verifiers);
        let id = f.start(100);
        let p0 = f.player0();

        f.play(id, Slot::Player0, p0, Move::Rock, NOW + 1).unwrap();
        let result = f.play(id, Slot::Player1, PLAYER1, Move::Rock, NOW + 2);
        assert_eq!(result.unwrap_err().code(), "PROOF_REJECTED");
        assert!(f.registry.get_game(id).unwrap().committed(Slot::Player1).is_none());
    }

    #[test]
    fn test_pending_not_finalizable_before_deadline() {
        let mut f = setup();
        let id = f.start(100);
        let result = f.registry.finalize(&f.ctx(STRANGER), id);
        assert_eq!(result, Err(GameError::NotFinalizable { game_id: id, deadline: NOW + 1_000 }));
        assert_eq!(f.registry.finalize(&f.ctx(STRANGER), 99), Err(GameError::GameNotFound(99)));
    }

    #[test]
    fn test_timeout_forfeit_to_committed_player() {
        let mut f = setup();
        let id = f.start(100);
        f.play(id, Slot::Player1, PLAYER1, Move::Scissors, NOW + 1).unwrap();

        assert_eq!(f.registry.expired_pending(NOW + 1_000), Vec::<GameId>::new());
        assert_eq!(f.registry.expired_pending(NOW + 1_001), vec![id]);
        assert_eq!(f.registry.timed_out(NOW + 1_001), vec![id]);

        let later = CallContext::new(STRANGER, NOW + 1_001, 30);
        let settlement = f.registry.finalize(&later, id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Forfeit { winner: Slot::Player1 });
        assert_eq!(f.deposits(&PLAYER1), ETHER + 100);
        assert_eq!(f.deposits(&f.player0()), ETHER - 100);
    }

    #[test]
    fn test_timeout_abandoned_refunds_both() {
        let mut f = setup();
        let id = f.start(100);
        let later = CallContext::new(STRANGER, NOW + 5_000, 30);
        let settlement = f.registry.finalize(&later, id).unwrap();

        assert_eq!(settlement.resolution, Resolution::Abandoned);
        assert_eq!(f.deposits(&f.player0()), ETHER);
        assert_eq!(f.deposits(&PLAYER1), ETHER);
        assert!(f.registry.open_games().is_empty());
    }

    #[test]
    fn test_late_moves_accepted_until_finalized() {
        let mut f = setup();
        let id = f.start(100);
        let p0 = f.player0();
        f.play(id, Slot::Player0, p0, Move::Paper, NOW + 1_500).unwrap();
        f.play(id, Slot::Player1, PLAYER1, Move::Rock, NOW + 1_600).unwrap();
        f.reveal(id, Slot::Player0, NOW + 1_650).unwrap();
        f.reveal(id, Slot::Player1, NOW + 1_650).unwrap();

        let later = CallContext::new(STRANGER, NOW + 1_700, 30);
        let settlement = f.registry.finalize(&later, id).unwrap();
        assert_eq!(settlement.resolution, Resolution::Played(Outcome::Player0Wins));
    }

    #[test]
    fn test_zero_wager_game() {
        let mut f = setup();
        let id = f.start(0);
        let p0 = f.player0();
        f.play_out(id, Move::Rock, Move::Paper);

        let settlement = f.registry.finalize(&f.ctx(STRANGER), id).unwrap();
        assert!(settlement.payouts.is_empty());
        assert_eq!(f.deposits(&p0), ETHER);
    }

    #[test]
    fn test_events_follow_lifecycle() {
        let mut f = setup();
        let id = f.start(100);
        f.play_out(id, Move::Rock, Move::Rock);
        f.registry.finalize(&f.ctx(STRANGER), id).unwrap();

        let kinds: Vec<_> = f.registry.events().iter().map(GameEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "game_started",
                "move_committed",
                "move_committed",
                "game_committed",
                "move_revealed",
                "move_revealed",
                "game_finalized",
            ]
        );
    }
}
