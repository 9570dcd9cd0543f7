//! ZK RPS Server
//!
//! `zk-rps-server serve` runs the WebSocket ledger node.
//! `zk-rps-server demo` (the default) plays one scripted game in-process.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zk_rps::{
    config::NodeConfig,
    game::{registry::StartGame, state::Slot},
    host::{LedgerHost, Operation, Receipt},
    proof::{verify::DigestVerifier, AgreementSigner, GameAgreement, MoveOpening},
    Address, Amount, Move, VerifierSet, VERSION,
};

const ETHER: Amount = 1_000_000_000_000_000_000;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    info!("ZK RPS Server v{}", VERSION);

    let config = NodeConfig::from_env()?;
    match std::env::args().nth(1).as_deref() {
        None | Some("demo") => demo_game(&config),
        Some("serve") => serve(config).await,
        Some(other) => bail!("unknown command {:?} (expected `demo` or `serve`)", other),
    }
}

async fn serve(config: NodeConfig) -> Result<()> {
    if !config.auth.is_configured() && !config.insecure_dev_auth {
        warn!("No AUTH_SECRET or AUTH_PUBLIC_KEY_PEM set and RPS_INSECURE_DEV_AUTH is off: no client can sign in");
    }
    let host = LedgerHost::new(config.host_config(), VerifierSet::digest())?;
    let server = zk_rps::network::GameServer::new(config.server_config(), host);
    server.run().await?;
    Ok(())
}

/// Play one game: player 0 signs, player 1 submits, both commit, both reveal,
/// anyone settles.
fn demo_game(config: &NodeConfig) -> Result<()> {
    info!("=== Starting Demo Game ===");

    let mut host = LedgerHost::new(config.host_config(), VerifierSet::digest())?;
    let signer = AgreementSigner::from_secret(&[0x5e; 32])?;
    let player0 = signer.address();
    let player1 = Address::derive(&player0, "demo/player1");
    let wager = ETHER;

    for player in [player0, player1] {
        host.execute(player, Operation::Faucet)?;
        host.execute(player, Operation::ApproveWallet { amount: 10 * ETHER })?;
        host.execute(player, Operation::WalletDeposit { amount: 10 * ETHER })?;
        info!("{} escrowed {}", player, host.wallet_deposits(&player));
    }

    let valid_until = host.now() + 600;
    let agreement = GameAgreement { principal0: player0, proxy0: player0, wager, valid_until };
    let request = StartGame {
        principal0: player0,
        proxy0: player0,
        principal1: player1,
        wager,
        valid_until,
        signature: signer.sign(&agreement)?,
    };
    info!("Agreement signed by {}: {}", player0, request.signature);

    let game_id = match host.execute(player1, Operation::StartGame(request))? {
        Receipt::GameStarted { game_id } => game_id,
        other => bail!("unexpected receipt {:?}", other),
    };
    info!("Game {} started", game_id);

    let moves = [(Slot::Player0, player0, Move::Paper), (Slot::Player1, player1, Move::Rock)];
    let mut openings = Vec::new();
    for (i, (slot, proxy, player_move)) in moves.into_iter().enumerate() {
        let prior = host.game(game_id).and_then(|g| g.committed(slot.other())).map(|m| m.commitment);
        let opening = MoveOpening::new(game_id, slot.index() as u8, proxy, player_move, demo_salt(i as u8));
        let inputs = opening.public_inputs(prior);
        host.advance_time(15);
        host.execute(
            proxy,
            Operation::SubmitMove { game_id, slot, proof: DigestVerifier::prove(&inputs), inputs },
        )?;
        info!("Slot {} committed {}", slot, hex::encode(opening.commitment()));
        openings.push((slot, opening));
    }

    for (slot, opening) in openings {
        host.advance_time(5);
        host.execute(
            opening.committer,
            Operation::RevealMove { game_id, slot, player_move: opening.player_move, salt: opening.salt },
        )?;
        info!("Slot {} revealed {:?}", slot, opening.player_move);
    }

    match host.execute(player1, Operation::Finalize { game_id })? {
        Receipt::Finalized(settlement) => info!("Resolution: {:?}", settlement.resolution),
        other => bail!("unexpected receipt {:?}", other),
    }

    info!("=== Demo Results ===");
    for player in [player0, player1] {
        info!("{} escrow: {}", player, host.wallet_deposits(&player));
    }
    let snapshot = host.snapshot().to_bytes()?;
    info!("Ledger height {}, snapshot {} bytes", host.block_height(), snapshot.len());

    Ok(())
}

fn demo_salt(seed: u8) -> [u8; 32] {
    zk_rps::core::hash::sha256_with_domain(b"zk-rps/demo-salt", &[seed])
}
