//! Street Craps command-line tool
//!
//! Runs simulated heads-up games against the engine and inspects saved snapshots.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use street_craps::{
    config::{DiceMode, LogLevel},
    errors::CrapsResult,
    games::generate_game_id,
    load_snapshot, save_snapshot, ConfigLoader, CrapsConfig, GameStatus, WagerEngine,
};
use tracing::{debug, info};

const CREATOR: &str = "alice";
const CHALLENGER: &str = "bob";

#[derive(Parser)]
#[command(name = "street-craps")]
#[command(about = "Two-party street craps wagering engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a batch of games between two funded players
    Simulate {
        /// Number of games to play
        #[arg(short, long, default_value = "10")]
        games: u32,

        /// Stake per player per game, in lamports
        #[arg(short, long, default_value = "1000")]
        bet: u64,

        /// Use deterministic dice with this seed
        #[arg(short, long)]
        seed: Option<u32>,

        /// Write an engine snapshot here when done
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Print the balances and games held in a snapshot
    Inspect {
        /// Snapshot file written by `simulate`
        path: PathBuf,
    },
}

fn main() -> CrapsResult<()> {
    let cli = Cli::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;
    if cli.verbose {
        config.monitoring.log_level = LogLevel::Debug;
    }
    init_tracing(&config);

    match cli.command {
        Commands::Simulate {
            games,
            bet,
            seed,
            snapshot,
        } => {
            if let Some(seed) = seed {
                config.dice.mode = DiceMode::Seeded;
                config.dice.seed = Some(seed);
                config.runtime.allow_test_randomness = true;
                config.validate()?;
            }
            if snapshot.is_some() {
                config.storage.snapshot_path = snapshot;
            }
            simulate(&config, games, bet)
        }
        Commands::Inspect { path } => inspect(&path),
    }
}

fn init_tracing(config: &CrapsConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.monitoring.log_level.as_filter().into()),
        )
        .init();
}

fn simulate(config: &CrapsConfig, games: u32, bet: u64) -> CrapsResult<()> {
    let engine = WagerEngine::from_config(config)?;
    let bankroll = bet.saturating_mul(u64::from(games).max(1));
    engine.fund(CREATOR, bankroll)?;
    engine.fund(CHALLENGER, bankroll)?;

    info!(games, bet, dice = ?config.dice.mode, "starting simulation");

    let mut creator_wins = 0u32;
    let mut challenger_wins = 0u32;
    for round in 0..games {
        let game_id = generate_game_id();
        engine.create(&game_id, CREATOR, bet)?;
        engine.join(&game_id, CHALLENGER)?;

        let mut shooter = CREATOR;
        loop {
            let roll = engine.roll(&game_id, shooter)?;
            if roll.status_after_roll == GameStatus::Settled {
                break;
            }
            shooter = if shooter == CREATOR { CHALLENGER } else { CREATOR };
        }

        let game = engine.game(&game_id)?;
        let winner = game.winner.clone().unwrap_or_default();
        if winner == CREATOR {
            creator_wins += 1;
        } else {
            challenger_wins += 1;
        }

        engine.claim(&game_id, &winner)?;
        engine.close(&game_id, CREATOR)?;
        debug!(round, %game_id, %winner, rolls = game.rolls.len(), "round finished");
    }

    let metrics = engine.metrics();
    info!(
        creator_wins,
        challenger_wins,
        rolls = metrics.rolls,
        paid_out = metrics.lamports_paid_out,
        "simulation finished"
    );
    println!("Games played:     {}", games);
    println!("Creator wins:     {}", creator_wins);
    println!("Challenger wins:  {}", challenger_wins);
    println!("Total rolls:      {}", metrics.rolls);
    println!("Elapsed:          {}s", metrics.uptime_secs);
    println!("{} balance: {}", CREATOR, engine.balance_of(CREATOR));
    println!("{} balance: {}", CHALLENGER, engine.balance_of(CHALLENGER));

    if let Some(path) = &config.storage.snapshot_path {
        save_snapshot(path, &engine.snapshot())?;
        println!("Snapshot written to {}", path.display());
    }
    Ok(())
}

fn inspect(path: &Path) -> CrapsResult<()> {
    let snapshot = load_snapshot(path)?;

    println!("Snapshot v{} taken at {}", snapshot.version, snapshot.taken_at);
    println!();
    println!("Balances ({} accounts):", snapshot.balances.len());
    for (account, balance) in &snapshot.balances {
        println!("  {:<20} {:>14}", account, balance);
    }
    println!();
    println!("Games ({}):", snapshot.games.len());
    for game in &snapshot.games {
        println!(
            "  {:<36} {:<10} bet={:<10} treasury={:<10} rolls={:<4} winner={}",
            game.id,
            game.status,
            game.bet_lamports,
            game.treasury_lamports,
            game.rolls.len(),
            game.winner.as_deref().unwrap_or("-"),
        );
    }
    println!();
    println!(
        "Funds: {} in accounts, {} in escrow",
        snapshot.total_balance(),
        snapshot.total_treasury()
    );
    Ok(())
}
