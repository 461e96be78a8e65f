//! Main entry point for the pairwise-ranker CLI
//!
//! Lists the images in a folder, opens a rating session for that folder and
//! runs an interactive comparison loop on the terminal. Displaying the images
//! is left to the user's viewer of choice; the CLI prints their file names.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use pairwise_ranker::config::AppConfig;
use pairwise_ranker::metrics::MetricsCollector;
use pairwise_ranker::rating::JsonFileGateway;
use pairwise_ranker::source::{list_image_ids, namespace_for, resolve_folder};
use pairwise_ranker::utils::{format_ranking_row, format_rating_change};
use pairwise_ranker::{RankedItem, RankerError, RankingSession, RatingStore, SelectionMode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};

/// Pairwise Ranker - rate images by comparing them two at a time
#[derive(Parser)]
#[command(
    name = "pairwise-ranker",
    version,
    about = "Rate a folder of images by repeatedly picking the better of two",
    long_about = "Pairwise Ranker shows two images at a time, records which one you prefer, \
                 and maintains a Glicko-2 rating for every image. The most uncertain image is \
                 always compared next, against an opponent of similar rating."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        global = true,
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        global = true,
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Data directory override
    #[arg(long, value_name = "DIR", global = true, help = "Override ratings data directory")]
    data_dir: Option<PathBuf>,

    /// Selection seed override
    #[arg(long, value_name = "SEED", global = true, help = "Seed opponent selection")]
    seed: Option<u64>,

    /// Enable debug mode
    #[arg(short, long, global = true, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Compare the images in a folder interactively
    Rate {
        /// Folder containing the images; defaults to the last used folder
        folder: Option<PathBuf>,

        /// Selection mode (standard, high-elo, elite-tier)
        #[arg(short, long, default_value = "standard")]
        mode: SelectionMode,
    },

    /// Print the current rankings of a folder
    Rankings {
        /// Folder containing the images; defaults to the last used folder
        folder: Option<PathBuf>,
    },
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from file/environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }

    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    if let Some(data_dir) = &args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }

    if let Some(seed) = args.seed {
        config.matchmaking.seed = Some(seed);
    }

    pairwise_ranker::config::validate_config(&config)?;
    Ok(config)
}

fn folder_namespace(folder: &Path) -> Result<String> {
    namespace_for(folder)
        .ok_or_else(|| anyhow!("Could not determine folder name for {}", folder.display()))
}

fn print_rankings(items: &[RankedItem]) {
    if items.is_empty() {
        println!("No images to rank.");
        return;
    }
    for (position, item) in items.iter().enumerate() {
        println!("{}", format_ranking_row(position + 1, item));
    }
}

fn print_pair(session: &RankingSession) -> Result<()> {
    match session.current_items()? {
        Some((left, right)) => {
            println!();
            println!(
                "  [1] {}  (rating {:.0} ± {:.0})",
                left.id, left.stats.rating, left.stats.rd
            );
            println!(
                "  [2] {}  (rating {:.0} ± {:.0})",
                right.id, right.stats.rating, right.stats.rd
            );
        }
        None => println!("No pair available."),
    }
    Ok(())
}

fn print_help() {
    println!("Commands: 1/2 pick the winner, s skip, u undo, r rankings, m <mode> switch mode, q quit");
}

/// Decide the current pair in favor of the item at `choice` (0 = left)
fn decide(session: &RankingSession, choice: usize) -> Result<()> {
    let Some((left, right)) = session.current_items()? else {
        println!("No pair to rate.");
        return Ok(());
    };
    let (winner, loser) = if choice == 0 {
        (left, right)
    } else {
        (right, left)
    };

    let outcome = session.record_decision(&winner.id, &loser.id)?;
    println!(
        "Rating change: {} ({} now {:.0})",
        format_rating_change(outcome.winner_delta),
        outcome.winner.id,
        outcome.winner.stats.rating
    );
    if outcome.next_pair.is_none() {
        println!("Not enough images left to compare.");
    }
    Ok(())
}

async fn run_rate(
    config: &AppConfig,
    folder: Option<&Path>,
    mut mode: SelectionMode,
) -> Result<()> {
    let folder = resolve_folder(&config.storage.data_dir, folder).await?;
    let ids = list_image_ids(&folder).await?;
    let namespace = folder_namespace(&folder)?;
    let gateway = Arc::new(JsonFileGateway::open(&config.storage.data_dir, &namespace).await?);
    let metrics = Arc::new(MetricsCollector::new()?);

    let session = RankingSession::open(namespace.clone(), ids, gateway, config, metrics).await?;
    println!(
        "Loaded {} images from {}",
        session.with_store(|store| store.len())?,
        namespace
    );

    match session.select_next(mode) {
        Ok(_) => print_pair(&session)?,
        Err(RankerError::InsufficientPool { .. }) => {
            println!("Fewer than 2 images found.");
            return session.close().await;
        }
        Err(e) => return Err(e.into()),
    }
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("1") => decide(&session, 0)?,
            Some("2") => decide(&session, 1)?,
            Some("s") => {
                if let Err(e) = session.select_next(mode) {
                    println!("{}", e);
                }
            }
            Some("u") => match session.undo() {
                Ok(_) => println!("Last rating undone."),
                Err(RankerError::EmptyUndo) => println!("Nothing to undo."),
                Err(e) => return Err(e.into()),
            },
            Some("r") => print_rankings(&session.rankings()?),
            Some("m") => match parts.next().map(str::parse::<SelectionMode>) {
                Some(Ok(new_mode)) => {
                    mode = new_mode;
                    println!("Mode: {}", mode);
                    if let Err(e) = session.select_next(mode) {
                        println!("{}", e);
                    }
                }
                Some(Err(e)) => println!("{}", e),
                None => println!("Usage: m <standard|high-elo|elite-tier>"),
            },
            Some("q") => break,
            Some(_) => print_help(),
            None => continue,
        }
        print_pair(&session)?;
    }

    debug!("Session metrics:\n{}", session.metrics().render()?);
    session.close().await
}

async fn run_rankings(config: &AppConfig, folder: Option<&Path>) -> Result<()> {
    let folder = resolve_folder(&config.storage.data_dir, folder).await?;
    let ids = list_image_ids(&folder).await?;
    let namespace = folder_namespace(&folder)?;
    let gateway = JsonFileGateway::open(&config.storage.data_dir, &namespace).await?;

    let stored: HashMap<String, _> = gateway
        .all_records()
        .await
        .into_iter()
        .map(|record| (record.item_id, record.stats))
        .collect();

    let mut store = RatingStore::default();
    store.initialize_pool(ids, |id| stored.get(id).copied());
    let ranked: Vec<RankedItem> = store.ranked_view().iter().cloned().collect();
    print_rankings(&ranked);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration (CLI args can override environment/config file)
    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    // Initialize logging early (before any other operations)
    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!(
        "Starting {} v{}",
        config.service.name,
        pairwise_ranker::VERSION
    );

    if args.dry_run {
        info!("Configuration validation successful");
        info!("   Data dir: {}", config.storage.data_dir.display());
        info!(
            "   Thresholds: HighElo {} / EliteTier {}",
            config.matchmaking.high_elo_threshold, config.matchmaking.elite_tier_threshold
        );
        return Ok(());
    }

    let result = match &args.command {
        Some(Command::Rate { folder, mode }) => {
            run_rate(&config, folder.as_deref(), *mode).await
        }
        Some(Command::Rankings { folder }) => run_rankings(&config, folder.as_deref()).await,
        None => {
            println!("Nothing to do; see --help");
            Ok(())
        }
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}
