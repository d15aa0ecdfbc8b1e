//! Command-line entry point for the Pickup Room engine
//!
//! Runs one session end to end against in-memory stores: queue a pool, form
//! teams, reshuffle, and optionally report a result and print rating changes.

use anyhow::{Context, Result};
use clap::Parser;
use pickup_room::config::AppConfig;
use pickup_room::metrics::MetricsCollector;
use pickup_room::rating::InMemoryRatingStorage;
use pickup_room::session::{InMemorySessionRepository, SessionManager};
use pickup_room::types::{Outcome, Player, PlayerRating, Position, Role, TeamsAnnounced};
use pickup_room::MatchmakingError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Pickup Room - role-constrained team balancing for pickup sessions
#[derive(Parser)]
#[command(
    name = "pickup-room",
    version,
    about = "Split a queue into two balanced, role-complete teams",
    long_about = "Pickup Room forms two teams from a queued pool, honouring offense/chase/home \
                 slot counts, ranks every split by TrueSkill balance, reshuffles without ever \
                 repeating a team, and applies rating updates once a result is reported."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Enable debug mode
    #[arg(short, long, help = "Enable debug mode with verbose logging")]
    debug: bool,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without forming teams")]
    dry_run: bool,

    /// Pool file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "TOML file with [[players]] entries; a generated pool is used when absent"
    )]
    pool: Option<PathBuf>,

    /// Number of reshuffles to request after the first formation
    #[arg(short, long, default_value_t = 0)]
    reshuffles: u32,

    /// Result to report once teams are final (a, b, tie)
    #[arg(short, long, value_name = "OUTCOME")]
    outcome: Option<Outcome>,

    /// Seed for captain draws and the generated pool
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PoolFile {
    players: Vec<Player>,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load and merge configuration from environment and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };

    if let Some(log_level) = &args.log_level {
        config.service.log_level = log_level.clone();
    }
    if args.debug {
        config.service.log_level = "debug".to_string();
    }

    pickup_room::config::validate_config(&config)?;
    Ok(config)
}

fn display_startup_banner(config: &AppConfig) {
    let requirement = config.matchmaking.role_requirement();
    info!("Pickup Room {}", pickup_room::VERSION);
    info!("   Queue: {}", config.service.queue_name);
    info!(
        "   Roles per team: offense {}, chase {}, home {}",
        requirement.offense, requirement.chase, requirement.home
    );
    info!("   Max reshuffles: {}", config.matchmaking.max_reshuffles);
    info!("   Role policy: {:?}", config.matchmaking.role_policy());
}

fn load_pool(path: &Path) -> Result<Vec<Player>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read pool file {}", path.display()))?;
    let pool: PoolFile = toml::from_str(&contents)
        .with_context(|| format!("Invalid pool file {}", path.display()))?;
    Ok(pool.players)
}

/// One specialist per slot on a single team, the rest flexible
fn generate_pool(config: &AppConfig, rng: &mut impl Rng) -> Vec<Player> {
    let requirement = config.matchmaking.role_requirement();
    let specialists = Role::ALL
        .into_iter()
        .flat_map(|role| std::iter::repeat(Position::from(role)).take(requirement.count(role)));
    let positions: Vec<Position> = specialists
        .chain(std::iter::repeat(Position::Flexible))
        .take(requirement.pool_size())
        .collect();

    positions
        .into_iter()
        .enumerate()
        .map(|(index, position)| {
            let id = format!("player-{:02}", index + 1);
            let rating = PlayerRating {
                rating: rng.gen_range(15.0..35.0),
                uncertainty: rng.gen_range(2.0..8.0),
            };
            Player::new(id.clone(), id, rating, position)
        })
        .collect()
}

fn print_announcement(announced: &TeamsAnnounced) {
    println!(
        "Split #{} (score {:.3})",
        announced.reshuffle_count, announced.score
    );
    for (label, team) in [("A", &announced.team_a), ("B", &announced.team_b)] {
        println!("  Team {}:", label);
        for entry in team {
            let marker = if entry.is_captain { " (captain)" } else { "" };
            println!(
                "    {:<8} {}{}",
                entry.role.to_string(),
                entry.display_name,
                marker
            );
        }
    }
}

async fn run(config: AppConfig, args: &Args) -> Result<()> {
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let pool = match &args.pool {
        Some(path) => load_pool(path)?,
        None => generate_pool(&config, &mut rng),
    };
    info!("Loaded pool of {} players", pool.len());

    let queue = config.service.queue_name.clone();
    let repository = Arc::new(InMemorySessionRepository::new());
    for player in pool {
        if !repository.enqueue(&queue, player.clone())? {
            warn!("Player '{}' is already queued, skipping", player.id);
        }
    }

    let metrics = Arc::new(MetricsCollector::new()?);
    let manager = SessionManager::new(
        Arc::new(config.build_engine()?),
        repository,
        Arc::new(InMemoryRatingStorage::new()),
        metrics.clone(),
        config.matchmaking.max_reshuffles,
    );

    let session_id = manager.open_session(&queue).await?;
    let announced = manager.form_teams(session_id, &mut rng).await?;
    print_announcement(&announced);

    for _ in 0..args.reshuffles {
        match manager.reshuffle(session_id, &mut rng).await {
            Ok(announced) => print_announcement(&announced),
            Err(e) => {
                match e.downcast_ref::<MatchmakingError>() {
                    Some(MatchmakingError::ReshuffleLimitReached { .. })
                    | Some(MatchmakingError::HistoryExhausted) => {
                        warn!("Reshuffle refused: {}", e);
                    }
                    _ => return Err(e),
                }
                break;
            }
        }
    }

    if let Some(outcome) = args.outcome {
        manager.start(session_id).await?;
        let update = manager.report_result(session_id, outcome).await?;

        println!(
            "Result: {} (match quality {:.3})",
            outcome, update.match_quality
        );
        for change in &update.changes {
            println!(
                "  {} {:<12} {:>6.2} -> {:>6.2}  (sigma {:.2} -> {:.2})",
                change.side,
                change.player_id,
                change.old_rating.rating,
                change.new_rating.rating,
                change.old_rating.uncertainty,
                change.new_rating.uncertainty
            );
        }
    }

    tracing::debug!("Metrics snapshot:\n{}", metrics.render()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {:#}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.service.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    display_startup_banner(&config);

    if args.dry_run {
        info!("Configuration validation successful");
        return Ok(());
    }

    run(config, &args).await
}
