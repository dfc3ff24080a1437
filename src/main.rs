use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use hoopstats_loader::api::balldontlie::BallDontLieClient;
use hoopstats_loader::api::StatsApi;
use hoopstats_loader::config::{AppConfig, Secrets, DEFAULT_CONFIG_PATH};
use hoopstats_loader::db::store::Store;
use hoopstats_loader::etl::advanced::load_advanced_stats;
use hoopstats_loader::etl::pipeline::BoxScorePipeline;
use hoopstats_loader::etl::reference::{load_players, load_teams};
use hoopstats_loader::etl::transform::flatten_box_scores;
use hoopstats_loader::monitoring::logger;

#[derive(Debug, Parser)]
#[command(name = "hoopstats", about = "Load NBA statistics from balldontlie into SQLite")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Human-readable logs instead of JSON.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database schema, reporting which tables already existed.
    InitDb,
    /// Fetch box scores for one date and report what came back. Writes nothing.
    CheckApi {
        #[arg(long, default_value = "2019-02-14")]
        date: NaiveDate,
    },
    /// Load every team.
    Teams,
    /// Load every player.
    Players,
    /// Load advanced stats for the given seasons (default: configured seasons).
    Advanced {
        #[arg(long = "season")]
        seasons: Vec<i32>,
    },
    /// Load box scores for every game date already in the database.
    BoxScores {
        #[arg(long)]
        workers: Option<usize>,
        /// Skip dates that already have box score rows.
        #[arg(long)]
        pending_only: bool,
    },
    /// Print row counts per table.
    Status,
    /// init-db, teams, advanced, then box-scores.
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, secrets) = AppConfig::load(&cli.config)?;

    logger::init_logging(&config.monitoring, cli.pretty)?;

    tracing::info!(
        command = ?cli.command,
        database = %config.database.path,
        "hoopstats starting"
    );

    match cli.command {
        Command::InitDb => init_db(&config).await,
        Command::CheckApi { date } => check_api(&config, secrets, date).await,
        Command::Teams => {
            let (api, store) = connect(&config, secrets).await?;
            load_teams(api.as_ref(), &store).await?;
            Ok(())
        }
        Command::Players => {
            let (api, store) = connect(&config, secrets).await?;
            load_players(api.as_ref(), &store).await?;
            Ok(())
        }
        Command::Advanced { seasons } => {
            let (api, store) = connect(&config, secrets).await?;
            let seasons = if seasons.is_empty() {
                config.pipeline.seasons.clone()
            } else {
                seasons
            };
            run_advanced(api.as_ref(), &store, &seasons).await
        }
        Command::BoxScores {
            workers,
            pending_only,
        } => {
            let (api, store) = connect(&config, secrets).await?;
            let workers = workers.unwrap_or(config.pipeline.workers);
            run_box_scores(api, store, workers, pending_only).await
        }
        Command::Status => status(&config).await,
        Command::All => {
            init_db(&config).await?;
            let (api, store) = connect(&config, secrets).await?;
            load_teams(api.as_ref(), &store).await?;
            run_advanced(api.as_ref(), &store, &config.pipeline.seasons).await?;
            run_box_scores(api, store, config.pipeline.workers, false).await
        }
    }
}

fn build_client(config: &AppConfig, secrets: Secrets) -> Result<Arc<dyn StatsApi>> {
    let api_key = secrets
        .api_key
        .context("API_KEY is not set (environment or .env)")?;
    Ok(Arc::new(BallDontLieClient::new(config, api_key)?))
}

async fn connect(config: &AppConfig, secrets: Secrets) -> Result<(Arc<dyn StatsApi>, Store)> {
    let api = build_client(config, secrets)?;
    let store = Store::new(&config.database).await?;
    Ok((api, store))
}

async fn init_db(config: &AppConfig) -> Result<()> {
    let store = Store::connect(&config.database).await?;
    let report = store.bootstrap().await?;
    for (table, status) in report {
        println!("Table '{table}' {status}.");
    }
    println!("Database '{}' ready.", config.database.path);
    Ok(())
}

async fn check_api(config: &AppConfig, secrets: Secrets, date: NaiveDate) -> Result<()> {
    let api = build_client(config, secrets)?;
    let games = api
        .box_scores(date)
        .await
        .with_context(|| format!("Box score request for {date} failed"))?;
    let batch = flatten_box_scores(date, &games);

    tracing::info!(
        date = %date,
        games = games.len(),
        teams = batch.teams.len(),
        player_lines = batch.lines.len(),
        "API reachable"
    );
    println!(
        "{date}: {} games, {} player lines",
        games.len(),
        batch.lines.len()
    );
    Ok(())
}

async fn run_advanced(api: &dyn StatsApi, store: &Store, seasons: &[i32]) -> Result<()> {
    let summaries = load_advanced_stats(api, store, seasons).await?;
    for s in &summaries {
        println!(
            "Season {}: {} pages, {} records, {} new rows{}",
            s.season,
            s.pages,
            s.records,
            s.rows_inserted,
            if s.complete { "" } else { " (incomplete)" }
        );
    }
    Ok(())
}

async fn run_box_scores(
    api: Arc<dyn StatsApi>,
    store: Store,
    workers: usize,
    pending_only: bool,
) -> Result<()> {
    let dates = if pending_only {
        store.pending_box_score_dates().await?
    } else {
        store.distinct_game_dates().await?
    };

    if dates.is_empty() {
        tracing::warn!("No game dates found; load advanced stats first");
        return Ok(());
    }

    let pipeline = BoxScorePipeline::new(api, store, workers);
    let report = pipeline.run(dates).await?;

    println!("\n{report}");
    if !report.is_complete() {
        tracing::warn!(failed = report.failed.len(), "Box score load finished with failures");
    }
    Ok(())
}

async fn status(config: &AppConfig) -> Result<()> {
    let store = Store::connect_existing(&config.database)
        .await
        .with_context(|| format!("No database at {}; run init-db first", config.database.path))?;
    for (table, count) in store.table_counts().await? {
        match count {
            Some(count) => println!("{table:<12} {count}"),
            None => println!("{table:<12} missing"),
        }
    }
    Ok(())
}
