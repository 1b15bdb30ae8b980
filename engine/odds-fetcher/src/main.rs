use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use odds_engine::{NoLogos, OutcomeSlot, Presenter};
use odds_fetcher::{initialize_logging_with_config, FetcherConfig, FetcherScheduler, HttpFeedSource};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "odds-fetcher", about = "Fetch bookmaker odds and price synthetic tiers")]
struct Args {
    /// Configuration file (TOML, JSON or YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refresh once, print match cards as JSON and exit
    #[arg(long)]
    once: bool,

    /// Print completed matches from the historical feed and exit
    #[arg(long, conflicts_with = "once")]
    historical: bool,

    /// Order bookmaker rows by an outcome column (home, draw, away)
    #[arg(long)]
    sort: Option<OutcomeSlot>,

    /// Show every bookmaker row instead of the first few
    #[arg(long)]
    expand: bool,

    /// Teams to list first (repeatable)
    #[arg(long = "follow")]
    followed: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = FetcherConfig::load(args.config.as_deref())?;
    initialize_logging_with_config(&config.logging.level, &config.logging.format)?;

    info!("Starting Odds Fetcher v{}", env!("CARGO_PKG_VERSION"));

    let source = HttpFeedSource::new(config.feeds.clone(), config.api_key()).context("Failed to create HTTP client")?;
    let scheduler = FetcherScheduler::new(&config, Arc::new(source), args.sort)?;

    if args.historical {
        let matches = scheduler.fetch_historical().await?;
        println!("{}", serde_json::to_string_pretty(&matches)?);
        return Ok(());
    }

    if args.once {
        let event = scheduler.refresh_once().await;
        if event.is_failure() {
            anyhow::bail!("Refresh failed: {:?}", event);
        }

        let Some(snapshot) = scheduler.cell().current().await else {
            anyhow::bail!("Refresh produced no snapshot");
        };

        let followed: HashSet<String> = args.followed.iter().map(|team| team.trim().to_lowercase()).collect();
        let mut presenter = Presenter::new(&config.engine, NoLogos, followed);
        let cards = presenter.cards(&snapshot.pairs(), Utc::now(), args.expand);
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }

    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl+C signal: {}", e);
                return;
            }
            info!("Ctrl+C signal received");
            scheduler.shutdown();
        });
    }

    if let Err(e) = scheduler.start().await {
        error!("Scheduler failed: {}", e);
        return Err(e);
    }

    info!("Odds Fetcher shutdown complete");
    Ok(())
}
