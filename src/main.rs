//! Button Trawler main entry point
//!
//! This is the command-line interface for the Button Trawler crawler.

use anyhow::Context;
use button_trawler::config::{load_config_with_hash, Config};
use button_trawler::crawler::Coordinator;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Button Trawler: a polite crawler for 88x31 buttons
///
/// Without a subcommand the crawler sweeps pending websites forever,
/// following the buttons and links it finds to new sites.
#[derive(Parser, Debug)]
#[command(name = "button-trawler")]
#[command(version)]
#[command(about = "A polite crawler for 88x31 buttons", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a single website now, even if it was scraped before
    Run {
        /// Hostname or root URL of the website
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show statistics from the database and exit
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    match cli.command {
        Some(Command::Run { url }) => handle_run(config, &url).await,
        Some(Command::Stats) => handle_stats(&config),
        None => handle_sweep(config).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("button_trawler=info,warn"),
            1 => EnvFilter::new("button_trawler=debug,info"),
            2 => EnvFilter::new("button_trawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the `stats` subcommand: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use button_trawler::output::{load_statistics, print_statistics};
    use button_trawler::storage::SqliteStorage;
    use std::path::Path;

    println!("Database: {}\n", config.output.database_path);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the `run` subcommand: crawls one website and prints its report
async fn handle_run(config: Config, url: &str) -> anyhow::Result<()> {
    let coordinator = Coordinator::new(config)?;
    let report = coordinator
        .run_single(url)
        .await
        .with_context(|| format!("crawl of {} failed", url))?;

    println!("{} ({:?})", report.hostname, report.outcome);
    println!("  Pages fetched: {}", report.pages_fetched);
    println!("  Pages recorded: {}", report.pages_recorded);
    println!("  Pages disallowed: {}", report.pages_disallowed);
    println!("  Pages failed: {}", report.pages_failed);
    println!(
        "  Buttons: {} ({} new)",
        report.buttons_found, report.buttons_new
    );
    println!("  Websites discovered: {}", report.websites_discovered);

    Ok(())
}

/// Handles the default mode: sweeps pending websites forever
async fn handle_sweep(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Sweeping with {} workers, {} seed(s)",
        config.crawler.concurrent_sites,
        config.seeds.len()
    );

    let coordinator = Coordinator::new(config)?;
    coordinator.run_forever().await?;
    Ok(())
}
