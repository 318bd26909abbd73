//! Wikigrove main entry point
//!
//! This is the command-line interface for the Wikigrove category-tree crawler.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wikigrove::config::load_config_with_hash;
use wikigrove::crawler::crawl;
use wikigrove::CrawlError;

/// Wikigrove: a level-synchronized category-tree crawler
///
/// Wikigrove walks a wiki's category tree breadth first, downloads every
/// article it finds into a numbered directory tree, and writes one CSV
/// manifest describing the whole crawl.
#[derive(Parser, Debug)]
#[command(name = "wikigrove")]
#[command(version)]
#[command(about = "A level-synchronized category-tree crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without fetching
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Crawler started");

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => (cfg, hash),
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::from(1);
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return ExitCode::SUCCESS;
    }

    match crawl(config).await {
        Ok(()) => {
            tracing::info!("Crawler finished");
            ExitCode::SUCCESS
        }
        Err(e @ CrawlError::EmptyCategory { .. }) => {
            tracing::error!("Crawl aborted: {}", e);
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            ExitCode::from(1)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikigrove=info,warn"),
            1 => EnvFilter::new("wikigrove=debug,info"),
            2 => EnvFilter::new("wikigrove=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &wikigrove::config::Config) {
    println!("=== Wikigrove Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Worker pool size: {}", config.crawl.parallel_task_count);
    println!(
        "  Request delay: {}s per page",
        config.crawl.request_delay_seconds
    );
    println!("  Max pages per level: {}", config.crawl.max_pages_per_level);
    println!(
        "  Scheduler poll interval: {}ms",
        config.crawl.scheduler_poll_interval_ms
    );

    println!("\nAPI:");
    println!("  Endpoint: {}", config.api.endpoint);
    println!("  Article base: {}", config.api.article_base);
    println!("  Category prefix: {}", config.api.category_prefix);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Manifest: {}", config.output.csv_filename);

    println!("\nRoot Categories ({}):", config.crawl.categories.len());
    for (index, category) in config.crawl.categories.iter().enumerate() {
        println!(
            "  {:02}_ {}{}",
            index,
            config.api.category_prefix,
            category.trim()
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} root categor{}",
        config.crawl.categories.len(),
        if config.crawl.categories.len() == 1 {
            "y"
        } else {
            "ies"
        }
    );
}
