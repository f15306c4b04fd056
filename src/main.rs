//! Vault Fetcher CLI application
//!
//! Command-line interface for snapshotting recorded streams from a media
//! vault into a JSON document.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use vodvault_fetcher::cli::{handle_auth, handle_snapshot, handle_sync, Cli, Commands};
use vodvault_fetcher::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(&cli);

    info!("Vault Fetcher v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        None => {
            info!("Executing sync command (default)");
            handle_sync(&cli.global, Default::default()).await
        }
        Some(Commands::Sync(args)) => {
            info!("Executing sync command");
            handle_sync(&cli.global, args).await
        }
        Some(Commands::Snapshot(args)) => {
            info!("Executing snapshot command");
            handle_snapshot(&cli.global, args).await
        }
        Some(Commands::Auth(args)) => {
            info!("Executing auth command");
            handle_auth(&cli.global, args).await
        }
    }
}

/// Initialize logging based on CLI verbosity settings
fn init_logging(cli: &Cli) {
    let log_level = cli.log_level();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("vodvault_fetcher={}", log_level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_level(cli.global.very_verbose) // Show levels only in very verbose mode
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
