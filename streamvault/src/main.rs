//! streamvault - archive a filtered public stream into a document store
//!
//! Reads every setting from environment variables (optionally prefixed),
//! verifies the streaming credentials, prepares the storage table and then
//! stores each post from the filtered stream as it arrives.
//!
//! Startup failures exit non-zero. The end of the stream or Ctrl+C exits 0.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use streamvault_core::stream::{FilterParams, TwitterClient};
use streamvault_core::{archive, storage, Archiver, Config, TlsContext};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "streamvault")]
#[command(about = "Archive a filtered public stream into a document store")]
#[command(version)]
struct Args {
    /// Prefix prepended to every environment variable name (e.g. GTR_)
    #[arg(long, default_value = "")]
    env_prefix: String,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        Config::from_env(&args.env_prefix).context("failed to load configuration")?;
    match args.verbose {
        0 => {}
        1 => config.logging.level = "debug".to_string(),
        _ => config.logging.level = "trace".to_string(),
    }

    let _log_guard =
        streamvault_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        "streamvault starting"
    );
    config.log_summary();

    let tls = TlsContext::from_config(&config.storage).context("failed to load TLS material")?;

    let client =
        TwitterClient::new(&config.stream).context("failed to create streaming client")?;
    let archiver = Archiver::new(client, FilterParams::new(config.stream.track.clone()));

    // Set up signal handler for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        let _ = shutdown_tx.send(true);
    })
    .context("failed to set Ctrl+C handler")?;

    let result = archive(
        &archiver,
        storage::connect(&config.storage, tls.as_ref()),
        &config.storage.database,
        &config.storage.table,
        shutdown_rx,
    )
    .await;

    match result {
        Ok(stats) => {
            println!(
                "Archive complete: {} post(s) stored, {} failed, {} other item(s) discarded",
                stats.inserted, stats.insert_failures, stats.discarded
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, fatal = e.is_fatal(), "Archiving stopped");
            Err(e).context("archiving failed")
        }
    }
}
