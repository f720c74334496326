//! # streamvault-core
//!
//! Core library for streamvault - a filtered public stream archiver.
//!
//! This library provides:
//! - Configuration loaded from environment variables
//! - TLS client material for the storage connection
//! - The streaming client and stream item decoding
//! - Document storage backends (PostgreSQL, SQLite)
//! - The ingest loop and the startup sequence that drives it
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! A run is a straight line:
//! - **Startup:** load config, build TLS context, verify credentials,
//!   connect to storage, create database and table, open the stream
//! - **Steady state:** read one item, store it if it is a post, repeat
//!
//! Any startup failure is fatal. In the steady state, failures are logged
//! and the loop moves on.
//!
//! ## Example
//!
//! ```rust,no_run
//! use streamvault_core::stream::{FilterParams, TwitterClient};
//! use streamvault_core::{archive, storage, Archiver, Config, TlsContext};
//!
//! # async fn run() -> streamvault_core::Result<()> {
//! let config = Config::from_env("")?;
//! let tls = TlsContext::from_config(&config.storage)?;
//!
//! let client = TwitterClient::new(&config.stream)?;
//! let archiver = Archiver::new(client, FilterParams::new(config.stream.track.clone()));
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let stats = archive(
//!     &archiver,
//!     storage::connect(&config.storage, tls.as_ref()),
//!     &config.storage.database,
//!     &config.storage.table,
//!     shutdown_rx,
//! )
//! .await?;
//! println!("stored {} posts", stats.inserted);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use archive::{archive, Archiver};
pub use config::{Config, LoggingConfig, StorageBackend, StorageConfig, StreamConfig};
pub use error::{Error, Result};
pub use ingest::{IngestStats, LoopExit};
pub use storage::{DocumentStore, PostgresStore, SqliteStore};
pub use stream::{FilterParams, Post, StreamItem, StreamProvider};
pub use tls::TlsContext;

// Public modules
pub mod archive;
pub mod config;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod storage;
pub mod stream;
pub mod tls;
