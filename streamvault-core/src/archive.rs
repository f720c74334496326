//! Startup sequence and run
//!
//! [`archive`] drives one archiving run: verify the streaming credentials,
//! connect to storage, prepare the database and table, open the filtered
//! stream and hand it to the ingest loop. Every step before the loop is
//! fatal on failure, and every step gives way to the shutdown signal.

use std::future::Future;

use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::ingest::{self, until_shutdown, IngestStats, LoopExit};
use crate::storage::{self, DocumentStore};
use crate::stream::{FilterParams, ItemStream, StreamProvider};

/// A streaming provider paired with the subscription it should open
pub struct Archiver<P> {
    provider: P,
    filter: FilterParams,
}

impl<P: StreamProvider> Archiver<P> {
    pub fn new(provider: P, filter: FilterParams) -> Self {
        Self { provider, filter }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Verify credentials; a rejection is [`Error::InvalidCredentials`]
    pub async fn verify(&self) -> Result<()> {
        match self.provider.verify_credentials().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::InvalidCredentials(
                "provider rejected the configured credentials".to_string(),
            )),
            Err(e) => Err(Error::InvalidCredentials(format!(
                "unable to verify credentials: {}",
                e
            ))),
        }
    }

    /// Open the filtered stream
    pub async fn open(&self) -> Result<ItemStream> {
        if self.filter.track.is_empty() {
            tracing::warn!("No track terms configured; opening an unfiltered subscription");
        }
        tracing::info!(track = ?self.filter.track, "Opening filtered stream");
        self.provider.open_filtered_stream(&self.filter).await
    }
}

/// Run the full startup sequence, then ingest until the stream ends or
/// `shutdown` is raised.
///
/// `connect` is only awaited after the credentials verify, so a rejected
/// login never touches storage. Storage and stream failures come back as
/// [`Error::Startup`]. Raising `shutdown` before the loop starts abandons
/// the pending step and returns stats with [`LoopExit::Cancelled`].
pub async fn archive<P, S, C>(
    archiver: &Archiver<P>,
    connect: C,
    database: &str,
    table: &str,
    mut shutdown: watch::Receiver<bool>,
) -> Result<IngestStats>
where
    P: StreamProvider,
    S: DocumentStore,
    C: Future<Output = Result<S>>,
{
    let Some(verified) = until_shutdown(archiver.verify(), &mut shutdown).await else {
        return Ok(cancelled("credential verification"));
    };
    verified?;

    let Some(connected) = until_shutdown(connect, &mut shutdown).await else {
        return Ok(cancelled("storage connect"));
    };
    let store = connected.map_err(|e| Error::startup("storage connect", e))?;
    tracing::info!(backend = store.backend(), "Storage session established");

    if until_shutdown(storage::prepare(&store, database, table), &mut shutdown)
        .await
        .is_none()
    {
        return Ok(cancelled("storage prepare"));
    }

    let Some(opened) = until_shutdown(archiver.open(), &mut shutdown).await else {
        return Ok(cancelled("stream open"));
    };
    let stream = opened.map_err(|e| Error::startup("stream open", e))?;

    Ok(ingest::run(stream, &store, table, shutdown).await)
}

fn cancelled(step: &str) -> IngestStats {
    tracing::info!(step, "Shutdown requested during startup");
    IngestStats {
        exit: LoopExit::Cancelled,
        ..Default::default()
    }
}
