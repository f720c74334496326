//! Ingestion loop
//!
//! Consumes an open [`ItemStream`] one item at a time. Posts are logged and
//! stored; everything else is dropped. The loop has a single steady state and
//! ends when the stream ends or the shutdown signal flips to `true`.

use std::future::Future;

use futures::StreamExt;
use tokio::sync::watch;

use crate::storage::DocumentStore;
use crate::stream::{ItemStream, StreamItem};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoopExit {
    /// The provider closed the stream
    #[default]
    StreamEnded,
    /// The shutdown signal was raised
    Cancelled,
}

/// Counters for one run of the loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Items decoded from the stream, posts and others
    pub received: u64,
    /// Items recognized as posts
    pub posts: u64,
    /// Non-post items dropped without a write
    pub discarded: u64,
    /// Posts written to storage
    pub inserted: u64,
    /// Posts whose write failed
    pub insert_failures: u64,
    /// Lines that failed to decode, plus a transport failure if one ended the stream
    pub stream_errors: u64,
    pub exit: LoopExit,
}

/// Await `fut` unless `shutdown` is raised first.
///
/// Returns `None` when the signal is (or becomes) `true`; `fut` is dropped
/// unfinished. A dropped sender never cancels.
pub async fn until_shutdown<F: Future>(
    fut: F,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<F::Output> {
    if *shutdown.borrow_and_update() {
        return None;
    }

    tokio::pin!(fut);
    let mut watching = true;

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed(), if watching => {
                match changed {
                    Ok(()) => {
                        if *shutdown.borrow_and_update() {
                            return None;
                        }
                    }
                    Err(_) => watching = false,
                }
            }

            output = &mut fut => return Some(output),
        }
    }
}

/// Run the loop until the stream ends or `shutdown` becomes `true`.
///
/// Insert failures are logged and counted; the loop moves on to the next
/// item. Shutdown is observed while waiting for an item and while an insert
/// is in flight; an interrupted insert counts as neither stored nor failed.
pub async fn run<S>(
    mut stream: ItemStream,
    store: &S,
    table: &str,
    mut shutdown: watch::Receiver<bool>,
) -> IngestStats
where
    S: DocumentStore + ?Sized,
{
    let mut stats = IngestStats::default();

    loop {
        let Some(next) = until_shutdown(stream.next(), &mut shutdown).await else {
            stats.exit = LoopExit::Cancelled;
            break;
        };

        match next {
            None => {
                tracing::info!("Stream closed by provider");
                stats.exit = LoopExit::StreamEnded;
                break;
            }
            Some(Ok(StreamItem::Post(post))) => {
                stats.received += 1;
                stats.posts += 1;
                tracing::info!("{:<15}: {}", post.author, post.text);

                match until_shutdown(store.insert(table, &post.raw), &mut shutdown).await {
                    Some(Ok(())) => stats.inserted += 1,
                    Some(Err(e)) => {
                        stats.insert_failures += 1;
                        tracing::error!(table, author = %post.author, error = %e, "Failed to store post");
                    }
                    None => {
                        tracing::warn!(author = %post.author, "Insert interrupted by shutdown");
                        stats.exit = LoopExit::Cancelled;
                        break;
                    }
                }
            }
            Some(Ok(StreamItem::Other(kind))) => {
                stats.received += 1;
                stats.discarded += 1;
                tracing::trace!(?kind, "Discarded non-post item");
            }
            Some(Err(e)) => {
                stats.stream_errors += 1;
                tracing::warn!(error = %e, "Skipping unreadable stream item");
            }
        }
    }

    if stats.exit == LoopExit::Cancelled {
        tracing::info!("Shutdown requested, leaving ingest loop");
    }
    log_summary(&stats);
    stats
}

fn log_summary(stats: &IngestStats) {
    tracing::info!(
        exit = ?stats.exit,
        received = stats.received,
        posts = stats.posts,
        discarded = stats.discarded,
        inserted = stats.inserted,
        insert_failures = stats.insert_failures,
        stream_errors = stats.stream_errors,
        "Ingest loop finished"
    );
}
