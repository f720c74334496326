//! Error types for streamvault-core

use thiserror::Error;

/// Main error type for the streamvault-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// TLS material could not be read or parsed
    #[error("TLS error: {0}")]
    Tls(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Streaming credentials were rejected or could not be checked
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Streaming API error
    #[error("stream error: {0}")]
    Stream(String),

    /// Storage backend error
    #[error("storage error: {0}")]
    Storage(String),

    /// SQLite error
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[error("database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A startup step failed and the run cannot begin
    #[error("{step} failed: {source}")]
    Startup {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Mark an error as the failure of a startup step
    pub fn startup(step: &'static str, source: Error) -> Self {
        match source {
            already @ Error::Startup { .. } => already,
            source => Error::Startup {
                step,
                source: Box::new(source),
            },
        }
    }

    /// Whether this error aborts the run.
    ///
    /// Stream and storage errors are fatal only when a startup step returns
    /// them, in which case they arrive wrapped in [`Error::Startup`]. Raised
    /// from inside the ingestion loop they are logged and skipped instead;
    /// see [`crate::ingest::run`].
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Tls(_)
                | Error::InvalidCredentials(_)
                | Error::Io(_)
                | Error::Startup { .. }
        )
    }

    /// The underlying error, unwrapping any startup step
    pub fn root(&self) -> &Error {
        match self {
            Error::Startup { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type alias for streamvault-core
pub type Result<T> = std::result::Result<T, Error>;
