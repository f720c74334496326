//! Document storage
//!
//! Posts are stored as JSON documents, one row per post, in a table that
//! lives inside a named database. Backends implement [`DocumentStore`]:
//!
//! - [`PostgresStore`]: the database name is a schema; documents are `JSONB`
//! - [`SqliteStore`]: the database name is an attached file; documents are
//!   JSON text
//!
//! Each insert is an independent write with no transaction around it.

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::Result;
use crate::tls::TlsContext;
use async_trait::async_trait;
use serde_json::Value;

/// Storage backend capabilities
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend name for diagnostics
    fn backend(&self) -> &'static str;

    /// Create the named database. Fails if it already exists.
    async fn create_database(&self, name: &str) -> Result<()>;

    /// Create the named table. Fails if it already exists.
    async fn create_table(&self, name: &str) -> Result<()>;

    /// Insert one document
    async fn insert(&self, table: &str, document: &Value) -> Result<()>;
}

#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for Box<T> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        (**self).create_database(name).await
    }

    async fn create_table(&self, name: &str) -> Result<()> {
        (**self).create_table(name).await
    }

    async fn insert(&self, table: &str, document: &Value) -> Result<()> {
        (**self).insert(table, document).await
    }
}

/// Open a storage session for the configured backend.
///
/// Connection failure is returned as-is; callers treat it as fatal.
pub async fn connect(
    config: &StorageConfig,
    tls: Option<&TlsContext>,
) -> Result<Box<dyn DocumentStore>> {
    tracing::info!(
        backend = %config.backend,
        address = %config.address(),
        database = %config.database,
        tls = tls.is_some(),
        "Connecting to storage"
    );

    match config.backend {
        StorageBackend::Postgres => Ok(Box::new(PostgresStore::connect(config, tls).await?)),
        StorageBackend::Sqlite => {
            if tls.is_some() {
                tracing::warn!("TLS material is ignored by the sqlite backend");
            }
            Ok(Box::new(SqliteStore::open(config)?))
        }
    }
}

/// Create the database, then the table.
///
/// Every creation error is logged and ignored: on a steady-state restart both
/// already exist, and a real problem shows up again on the first insert.
pub async fn prepare<S: DocumentStore + ?Sized>(store: &S, database: &str, table: &str) {
    match store.create_database(database).await {
        Ok(()) => tracing::info!(database, "Created database"),
        Err(e) => tracing::warn!(database, error = %e, "Unable to create database"),
    }

    match store.create_table(table).await {
        Ok(()) => tracing::info!(table, "Created table"),
        Err(e) => tracing::warn!(table, error = %e, "Unable to create table"),
    }
}

/// Quote an identifier for SQL (both backends use double quotes)
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("tweets"), "\"tweets\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[tokio::test]
    async fn test_connect_sqlite_backend() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            backend: StorageBackend::Sqlite,
            database: "archive".to_string(),
            data_dir: temp.path().to_path_buf(),
            ..Default::default()
        };

        let store = connect(&config, None).await.unwrap();
        assert_eq!(store.backend(), "sqlite");
    }

    #[tokio::test]
    async fn test_prepare_tolerates_existing_objects() {
        let store = SqliteStore::open_in_memory("archive").unwrap();
        prepare(&store, "archive", "tweets").await;
        prepare(&store, "archive", "tweets").await;

        store
            .insert("tweets", &serde_json::json!({"text": "still writable"}))
            .await
            .unwrap();
        assert_eq!(store.count("tweets").unwrap(), 1);
    }
}
