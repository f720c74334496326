//! PostgreSQL document store
//!
//! The session logs in to an existing database (`CONNECT_DATABASE`, default
//! `postgres`). The archive's database name is a schema inside it:
//! `create_database` creates the schema and tables are created there, so a
//! fresh server needs nothing created up front. Documents are kept as
//! `JSONB`, exactly as received.

use crate::config::{StorageConfig, DEFAULT_CONNECT_DATABASE};
use crate::error::{Error, Result};
use crate::tls::TlsContext;
use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;

use super::{quote_ident, DocumentStore};

/// Document store backed by a PostgreSQL connection
pub struct PostgresStore {
    client: Client,
    schema: String,
    connection: JoinHandle<()>,
}

impl PostgresStore {
    /// Connect with the configured address and credentials.
    ///
    /// With a TLS context the connection uses rustls and presents the client
    /// certificate; without one it is plaintext.
    pub async fn connect(config: &StorageConfig, tls: Option<&TlsContext>) -> Result<Self> {
        let pg = connection_config(config)?;

        let (client, connection) = match tls {
            Some(context) => {
                let connector = MakeRustlsConnect::new(context.client_config().clone());
                let (client, connection) = pg.connect(connector).await?;
                let handle = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("PostgreSQL connection error: {}", e);
                    }
                });
                (client, handle)
            }
            None => {
                let (client, connection) = pg.connect(NoTls).await?;
                let handle = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        tracing::error!("PostgreSQL connection error: {}", e);
                    }
                });
                (client, handle)
            }
        };

        tracing::info!(address = %config.address(), "Connected to PostgreSQL");

        Ok(Self {
            client,
            schema: config.database.clone(),
            connection,
        })
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(table))
    }

    /// All documents in a table, in insertion order
    pub async fn documents(&self, table: &str) -> Result<Vec<Value>> {
        let rows = self
            .client
            .query(
                &format!("SELECT doc FROM {} ORDER BY id", self.qualified(table)),
                &[],
            )
            .await?;

        Ok(rows.iter().map(|row| row.get::<_, Value>(0)).collect())
    }
}

impl Drop for PostgresStore {
    fn drop(&mut self) {
        self.connection.abort();
    }
}

fn connection_config(config: &StorageConfig) -> Result<tokio_postgres::Config> {
    let mut pg = tokio_postgres::Config::new();
    pg.host(&config.host)
        .user(&config.username)
        .password(&config.password)
        .application_name("streamvault");

    if config.connect_database.is_empty() {
        pg.dbname(DEFAULT_CONNECT_DATABASE);
    } else {
        pg.dbname(&config.connect_database);
    }

    if !config.port.is_empty() {
        let port: u16 = config
            .port
            .parse()
            .map_err(|_| Error::Config(format!("invalid port '{}'", config.port)))?;
        pg.port(port);
    }

    Ok(pg)
}

#[async_trait]
impl DocumentStore for PostgresStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        self.client
            .batch_execute(&format!("CREATE SCHEMA {}", quote_ident(name)))
            .await?;
        Ok(())
    }

    async fn create_table(&self, name: &str) -> Result<()> {
        self.client
            .batch_execute(&format!(
                r#"
                CREATE TABLE {} (
                    id          BIGSERIAL PRIMARY KEY,
                    doc         JSONB NOT NULL,
                    ingested_at TIMESTAMPTZ NOT NULL DEFAULT now()
                )
                "#,
                self.qualified(name)
            ))
            .await?;
        Ok(())
    }

    async fn insert(&self, table: &str, document: &Value) -> Result<()> {
        self.client
            .execute(
                &format!("INSERT INTO {} (doc) VALUES ($1)", self.qualified(table)),
                &[document],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(port: &str) -> StorageConfig {
        StorageConfig {
            host: "localhost".to_string(),
            port: port.to_string(),
            database: "archive".to_string(),
            username: "ingest".to_string(),
            password: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_connection_config() {
        let pg = connection_config(&storage("5433")).unwrap();
        assert_eq!(pg.get_ports(), &[5433]);
        assert_eq!(pg.get_user(), Some("ingest"));
    }

    #[test]
    fn test_archive_database_is_not_the_login_database() {
        // The archive name may not exist yet on the server; it becomes a schema.
        let pg = connection_config(&storage("5432")).unwrap();
        assert_eq!(pg.get_dbname(), Some(DEFAULT_CONNECT_DATABASE));

        let config = StorageConfig {
            connect_database: "ops".to_string(),
            ..storage("5432")
        };
        assert_eq!(connection_config(&config).unwrap().get_dbname(), Some("ops"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = connection_config(&storage("not-a-port")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_to_connect() {
        // Port 1 on localhost is reserved and not listening.
        let result = PostgresStore::connect(&storage("1"), None).await;
        assert!(result.is_err());
    }
}
