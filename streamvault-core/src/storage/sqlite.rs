//! SQLite document store
//!
//! Each database is a separate file, `<data_dir>/<name>.db`, attached to the
//! connection under its own name. Tables live inside the attached database
//! and hold one JSON document per row.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use super::{quote_ident, DocumentStore};

/// Document store backed by SQLite files
pub struct SqliteStore {
    conn: Mutex<Connection>,
    /// Directory for attached database files; `None` keeps everything in memory
    data_dir: Option<PathBuf>,
    /// Database that tables are created in and inserted into
    database: String,
}

impl SqliteStore {
    /// Open a store writing under the configured data directory
    pub fn open(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            conn: Mutex::new(conn),
            data_dir: Some(config.data_dir.clone()),
            database: config.database.clone(),
        })
    }

    /// Open a store whose databases live in memory (for testing)
    pub fn open_in_memory(database: &str) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            data_dir: None,
            database: database.to_string(),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Storage("sqlite connection lock poisoned".to_string()))
    }

    fn qualified(&self, table: &str) -> String {
        format!("{}.{}", quote_ident(&self.database), quote_ident(table))
    }

    /// Number of documents in a table
    pub fn count(&self, table: &str) -> Result<i64> {
        let conn = self.connection()?;
        let sql = format!("SELECT COUNT(*) FROM {}", self.qualified(table));
        let count = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    /// All documents in a table, in insertion order
    pub fn documents(&self, table: &str) -> Result<Vec<Value>> {
        let conn = self.connection()?;
        let sql = format!("SELECT doc FROM {} ORDER BY id", self.qualified(table));
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut documents = Vec::new();
        for row in rows {
            documents.push(serde_json::from_str(&row?)?);
        }
        Ok(documents)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        let location = match &self.data_dir {
            Some(dir) => dir.join(format!("{}.db", name)).to_string_lossy().into_owned(),
            None => ":memory:".to_string(),
        };

        let conn = self.connection()?;
        conn.execute(
            &format!("ATTACH DATABASE ?1 AS {}", quote_ident(name)),
            params![location],
        )?;
        Ok(())
    }

    async fn create_table(&self, name: &str) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE {} (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                doc         TEXT NOT NULL,
                ingested_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            "#,
            self.qualified(name)
        ))?;
        Ok(())
    }

    async fn insert(&self, table: &str, document: &Value) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            &format!("INSERT INTO {} (doc) VALUES (?1)", self.qualified(table)),
            params![document.to_string()],
        )?;
        Ok(())
    }
}
