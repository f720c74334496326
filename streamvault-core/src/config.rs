//! Configuration loading from the process environment
//!
//! Every setting comes from an environment variable. An optional prefix
//! (e.g. `GTR_`) is prepended to every name, so `GTR_HOST` and `HOST` are the
//! same setting under different deployment conventions.
//!
//! Missing variables resolve to empty values. Credentials and hosts are not
//! validated here; their absence surfaces later as connection failures.
//!
//! Default paths follow the XDG Base Directory Specification:
//! - Data (SQLite backend): `$XDG_DATA_HOME/streamvault/` (~/.local/share/streamvault/)

use crate::error::{Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Table (collection) that posts are written to unless `TABLE` is set.
pub const DEFAULT_TABLE: &str = "tweets";

/// Database the PostgreSQL backend logs in to unless `CONNECT_DATABASE` is set.
/// The configured `DATABASE` is created as a schema inside it.
pub const DEFAULT_CONNECT_DATABASE: &str = "postgres";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Main configuration struct
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Streaming provider credentials and filter
    pub stream: StreamConfig,

    /// Storage connection parameters
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Streaming provider credentials and track terms
#[derive(Clone, Default)]
pub struct StreamConfig {
    pub access_token: String,
    pub access_secret: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Keyword filters for the public stream
    pub track: Vec<String>,
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("access_token", &redact(&self.access_token))
            .field("access_secret", &redact(&self.access_secret))
            .field("consumer_key", &redact(&self.consumer_key))
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("track", &self.track)
            .finish()
    }
}

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// PostgreSQL, documents stored as JSONB
    #[default]
    Postgres,
    /// Local SQLite files, documents stored as JSON text
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Postgres => write!(f, "postgres"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(Error::Config(format!(
                "unknown storage backend '{}' (expected postgres or sqlite)",
                other
            ))),
        }
    }
}

/// Storage connection parameters
#[derive(Clone, Default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub host: String,
    /// Kept as received; the driver rejects a malformed port at connect time
    pub port: String,
    /// Archive namespace: a schema (PostgreSQL) or an attached file (SQLite)
    pub database: String,
    /// Existing database the PostgreSQL backend connects to
    pub connect_database: String,
    pub table: String,
    pub username: String,
    pub password: String,
    /// Path to the CA certificate (PEM)
    pub tls_ca_path: String,
    /// Path to the client certificate chain (PEM)
    pub tls_cert_path: String,
    /// Path to the client private key (PEM)
    pub tls_key_path: String,
    /// Directory holding SQLite database files
    pub data_dir: PathBuf,
}

impl StorageConfig {
    /// `host:port` as used in connection diagnostics
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// True when both the CA path and the client certificate path are set.
    ///
    /// The client key path is assumed present whenever the certificate is.
    pub fn has_tls_material(&self) -> bool {
        !self.tls_ca_path.is_empty() && !self.tls_cert_path.is_empty()
    }

    /// SQLite file backing the named database
    pub fn sqlite_path(&self, database: &str) -> PathBuf {
        self.data_dir.join(format!("{}.db", database))
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("connect_database", &self.connect_database)
            .field("table", &self.table)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("tls_ca_path", &self.tls_ca_path)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Directory for daily-rotated log files, in addition to stdout
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// `lookup` receives the fully prefixed variable name.
    pub fn from_lookup<F>(prefix: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", prefix, name)).unwrap_or_default();

        let stream = StreamConfig {
            access_token: var("ACCESS_TOKEN"),
            access_secret: var("ACCESS_SECRET"),
            consumer_key: var("CONSUMER_KEY"),
            consumer_secret: var("CONSUMER_SECRET"),
            track: parse_track(&var("TRACK")),
        };

        let table = var("TABLE");
        let connect_database = var("CONNECT_DATABASE");
        let data_dir = var("DATA_DIR");
        let storage = StorageConfig {
            backend: var("STORAGE_BACKEND").parse()?,
            host: var("HOST"),
            port: var("PORT"),
            database: var("DATABASE"),
            connect_database: if connect_database.is_empty() {
                DEFAULT_CONNECT_DATABASE.to_string()
            } else {
                connect_database
            },
            table: if table.is_empty() {
                DEFAULT_TABLE.to_string()
            } else {
                table
            },
            username: var("USERNAME"),
            password: var("PASSWORD"),
            tls_ca_path: var("TLS_CA"),
            tls_cert_path: var("TLS_CERT"),
            tls_key_path: var("TLS_KEY"),
            data_dir: if data_dir.is_empty() {
                Self::data_dir()
            } else {
                PathBuf::from(data_dir)
            },
        };

        let level = var("LOG_LEVEL");
        let log_dir = var("LOG_DIR");
        let logging = LoggingConfig {
            level: if level.is_empty() {
                default_log_level()
            } else {
                level
            },
            dir: (!log_dir.is_empty()).then(|| PathBuf::from(log_dir)),
        };

        Ok(Config {
            stream,
            storage,
            logging,
        })
    }

    /// Emit one diagnostic line per loaded field. Secrets are redacted.
    pub fn log_summary(&self) {
        let storage = &self.storage;
        tracing::info!("Storage Backend: {}", storage.backend);
        tracing::info!("Storage Host: {}", storage.host);
        tracing::info!("Storage Port: {}", storage.port);
        tracing::info!("Storage Database: {}", storage.database);
        if storage.backend == StorageBackend::Postgres {
            tracing::info!("Storage Connect Database: {}", storage.connect_database);
        }
        tracing::info!("Storage Table: {}", storage.table);
        tracing::info!("Storage Username: {}", storage.username);
        tracing::info!("Storage Password: {}", redact(&storage.password));
        tracing::info!("Storage TLS CA Path: {}", storage.tls_ca_path);
        tracing::info!("Storage TLS Cert Path: {}", storage.tls_cert_path);
        tracing::info!("Storage TLS Key Path: {}", storage.tls_key_path);
        if storage.backend == StorageBackend::Sqlite {
            tracing::info!("Storage Data Dir: {}", storage.data_dir.display());
        }

        let stream = &self.stream;
        tracing::info!("Stream Access Token: {}", redact(&stream.access_token));
        tracing::info!("Stream Consumer Key: {}", redact(&stream.consumer_key));
        tracing::info!("Stream Track: {:?}", stream.track);
    }

    /// Returns the default data directory path (for SQLite databases)
    ///
    /// `$XDG_DATA_HOME/streamvault/` (~/.local/share/streamvault/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("streamvault")
    }
}

/// Split a `TRACK` value into terms.
///
/// Terms are comma separated; whitespace around each term is trimmed and
/// empty terms are dropped, so an unset variable yields no terms.
pub fn parse_track(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(String::from)
        .collect()
}

fn redact(value: &str) -> &'static str {
    if value.is_empty() {
        "<not set>"
    } else {
        "<set>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(prefix: &str, vars: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(prefix, |key| env.get(key).cloned())
    }

    #[test]
    fn test_missing_vars_resolve_to_empty() {
        let config = load("", &[]).unwrap();
        assert!(config.stream.access_token.is_empty());
        assert!(config.stream.track.is_empty());
        assert!(config.storage.host.is_empty());
        assert!(config.storage.port.is_empty());
        assert_eq!(config.storage.backend, StorageBackend::Postgres);
        assert_eq!(config.storage.table, DEFAULT_TABLE);
        assert_eq!(config.storage.connect_database, DEFAULT_CONNECT_DATABASE);
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.dir.is_none());
        assert!(!config.storage.has_tls_material());
    }

    #[test]
    fn test_bare_names() {
        let config = load(
            "",
            &[
                ("ACCESS_TOKEN", "token"),
                ("CONSUMER_KEY", "key"),
                ("TRACK", "golang"),
                ("HOST", "db.internal"),
                ("PORT", "5432"),
                ("DATABASE", "archive"),
                ("USERNAME", "ingest"),
                ("PASSWORD", "hunter2"),
            ],
        )
        .unwrap();

        assert_eq!(config.stream.access_token, "token");
        assert_eq!(config.stream.consumer_key, "key");
        assert_eq!(config.stream.track, vec!["golang"]);
        assert_eq!(config.storage.address(), "db.internal:5432");
        assert_eq!(config.storage.database, "archive");
        assert_eq!(config.storage.connect_database, "postgres");
        assert_eq!(config.storage.username, "ingest");
        assert_eq!(config.storage.password, "hunter2");
    }

    #[test]
    fn test_connect_database_override() {
        let config = load("", &[("DATABASE", "archive"), ("CONNECT_DATABASE", "ops")]).unwrap();
        assert_eq!(config.storage.database, "archive");
        assert_eq!(config.storage.connect_database, "ops");
    }

    #[test]
    fn test_prefixed_names() {
        let config = load(
            "GTR_",
            &[
                ("GTR_HOST", "prefixed"),
                ("HOST", "bare"),
                ("GTR_TLS_CA", "/etc/ca.pem"),
                ("GTR_TLS_CERT", "/etc/client.pem"),
                ("GTR_TLS_KEY", "/etc/client.key"),
            ],
        )
        .unwrap();

        assert_eq!(config.storage.host, "prefixed");
        assert!(config.storage.has_tls_material());
        assert_eq!(config.storage.tls_key_path, "/etc/client.key");
    }

    #[test]
    fn test_tls_material_needs_ca_and_cert() {
        let config = load("", &[("TLS_CA", "/etc/ca.pem")]).unwrap();
        assert!(!config.storage.has_tls_material());

        let config = load("", &[("TLS_CERT", "/etc/client.pem")]).unwrap();
        assert!(!config.storage.has_tls_material());
    }

    #[test]
    fn test_parse_track() {
        assert_eq!(parse_track("golang"), vec!["golang"]);
        assert_eq!(parse_track("golang, rust ,,zig"), vec!["golang", "rust", "zig"]);
        assert!(parse_track("").is_empty());
        assert!(parse_track(" , ").is_empty());
    }

    #[test]
    fn test_storage_backend_parsing() {
        let config = load("", &[("STORAGE_BACKEND", "SQLite"), ("DATA_DIR", "/tmp/sv")]).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            config.storage.sqlite_path("archive"),
            PathBuf::from("/tmp/sv/archive.db")
        );

        let err = load("", &[("STORAGE_BACKEND", "mongo")]).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_logging_overrides() {
        let config = load("", &[("LOG_LEVEL", "debug"), ("LOG_DIR", "/var/log/sv")]).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.dir, Some(PathBuf::from("/var/log/sv")));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let config = load(
            "",
            &[
                ("ACCESS_SECRET", "very-secret"),
                ("CONSUMER_SECRET", "also-secret"),
                ("PASSWORD", "hunter2"),
            ],
        )
        .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(!rendered.contains("also-secret"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<set>"));
    }
}
