//! TLS client context for storage connections
//!
//! Built once from [`StorageConfig`]: a root store seeded from the CA
//! certificate plus exactly one client certificate/key pair (mTLS). When the
//! CA path or the client certificate path is empty there is no context and
//! the storage driver connects with its default (plaintext) mode.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

/// Reusable rustls client configuration
#[derive(Clone)]
pub struct TlsContext {
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsContext").finish_non_exhaustive()
    }
}

impl TlsContext {
    /// Build the context from configured paths.
    ///
    /// Returns `Ok(None)` without touching the filesystem unless both the CA
    /// path and the client certificate path are set. Unreadable or invalid
    /// material is an error; there is no degraded TLS mode.
    pub fn from_config(config: &StorageConfig) -> Result<Option<Self>> {
        if !config.has_tls_material() {
            tracing::debug!("No TLS material configured");
            return Ok(None);
        }

        let context = Self::load(
            Path::new(&config.tls_ca_path),
            Path::new(&config.tls_cert_path),
            Path::new(&config.tls_key_path),
        )?;

        tracing::info!(
            ca = %config.tls_ca_path,
            cert = %config.tls_cert_path,
            "TLS context loaded"
        );

        Ok(Some(context))
    }

    /// Load a CA bundle and a client certificate/key pair.
    pub fn load(ca_path: &Path, cert_path: &Path, key_path: &Path) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        let ca_certs = read_certs(ca_path)
            .map_err(|e| Error::Tls(format!("unable to parse CA certificate: {}", e)))?;
        if ca_certs.is_empty() {
            return Err(Error::Tls(format!(
                "unable to parse CA certificate: no certificates in {}",
                ca_path.display()
            )));
        }
        for cert in ca_certs {
            roots
                .add(cert)
                .map_err(|e| Error::Tls(format!("unable to parse CA certificate: {}", e)))?;
        }

        let chain = read_certs(cert_path)
            .map_err(|e| Error::Tls(format!("unable to parse client key pair: {}", e)))?;
        if chain.is_empty() {
            return Err(Error::Tls(format!(
                "unable to parse client key pair: no certificates in {}",
                cert_path.display()
            )));
        }
        let key = read_key(key_path)
            .map_err(|e| Error::Tls(format!("unable to parse client key pair: {}", e)))?;

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(format!("unsupported protocol versions: {}", e)))?
            .with_root_certificates(roots)
            .with_client_auth_cert(chain, key)
            .map_err(|e| Error::Tls(format!("unable to parse client key pair: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    /// The rustls configuration, for handing to a driver's connector
    pub fn client_config(&self) -> &ClientConfig {
        &self.config
    }
}

fn read_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(File::open(path)?);
    let certs = rustls_pemfile::certs(&mut reader).collect::<std::io::Result<Vec<_>>>()?;
    Ok(certs)
}

fn read_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(File::open(path)?);
    rustls_pemfile::private_key(&mut reader)?
        .ok_or_else(|| Error::Tls(format!("no private key found in {}", path.display())))
}
