//! HTTP client for the Twitter v1.1 streaming API
//!
//! Requests are signed with OAuth 1.0a user credentials. The filtered stream
//! is a long-lived `POST statuses/filter.json` whose body never completes
//! while the subscription is healthy, so the HTTP client has a connect
//! timeout but no request timeout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;

use crate::config::StreamConfig;
use crate::error::{Error, Result};

use super::oauth::OAuthSigner;
use super::{decode_items, FilterParams, ItemStream, StreamProvider};

/// REST API root used for credential verification
pub const DEFAULT_API_BASE: &str = "https://api.twitter.com/1.1";

/// Streaming API root
pub const DEFAULT_STREAM_BASE: &str = "https://stream.twitter.com/1.1";

/// Subset of the verify_credentials response used for logging
#[derive(Debug, Deserialize)]
struct VerifiedUser {
    screen_name: String,
}

/// Authenticated handle to the streaming provider
pub struct TwitterClient {
    http_client: reqwest::Client,
    signer: OAuthSigner,
    api_base: String,
    stream_base: String,
}

impl TwitterClient {
    /// Build an authenticated client from the streaming credentials.
    ///
    /// No request is made; see [`StreamProvider::verify_credentials`].
    pub fn new(config: &StreamConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("streamvault/", env!("CARGO_PKG_VERSION"))),
        );

        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            signer: OAuthSigner::new(config),
            api_base: DEFAULT_API_BASE.to_string(),
            stream_base: DEFAULT_STREAM_BASE.to_string(),
        })
    }

    /// Point the client at different API roots
    pub fn with_endpoints(mut self, api_base: &str, stream_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.stream_base = stream_base.trim_end_matches('/').to_string();
        self
    }

    fn authorization(
        &self,
        method: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<HeaderValue> {
        let value = self.signer.authorization(method, url, params)?;
        HeaderValue::from_str(&value)
            .map_err(|e| Error::Config(format!("invalid authorization header: {}", e)))
    }
}

#[async_trait]
impl StreamProvider for TwitterClient {
    async fn verify_credentials(&self) -> Result<bool> {
        let url = format!("{}/account/verify_credentials.json", self.api_base);
        let auth = self.authorization("GET", &url, &[])?;

        let response = self
            .http_client
            .get(&url)
            .header(AUTHORIZATION, auth)
            .send()
            .await
            .map_err(|e| Error::Stream(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            match response.json::<VerifiedUser>().await {
                Ok(user) => tracing::info!(screen_name = %user.screen_name, "Credentials verified"),
                Err(e) => tracing::debug!(error = %e, "Unexpected verify_credentials body"),
            }
            Ok(true)
        } else if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            tracing::debug!(status = %status, "Credentials rejected");
            Ok(false)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Stream(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    async fn open_filtered_stream(&self, params: &FilterParams) -> Result<ItemStream> {
        let url = format!("{}/statuses/filter.json", self.stream_base);
        let form = params.form_pairs();
        let auth = self.authorization("POST", &url, &form)?;

        tracing::debug!(url = %url, track = ?params.track, "Opening filtered stream");

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, auth)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Stream(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(Error::Stream(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        Ok(decode_items(response.bytes_stream()))
    }
}
