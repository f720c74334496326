//! Filtered public stream
//!
//! The streaming provider is reached through the [`StreamProvider`] trait:
//! credential verification and opening the filtered stream. The production
//! implementation is [`TwitterClient`]; tests substitute their own.
//!
//! An open stream is an [`ItemStream`]: sequential, unbounded and not
//! restartable. It ends when the provider closes the connection.

mod decode;
mod items;
mod oauth;
mod twitter;

pub use decode::{decode_items, LineBuffer};
pub use items::{OtherKind, Post, StreamItem};
pub use oauth::OAuthSigner;
pub use twitter::{TwitterClient, DEFAULT_API_BASE, DEFAULT_STREAM_BASE};

use crate::error::Result;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

/// A live filtered stream
pub type ItemStream = Pin<Box<dyn Stream<Item = Result<StreamItem>> + Send>>;

/// Parameters for the filtered stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterParams {
    /// Keyword filters
    pub track: Vec<String>,
}

impl FilterParams {
    pub fn new(track: Vec<String>) -> Self {
        Self { track }
    }

    /// The single `track` form parameter, terms joined with commas
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        vec![("track".to_string(), self.track.join(","))]
    }
}

/// Streaming provider capabilities
#[async_trait]
pub trait StreamProvider: Send + Sync {
    /// Round-trip check of the configured credentials.
    ///
    /// `Ok(false)` means the provider rejected them.
    async fn verify_credentials(&self) -> Result<bool>;

    /// Open the filtered public stream
    async fn open_filtered_stream(&self, params: &FilterParams) -> Result<ItemStream>;
}
