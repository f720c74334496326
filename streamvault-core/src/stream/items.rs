//! Stream message classification
//!
//! The public stream interleaves posts with control messages (deletions,
//! rate-limit notices, stall warnings, disconnects). Each decoded message
//! becomes one [`StreamItem`]; only [`StreamItem::Post`] carries the fields
//! the ingestion loop uses.

use crate::error::Result;
use serde_json::Value;

/// One message received from the filtered stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// A post, forwarded to storage
    Post(Post),
    /// Anything else, discarded
    Other(OtherKind),
}

/// A post as delivered by the provider
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    /// Author handle (`user.screen_name`)
    pub author: String,
    /// Body text
    pub text: String,
    /// The complete message, stored unmodified
    pub raw: Value,
}

/// Non-post message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtherKind {
    Delete,
    ScrubGeo,
    Limit,
    StatusWithheld,
    UserWithheld,
    Disconnect,
    Warning,
    Event,
    Friends,
    Control,
    Unknown,
}

/// Top-level keys that mark a control message, checked in order
const CONTROL_KEYS: &[(&str, OtherKind)] = &[
    ("delete", OtherKind::Delete),
    ("scrub_geo", OtherKind::ScrubGeo),
    ("limit", OtherKind::Limit),
    ("status_withheld", OtherKind::StatusWithheld),
    ("user_withheld", OtherKind::UserWithheld),
    ("disconnect", OtherKind::Disconnect),
    ("warning", OtherKind::Warning),
    ("event", OtherKind::Event),
    ("friends", OtherKind::Friends),
    ("friends_str", OtherKind::Friends),
    ("control", OtherKind::Control),
];

impl StreamItem {
    /// Decode one newline-delimited message
    pub fn from_line(line: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(line)?;
        Ok(Self::classify(value))
    }

    /// Classify a decoded message
    pub fn classify(value: Value) -> Self {
        if let Some(object) = value.as_object() {
            for (key, kind) in CONTROL_KEYS {
                if object.contains_key(*key) {
                    return StreamItem::Other(*kind);
                }
            }
        }

        match Post::from_value(value) {
            Some(post) => StreamItem::Post(post),
            None => StreamItem::Other(OtherKind::Unknown),
        }
    }

    /// True for [`StreamItem::Post`]
    pub fn is_post(&self) -> bool {
        matches!(self, StreamItem::Post(_))
    }
}

impl Post {
    /// Extract a post from a decoded message.
    ///
    /// Requires a `user.screen_name` and a `text` (or `full_text`) string.
    pub fn from_value(raw: Value) -> Option<Self> {
        let author = raw.get("user")?.get("screen_name")?.as_str()?.to_string();
        let text = raw
            .get("text")
            .or_else(|| raw.get("full_text"))?
            .as_str()?
            .to_string();

        Some(Self { author, text, raw })
    }
}
