use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FailureKind;

/// The day's briefing as returned by the upstream API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Digest {
    #[serde(rename = "news", default, deserialize_with = "null_as_default")]
    pub headlines: Vec<String>,
    #[serde(rename = "weiyu", default, deserialize_with = "null_as_default")]
    pub quote: String,
}

impl Digest {
    pub fn new(headlines: Vec<String>, quote: impl Into<String>) -> Self {
        Self {
            headlines,
            quote: quote.into(),
        }
    }
}

/// The cosmetic image variant of the briefing.
#[derive(Debug, Clone, PartialEq)]
pub struct DigestImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A rendered blog post, ready to publish
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub html_body: String,
}

/// What the blog hands back after a successful post
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub article_id: String,
}

/// Outcome of a run, as reported to the chat group.
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    Published {
        title: String,
        article_id: String,
        article_url: String,
        timestamp: DateTime<Local>,
    },
    Failed {
        kind: FailureKind,
        message: String,
        timestamp: DateTime<Local>,
    },
}

impl NotifyEvent {
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            NotifyEvent::Published { timestamp, .. } | NotifyEvent::Failed { timestamp, .. } => {
                *timestamp
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NotifyEvent::Published { .. })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
