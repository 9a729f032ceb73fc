//! Shared types used by the Reddit client and search fan-out.

use crate::retry::Retryable;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors returned while talking to the Reddit API.
#[derive(Debug, Error)]
pub enum RedditError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Reddit signalled that the client exceeded its request quota.
    #[error("Reddit rate limit reached: {0}")]
    RateLimited(String),
    /// Reddit responded with an unexpected status code.
    #[error("Unexpected Reddit response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Reddit.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// OAuth token exchange was rejected.
    #[error("Reddit authentication failed: {0}")]
    Auth(String),
    /// Response body did not match the listing schema.
    #[error("Malformed Reddit response: {0}")]
    InvalidResponse(String),
}

impl Retryable for RedditError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::UnexpectedStatus { status, .. } => status.is_server_error(),
            Self::RateLimited(_) | Self::Auth(_) | Self::InvalidResponse(_) => false,
        }
    }
}

impl RedditError {
    /// Whether the caller should back off before talking to Reddit again.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// One Reddit post flattened into summarizable text plus its permalink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    /// Cleaned and truncated title, body, and top comments.
    pub content: String,
    /// Absolute link to the post.
    pub url: String,
}

/// Post fields consumed from a search listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    /// Base-36 post identifier used to fetch comments.
    pub id: String,
    /// Post title.
    pub title: String,
    /// Markdown body; empty for link posts.
    #[serde(default)]
    pub selftext: String,
    /// Site-relative permalink (starts with `/r/`).
    pub permalink: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<Thing>,
}

/// Listing child; `data` is decoded according to `kind`.
#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    pub(crate) kind: String,
    #[serde(default)]
    pub(crate) data: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Comment {
    #[serde(default)]
    pub(crate) body: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
    #[serde(default)]
    pub(crate) access_token: Option<String>,
    #[serde(default = "default_token_lifetime")]
    pub(crate) expires_in: u64,
    #[serde(default)]
    pub(crate) error: Option<Value>,
}

fn default_token_lifetime() -> u64 {
    3600
}

pub(crate) const POST_KIND: &str = "t3";
pub(crate) const COMMENT_KIND: &str = "t1";
