//! HTTP client wrapper for the Reddit OAuth API.

use crate::config::{RedditCredentials, SearchConfig};
use crate::reddit::types::{
    AccessTokenResponse, COMMENT_KIND, Comment, Listing, POST_KIND, Post, RedditError,
};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Tokens are refreshed this long before Reddit would expire them.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);
/// Upper bound on how long a token is cached, whatever `expires_in` claims.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

struct CachedToken {
    value: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }
}

/// Application-only Reddit client using the client-credentials grant.
pub struct RedditClient {
    http: Client,
    api_url: String,
    auth_url: String,
    credentials: RedditCredentials,
    token: Mutex<Option<CachedToken>>,
}

impl RedditClient {
    /// Construct a client from the search configuration.
    pub fn new(config: &SearchConfig) -> Result<Self, RedditError> {
        Self::with_urls(
            config.reddit.clone(),
            &config.reddit_api_url,
            &config.reddit_auth_url,
        )
    }

    /// Construct a client against explicit API and auth base URLs.
    pub fn with_urls(
        credentials: RedditCredentials,
        api_url: &str,
        auth_url: &str,
    ) -> Result<Self, RedditError> {
        let http = Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        tracing::debug!(api_url, auth_url, "Initialized Reddit HTTP client");
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            auth_url: auth_url.trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Search every subreddit for `query`, returning at most `limit` posts.
    pub async fn search_posts(&self, query: &str, limit: usize) -> Result<Vec<Post>, RedditError> {
        let token = self.access_token().await?;
        let limit_param = limit.to_string();
        let response = self
            .http
            .get(format!("{}/r/all/search", self.api_url))
            .bearer_auth(token)
            .query(&[
                ("q", query),
                ("sort", "relevance"),
                ("t", "all"),
                ("syntax", "plain"),
                ("limit", limit_param.as_str()),
                ("raw_json", "1"),
            ])
            .send()
            .await?;
        let listing: Listing = decode(ensure_success(response).await?).await?;

        let mut posts = Vec::new();
        for thing in listing.data.children {
            if thing.kind != POST_KIND {
                continue;
            }
            match serde_json::from_value::<Post>(thing.data) {
                Ok(post) => posts.push(post),
                Err(error) => tracing::debug!(%error, "Skipping undecodable post"),
            }
        }
        posts.truncate(limit);
        Ok(posts)
    }

    /// Fetch the bodies of up to `limit` top-level comments on a post.
    pub async fn top_comments(
        &self,
        post_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, RedditError> {
        let token = self.access_token().await?;
        let limit_param = limit.to_string();
        let response = self
            .http
            .get(format!("{}/comments/{post_id}", self.api_url))
            .bearer_auth(token)
            .query(&[
                ("limit", limit_param.as_str()),
                ("sort", "top"),
                ("depth", "1"),
                ("raw_json", "1"),
            ])
            .send()
            .await?;
        // The comments endpoint answers with `[post listing, comment listing]`.
        let listings: Vec<Listing> = decode(ensure_success(response).await?).await?;
        let Some(comments) = listings.into_iter().nth(1) else {
            return Ok(Vec::new());
        };

        Ok(comments
            .data
            .children
            .into_iter()
            .filter(|thing| thing.kind == COMMENT_KIND)
            .filter_map(|thing| serde_json::from_value::<Comment>(thing.data).ok())
            .map(|comment| comment.body)
            .filter(|body| !body.trim().is_empty())
            .take(limit)
            .collect())
    }

    async fn access_token(&self) -> Result<String, RedditError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.value.clone());
        }

        let response = self
            .http
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let body = response.text().await.unwrap_or_default();
            return Err(RedditError::Auth(body));
        }
        let body: AccessTokenResponse = decode(ensure_success(response).await?).await?;
        let Some(value) = body.access_token else {
            let reason = body
                .error
                .map(|error| error.to_string())
                .unwrap_or_else(|| "response carried no access_token".into());
            return Err(RedditError::Auth(reason));
        };

        tracing::debug!(expires_in = body.expires_in, "Obtained Reddit access token");
        let lifetime = Duration::from_secs(body.expires_in).min(MAX_TOKEN_LIFETIME);
        *guard = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }
}

/// Map non-success statuses to typed errors, detecting rate limiting along the way.
async fn ensure_success(response: Response) -> Result<Response, RedditError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS || body.contains("RATELIMIT") {
        return Err(RedditError::RateLimited(format!("{status}: {body}")));
    }
    Err(RedditError::UnexpectedStatus { status, body })
}

async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, RedditError> {
    response
        .json()
        .await
        .map_err(|error| RedditError::InvalidResponse(error.to_string()))
}
