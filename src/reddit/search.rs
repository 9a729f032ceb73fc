//! Paraphrase fan-out over the Reddit search API.

use crate::reddit::client::RedditClient;
use crate::reddit::types::{Post, RedditError, SearchResult};
use crate::retry::RetryPolicy;
use crate::text::{DEFAULT_MAX_WORDS, clean, truncate};
use async_trait::async_trait;

/// Number of paraphrased queries issued per search term.
pub const QUERY_VARIANTS: usize = 3;
/// Comments folded into each result's content.
pub const MAX_COMMENTS_PER_POST: usize = 5;

/// Reword `term` into the fixed set of paraphrased queries.
pub fn expand_query(term: &str) -> [String; QUERY_VARIANTS] {
    [
        format!("Quais são os principais tópicos sobre '{term}'?"),
        format!("Como '{term}' é discutido em diferentes contextos?"),
        format!("Quais são as opiniões populares sobre '{term}'?"),
    ]
}

/// Source of summarizable search results.
#[async_trait]
pub trait ContentSearch: Send + Sync {
    /// Collect at most `limit` results for `term`. Failures degrade to a partial list.
    async fn search(&self, term: &str, limit: usize) -> Vec<SearchResult>;
}

/// [`ContentSearch`] backed by the Reddit API.
pub struct RedditSearcher {
    client: RedditClient,
    policy: RetryPolicy,
    max_words: usize,
}

impl RedditSearcher {
    /// Wrap a client with the default search retry policy and word budget.
    pub fn new(client: RedditClient) -> Self {
        Self {
            client,
            policy: RetryPolicy::search(),
            max_words: DEFAULT_MAX_WORDS,
        }
    }

    /// Override the retry policy (and with it the rate-limit cooldown).
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn collect(
        &self,
        term: &str,
        limit: usize,
        results: &mut Vec<SearchResult>,
    ) -> Result<(), RedditError> {
        let per_query = limit.div_ceil(QUERY_VARIANTS);
        for query in expand_query(term) {
            let posts = self
                .policy
                .run(|| self.client.search_posts(&query, per_query))
                .await?;
            tracing::debug!(
                query = %query,
                posts = posts.len(),
                "Reddit search page received"
            );

            for post in posts {
                let comments = self
                    .policy
                    .run(|| self.client.top_comments(&post.id, MAX_COMMENTS_PER_POST))
                    .await?;
                results.push(SearchResult {
                    content: build_content(&post, &comments, self.max_words),
                    url: permalink_url(&post.permalink),
                });
                if results.len() >= limit {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    async fn handle_api_error(&self, error: &RedditError, collected: usize) {
        if error.is_rate_limit() {
            tracing::error!(
                %error,
                collected,
                cooldown_secs = self.policy.backoff.as_secs(),
                "Reddit rate limit hit; cooling down before returning partial results"
            );
            self.policy.cooldown().await;
        } else {
            tracing::warn!(%error, collected, "Reddit search failed; returning partial results");
        }
    }
}

#[async_trait]
impl ContentSearch for RedditSearcher {
    async fn search(&self, term: &str, limit: usize) -> Vec<SearchResult> {
        let mut results = Vec::new();
        if limit == 0 {
            return results;
        }
        if let Err(error) = self.collect(term, limit, &mut results).await {
            self.handle_api_error(&error, results.len()).await;
        }
        tracing::info!(term, limit, collected = results.len(), "Reddit search finished");
        results
    }
}

fn build_content(post: &Post, comments: &[String], max_words: usize) -> String {
    let mut content = format!("POST: {}\n{}", post.title, post.selftext);
    for body in comments {
        content.push_str("\nCOMMENT: ");
        content.push_str(body);
    }
    truncate(&clean(&content), max_words)
}

fn permalink_url(permalink: &str) -> String {
    format!("https://reddit.com{permalink}")
}
