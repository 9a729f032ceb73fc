//! Reddit integration: OAuth client, listing types, and paraphrase search.

mod client;
mod search;
mod types;

pub use client::RedditClient;
pub use search::{
    ContentSearch, MAX_COMMENTS_PER_POST, QUERY_VARIANTS, RedditSearcher, expand_query,
};
pub use types::{Post, RedditError, SearchResult};
