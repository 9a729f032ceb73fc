use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_REDDIT_CONFIG_PATH: &str = "config.json";
const DEFAULT_REDDIT_API_URL: &str = "https://oauth.reddit.com";
const DEFAULT_REDDIT_AUTH_URL: &str = "https://www.reddit.com";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_SUMMARIZATION_MODEL: &str = "deepseek-r1:8b";
const DEFAULT_WHATSAPP_API_URL: &str = "https://graph.facebook.com/v13.0";
const DEFAULT_WHATSAPP_PHONE_NUMBER_ID: &str = "441867515682175";
const DEFAULT_VERIFY_TOKEN: &str = "reddit";
const DEFAULT_DIGEST_RESULT_LIMIT: usize = 5;
const DEFAULT_MAX_CONCURRENT_DIGESTS: usize = 4;
const DEFAULT_SERVER_PORT: u16 = 5000;

/// Errors encountered while loading configuration from the environment and credential file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Reddit credential file was missing or did not contain the expected fields.
    #[error("Failed to read Reddit credentials from {path}: {reason}")]
    CredentialsFile {
        /// Path that was read.
        path: String,
        /// Underlying I/O or JSON error.
        reason: String,
    },
}

/// Reddit application credentials kept in a local JSON file.
#[derive(Clone, Deserialize)]
pub struct RedditCredentials {
    /// OAuth client identifier of the Reddit "script" application.
    pub client_id: String,
    /// OAuth client secret paired with `client_id`.
    pub client_secret: String,
    /// User agent string Reddit requires on every request.
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl RedditCredentials {
    /// Read the `{client_id, client_secret, user_agent}` triple from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let to_error = |reason: String| ConfigError::CredentialsFile {
            path: path.display().to_string(),
            reason,
        };
        let raw = fs::read_to_string(path).map_err(|err| to_error(err.to_string()))?;
        serde_json::from_str(&raw).map_err(|err| to_error(err.to_string()))
    }
}

/// Settings needed to search Reddit and summarize results.
///
/// Shared by the webhook server and the `threadbrief-search` CLI, which does not need any of
/// the messaging settings.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Reddit OAuth credentials.
    pub reddit: RedditCredentials,
    /// Base URL for authenticated Reddit API calls.
    pub reddit_api_url: String,
    /// Base URL hosting the Reddit OAuth token endpoint.
    pub reddit_auth_url: String,
    /// Base URL of the Ollama-compatible inference runtime.
    pub ollama_url: String,
    /// Model identifier passed to the inference runtime.
    pub summarization_model: String,
}

/// Runtime configuration for the webhook server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Search and summarization settings.
    pub search: SearchConfig,
    /// Bearer credential for the WhatsApp Cloud API.
    pub whatsapp_api_token: String,
    /// Phone-number id messages are sent from.
    pub whatsapp_phone_number_id: String,
    /// Graph API base URL, including the version segment.
    pub whatsapp_api_url: String,
    /// Token expected in the webhook subscription handshake.
    pub webhook_verify_token: String,
    /// Number of Reddit results summarized per inbound message.
    pub digest_result_limit: usize,
    /// Upper bound on concurrently running background digests.
    pub max_concurrent_digests: usize,
    /// HTTP port for the webhook server.
    pub server_port: u16,
}

impl SearchConfig {
    /// Load search settings from environment variables and the Reddit credential file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials_path = load_env_optional("REDDIT_CONFIG_PATH")
            .unwrap_or_else(|| DEFAULT_REDDIT_CONFIG_PATH.to_string());
        Ok(Self {
            reddit: RedditCredentials::from_file(Path::new(&credentials_path))?,
            reddit_api_url: load_env_or("REDDIT_API_URL", DEFAULT_REDDIT_API_URL),
            reddit_auth_url: load_env_or("REDDIT_AUTH_URL", DEFAULT_REDDIT_AUTH_URL),
            ollama_url: load_env_or("OLLAMA_URL", DEFAULT_OLLAMA_URL),
            summarization_model: load_env_or("SUMMARIZATION_MODEL", DEFAULT_SUMMARIZATION_MODEL),
        })
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let digest_result_limit =
            load_env_parsed("DIGEST_RESULT_LIMIT", DEFAULT_DIGEST_RESULT_LIMIT)?;
        if digest_result_limit == 0 {
            return Err(ConfigError::InvalidValue("DIGEST_RESULT_LIMIT".into()));
        }
        let max_concurrent_digests =
            load_env_parsed("MAX_CONCURRENT_DIGESTS", DEFAULT_MAX_CONCURRENT_DIGESTS)?;
        if max_concurrent_digests == 0 {
            return Err(ConfigError::InvalidValue("MAX_CONCURRENT_DIGESTS".into()));
        }

        Ok(Self {
            search: SearchConfig::from_env()?,
            whatsapp_api_token: load_env("WHATSAPP_API_TOKEN")?,
            whatsapp_phone_number_id: load_env_or(
                "WHATSAPP_PHONE_NUMBER_ID",
                DEFAULT_WHATSAPP_PHONE_NUMBER_ID,
            ),
            whatsapp_api_url: load_env_or("WHATSAPP_API_URL", DEFAULT_WHATSAPP_API_URL),
            webhook_verify_token: load_env_or("WEBHOOK_VERIFY_TOKEN", DEFAULT_VERIFY_TOKEN),
            digest_result_limit,
            max_concurrent_digests,
            server_port: load_env_parsed("SERVER_PORT", DEFAULT_SERVER_PORT)?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    load_env_optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn load_env_or(key: &str, default: &str) -> String {
    load_env_optional(key).unwrap_or_else(|| default.to_string())
}

fn load_env_parsed<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Load the full server configuration, honoring a `.env` file when present.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        reddit_api_url = %config.search.reddit_api_url,
        ollama_url = %config.search.ollama_url,
        model = %config.search.summarization_model,
        whatsapp_api_url = %config.whatsapp_api_url,
        server_port = config.server_port,
        result_limit = config.digest_result_limit,
        max_concurrent_digests = config.max_concurrent_digests,
        "Loaded configuration"
    );
    Ok(config)
}

/// Load only the search and summarization settings used by the CLI.
pub fn load_search_config() -> Result<SearchConfig, ConfigError> {
    dotenvy::dotenv().ok();
    let config = SearchConfig::from_env()?;
    tracing::debug!(
        reddit_api_url = %config.reddit_api_url,
        ollama_url = %config.ollama_url,
        model = %config.summarization_model,
        "Loaded search configuration"
    );
    Ok(config)
}
