//! Abstractions for generating digest summaries via a remote inference runtime.
//!
//! The Ollama-backed client issues `/api/generate` requests directly. [`Summarizer`] layers the
//! retry policy on top and degrades to [`SUMMARY_FALLBACK`] instead of surfacing errors, so the
//! background pipeline always has something to send.

mod prompt;

pub use prompt::{LANGUAGE_DIRECTIVE, build_prompt, digest_instruction, strip_reasoning_markup};

use crate::config::SearchConfig;
use crate::retry::{RetryPolicy, Retryable};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

/// Returned in place of a summary when every attempt failed. Callers treat it as a soft failure.
pub const SUMMARY_FALLBACK: &str = "Erro ao processar o resumo";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Errors surfaced while attempting summarization.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was unreachable or timed out.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

impl Retryable for SummarizationClientError {
    fn is_retryable(&self) -> bool {
        // Timeouts, error statuses and garbled bodies are all worth another attempt.
        true
    }
}

/// Request payload passed to the summarization provider.
#[derive(Debug, Clone)]
pub struct SummarizationRequest {
    /// Fully qualified model identifier understood by the provider.
    pub model: String,
    /// Complete prompt, including content and language directive.
    pub prompt: String,
}

/// Interface implemented by summarization providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Generate a summary using the requested model.
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError>;
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
}

impl OllamaSummarizationClient {
    /// Build a client for the runtime at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("threadbrief/summary")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| SummarizationClientError::ProviderUnavailable(error.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn generate_summary(
        &self,
        request: SummarizationRequest,
    ) -> Result<String, SummarizationClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        Ok(body.response.trim().to_string())
    }
}

/// Retry-aware front end over a [`SummarizationClient`].
pub struct Summarizer {
    client: Box<dyn SummarizationClient>,
    model: String,
    policy: RetryPolicy,
}

impl Summarizer {
    /// Wrap `client` with the default summarization retry policy.
    pub fn new(client: Box<dyn SummarizationClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            policy: RetryPolicy::summarization(),
        }
    }

    /// Build an Ollama-backed summarizer from configuration.
    pub fn from_config(config: &SearchConfig) -> Result<Self, SummarizationClientError> {
        let client = OllamaSummarizationClient::new(config.ollama_url.clone())?;
        tracing::debug!(
            url = %config.ollama_url,
            model = %config.summarization_model,
            "Initialized summarization client"
        );
        Ok(Self::new(Box::new(client), config.summarization_model.clone()))
    }

    /// Override the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Summarize `content` following `instruction`.
    ///
    /// Returns [`SUMMARY_FALLBACK`] once the retry budget is exhausted.
    pub async fn summarize(&self, instruction: &str, content: &str) -> String {
        let request = SummarizationRequest {
            model: self.model.clone(),
            prompt: build_prompt(instruction, content),
        };
        match self
            .policy
            .run(|| self.client.generate_summary(request.clone()))
            .await
        {
            Ok(summary) => summary,
            Err(error) => {
                tracing::warn!(
                    %error,
                    attempts = self.policy.max_attempts,
                    "Summarization failed; using fallback text"
                );
                SUMMARY_FALLBACK.to_string()
            }
        }
    }

    /// Produce the user-facing digest of one search result for `term`.
    pub async fn digest(&self, term: &str, content: &str) -> String {
        let summary = self.summarize(&digest_instruction(term), content).await;
        strip_reasoning_markup(&summary).trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    fn request() -> SummarizationRequest {
        SummarizationRequest {
            model: "deepseek-r1:8b".into(),
            prompt: "Summarize".into(),
        }
    }

    #[tokio::test]
    async fn ollama_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate").json_body(json!({
                    "model": "deepseek-r1:8b",
                    "prompt": "Summarize",
                    "stream": false
                }));
                then.status(200).json_body(json!({
                    "response": "  Summary text\n",
                    "done": true
                }));
            })
            .await;

        let summary = client.generate_summary(request()).await.expect("summary");

        mock.assert_async().await;
        assert_eq!(summary, "Summary text");
    }

    #[tokio::test]
    async fn ollama_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate_summary(request())
            .await
            .expect_err("error response");

        assert!(
            matches!(error, SummarizationClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn ollama_client_rejects_missing_response_field() {
        let server = MockServer::start_async().await;
        let client = OllamaSummarizationClient::new(server.base_url()).expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "error": "model not loaded" }));
            })
            .await;

        let error = client
            .generate_summary(request())
            .await
            .expect_err("malformed response");
        assert!(matches!(error, SummarizationClientError::InvalidResponse(_)));
    }

    struct FailingClient {
        attempts: Arc<Mutex<Vec<Instant>>>,
    }

    #[async_trait]
    impl SummarizationClient for FailingClient {
        async fn generate_summary(
            &self,
            _request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            self.attempts
                .lock()
                .expect("attempts lock")
                .push(Instant::now());
            Err(SummarizationClientError::ProviderUnavailable("down".into()))
        }
    }

    struct ScriptedClient {
        reply: &'static str,
        prompts: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SummarizationClient for ScriptedClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            self.prompts
                .lock()
                .expect("prompts lock")
                .push(request.prompt);
            Ok(self.reply.to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn always_failing_endpoint_yields_fallback_after_three_spaced_attempts() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let summarizer = Summarizer::new(
            Box::new(FailingClient {
                attempts: Arc::clone(&attempts),
            }),
            "model",
        );

        let summary = summarizer.summarize("Summarize", "content").await;

        assert_eq!(summary, SUMMARY_FALLBACK);
        let attempts = attempts.lock().expect("attempts lock");
        assert_eq!(attempts.len(), 3);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }
    }

    #[tokio::test]
    async fn digest_strips_reasoning_and_sends_language_directive() {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let summarizer = Summarizer::new(
            Box::new(ScriptedClient {
                reply: "<think>hmm</think>\n  Rust e Go são comparados.",
                prompts: Arc::clone(&prompts),
            }),
            "model",
        );

        let digest = summarizer.digest("rust vs go", "POST: Rust or Go?").await;

        assert_eq!(digest, "Rust e Go são comparados.");
        let prompts = prompts.lock().expect("prompts lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("'rust vs go'"));
        assert!(prompts[0].contains("POST: Rust or Go?"));
        assert!(prompts[0].ends_with(LANGUAGE_DIRECTIVE));
    }
}
