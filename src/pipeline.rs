//! The background digest: search, summarize each hit, reply per result.

use crate::metrics::DigestMetrics;
use crate::reddit::ContentSearch;
use crate::summarization::Summarizer;
use crate::whatsapp::MessagingGateway;
use std::sync::Arc;

/// Sent instead of digests when the search produced nothing.
pub const NOTHING_FOUND_MESSAGE: &str = "Nenhum resultado encontrado.";

/// One unit of background work derived from an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestJob {
    /// WhatsApp id of the user who asked.
    pub sender_id: String,
    /// Message text, used verbatim as the search term.
    pub term: String,
    /// Maximum number of results to summarize.
    pub limit: usize,
}

/// Format one summarized result as a chat message.
pub fn format_reply(summary: &str, url: &str) -> String {
    format!("Resultado: {summary}\nLink: {url}")
}

/// Runs digest jobs against the search, summarization, and messaging services.
pub struct DigestPipeline {
    search: Arc<dyn ContentSearch>,
    summarizer: Summarizer,
    gateway: Arc<dyn MessagingGateway>,
    metrics: Arc<DigestMetrics>,
}

impl DigestPipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        search: Arc<dyn ContentSearch>,
        summarizer: Summarizer,
        gateway: Arc<dyn MessagingGateway>,
        metrics: Arc<DigestMetrics>,
    ) -> Self {
        Self {
            search,
            summarizer,
            gateway,
            metrics,
        }
    }

    /// Execute one job to completion. Never fails; every step degrades on error.
    pub async fn run(&self, job: DigestJob) {
        self.metrics.record_digest_started();
        tracing::info!(
            sender = %job.sender_id,
            term = %job.term,
            limit = job.limit,
            "Starting digest"
        );

        let results = self.search.search(&job.term, job.limit).await;
        if results.is_empty() {
            self.deliver(&job.sender_id, NOTHING_FOUND_MESSAGE).await;
        }
        for (index, result) in results.iter().enumerate() {
            tracing::debug!(index, total = results.len(), url = %result.url, "Summarizing result");
            let summary = self.summarizer.digest(&job.term, &result.content).await;
            self.deliver(&job.sender_id, &format_reply(&summary, &result.url))
                .await;
        }

        self.metrics.record_digest_completed();
        tracing::info!(sender = %job.sender_id, results = results.len(), "Digest finished");
    }

    async fn deliver(&self, recipient_id: &str, body: &str) {
        let delivered = self.gateway.send_message(recipient_id, body).await;
        self.metrics.record_reply(delivered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reddit::SearchResult;
    use crate::summarization::{
        SUMMARY_FALLBACK, SummarizationClient, SummarizationClientError, SummarizationRequest,
    };
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct FixedSearch {
        results: Vec<SearchResult>,
        calls: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl ContentSearch for FixedSearch {
        async fn search(&self, term: &str, limit: usize) -> Vec<SearchResult> {
            self.calls.lock().await.push((term.to_string(), limit));
            self.results.iter().take(limit).cloned().collect()
        }
    }

    struct EchoClient;

    #[async_trait]
    impl SummarizationClient for EchoClient {
        async fn generate_summary(
            &self,
            request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            let content = request.prompt.split("\n\n").nth(1).unwrap_or_default();
            Ok(format!("<think>draft</think> resumo de {content}"))
        }
    }

    struct BrokenClient;

    #[async_trait]
    impl SummarizationClient for BrokenClient {
        async fn generate_summary(
            &self,
            _request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            Err(SummarizationClientError::GenerationFailed("500".into()))
        }
    }

    #[derive(Default)]
    struct RecordingGateway {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl MessagingGateway for RecordingGateway {
        async fn send_message(&self, recipient_id: &str, body: &str) -> bool {
            self.sent
                .lock()
                .await
                .push((recipient_id.to_string(), body.to_string()));
            !self.fail
        }
    }

    fn result(content: &str, url: &str) -> SearchResult {
        SearchResult {
            content: content.into(),
            url: url.into(),
        }
    }

    fn job() -> DigestJob {
        DigestJob {
            sender_id: "5511999999999".into(),
            term: "rust vs go".into(),
            limit: 5,
        }
    }

    #[tokio::test]
    async fn empty_search_sends_single_nothing_found_message() {
        let search = Arc::new(FixedSearch {
            results: vec![],
            calls: Mutex::new(vec![]),
        });
        let gateway = Arc::new(RecordingGateway::default());
        let metrics = Arc::new(DigestMetrics::new());
        let pipeline = DigestPipeline::new(
            search.clone(),
            Summarizer::new(Box::new(EchoClient), "model"),
            gateway.clone(),
            metrics.clone(),
        );

        pipeline.run(job()).await;

        let sent = gateway.sent.lock().await;
        assert_eq!(
            *sent,
            vec![("5511999999999".to_string(), NOTHING_FOUND_MESSAGE.to_string())]
        );
        assert_eq!(*search.calls.lock().await, vec![("rust vs go".to_string(), 5)]);
        assert_eq!(metrics.snapshot().digests_completed, 1);
    }

    #[tokio::test]
    async fn each_result_is_sent_in_order_without_reasoning() {
        let search = Arc::new(FixedSearch {
            results: vec![
                result("first post", "https://reddit.com/r/a/1"),
                result("second post", "https://reddit.com/r/a/2"),
            ],
            calls: Mutex::new(vec![]),
        });
        let gateway = Arc::new(RecordingGateway::default());
        let pipeline = DigestPipeline::new(
            search,
            Summarizer::new(Box::new(EchoClient), "model"),
            gateway.clone(),
            Arc::new(DigestMetrics::new()),
        );

        pipeline.run(job()).await;

        let bodies: Vec<String> = gateway
            .sent
            .lock()
            .await
            .iter()
            .map(|(_, body)| body.clone())
            .collect();
        assert_eq!(
            bodies,
            vec![
                "Resultado: resumo de first post\nLink: https://reddit.com/r/a/1".to_string(),
                "Resultado: resumo de second post\nLink: https://reddit.com/r/a/2".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_summaries_still_reply_with_fallback() {
        let search = Arc::new(FixedSearch {
            results: vec![result("post", "https://reddit.com/r/a/1")],
            calls: Mutex::new(vec![]),
        });
        let gateway = Arc::new(RecordingGateway {
            fail: true,
            ..Default::default()
        });
        let metrics = Arc::new(DigestMetrics::new());
        let pipeline = DigestPipeline::new(
            search,
            Summarizer::new(Box::new(BrokenClient), "model"),
            gateway.clone(),
            metrics.clone(),
        );

        pipeline.run(job()).await;

        let sent = gateway.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].1,
            format_reply(SUMMARY_FALLBACK, "https://reddit.com/r/a/1")
        );
        assert_eq!(metrics.snapshot().replies_failed, 1);
    }
}
