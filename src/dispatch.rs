//! Bounded background execution for digest jobs.
//!
//! Every job becomes a tracked tokio task. A semaphore caps how many of them talk to external
//! services at once; the rest wait for a permit without holding any connection.

use crate::pipeline::{DigestJob, DigestPipeline};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

/// Hands digest jobs to background execution without waiting for them.
pub trait Dispatch: Send + Sync {
    /// Start `job` in the background and return immediately.
    fn dispatch(&self, job: DigestJob);
}

/// [`Dispatch`] implementation running jobs on the tokio runtime with a concurrency cap.
pub struct JobDispatcher {
    pipeline: Arc<DigestPipeline>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
}

impl JobDispatcher {
    /// Build a dispatcher allowing at most `max_concurrent` jobs to run at once.
    pub fn new(pipeline: Arc<DigestPipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tracker: TaskTracker::new(),
        }
    }

    /// Jobs that are running or waiting for a permit.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait until every dispatched job has finished.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Wait for every dispatched job unless `interrupt` resolves first.
    ///
    /// Returns `true` when the dispatcher drained. On interruption the remaining jobs are left
    /// running and the dispatcher stays closed.
    pub async fn drain_until<F>(&self, interrupt: F) -> bool
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            () = self.wait_idle() => true,
            () = interrupt => false,
        }
    }
}

impl Dispatch for JobDispatcher {
    fn dispatch(&self, job: DigestJob) {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        tracing::debug!(
            sender = %job.sender_id,
            in_flight = self.tracker.len(),
            available_permits = permits.available_permits(),
            "Dispatching digest job"
        );
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::warn!(sender = %job.sender_id, "Dispatcher closed; dropping job");
                return;
            };
            pipeline.run(job).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DigestMetrics;
    use crate::reddit::{ContentSearch, SearchResult};
    use crate::summarization::{
        SummarizationClient, SummarizationClientError, SummarizationRequest, Summarizer,
    };
    use crate::whatsapp::MessagingGateway;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Search stub that records the peak number of overlapping calls.
    struct SlowSearch {
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowSearch {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentSearch for SlowSearch {
        async fn search(&self, _term: &str, _limit: usize) -> Vec<SearchResult> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    struct UnusedClient;

    #[async_trait]
    impl SummarizationClient for UnusedClient {
        async fn generate_summary(
            &self,
            _request: SummarizationRequest,
        ) -> Result<String, SummarizationClientError> {
            Ok(String::new())
        }
    }

    #[derive(Default)]
    struct CountingGateway {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl MessagingGateway for CountingGateway {
        async fn send_message(&self, _recipient_id: &str, _body: &str) -> bool {
            self.sent.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    fn dispatcher_with_delay(delay: Duration) -> JobDispatcher {
        let pipeline = Arc::new(DigestPipeline::new(
            Arc::new(SlowSearch::new(delay)),
            Summarizer::new(Box::new(UnusedClient), "model"),
            Arc::new(CountingGateway::default()),
            Arc::new(DigestMetrics::new()),
        ));
        JobDispatcher::new(pipeline, 1)
    }

    fn job(sender: &str) -> DigestJob {
        DigestJob {
            sender_id: sender.into(),
            term: "term".into(),
            limit: 5,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_never_exceeds_cap() {
        let search = Arc::new(SlowSearch::new(Duration::from_millis(50)));
        let gateway = Arc::new(CountingGateway::default());
        let pipeline = Arc::new(DigestPipeline::new(
            search.clone(),
            Summarizer::new(Box::new(UnusedClient), "model"),
            gateway.clone(),
            Arc::new(DigestMetrics::new()),
        ));
        let dispatcher = JobDispatcher::new(pipeline, 2);

        for index in 0..6 {
            dispatcher.dispatch(job(&format!("user-{index}")));
        }
        assert_eq!(dispatcher.in_flight(), 6);

        dispatcher.wait_idle().await;

        assert_eq!(dispatcher.in_flight(), 0);
        assert_eq!(search.peak.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.sent.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn dispatcher_is_reusable_after_wait() {
        let search = Arc::new(SlowSearch::new(Duration::from_millis(50)));
        let gateway = Arc::new(CountingGateway::default());
        let pipeline = Arc::new(DigestPipeline::new(
            search,
            Summarizer::new(Box::new(UnusedClient), "model"),
            gateway.clone(),
            Arc::new(DigestMetrics::new()),
        ));
        let dispatcher = JobDispatcher::new(pipeline, 1);

        dispatcher.dispatch(job("a"));
        dispatcher.wait_idle().await;
        dispatcher.dispatch(job("b"));
        dispatcher.wait_idle().await;

        assert_eq!(gateway.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn interrupt_abandons_long_running_jobs() {
        let dispatcher = dispatcher_with_delay(Duration::from_secs(3600));
        dispatcher.dispatch(job("a"));

        let drained = dispatcher
            .drain_until(tokio::time::sleep(Duration::from_secs(1)))
            .await;

        assert!(!drained);
        assert_eq!(dispatcher.in_flight(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_completes_when_jobs_finish_first() {
        let dispatcher = dispatcher_with_delay(Duration::from_millis(10));
        dispatcher.dispatch(job("a"));

        let drained = dispatcher.drain_until(std::future::pending()).await;

        assert!(drained);
        assert_eq!(dispatcher.in_flight(), 0);
    }
}
