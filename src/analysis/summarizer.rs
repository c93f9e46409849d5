use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, warn};

use crate::inference::SummaryModel;

/// Single-flight wrapper around a summarization backend.
///
/// Availability is probed once at construction; an unavailable backend
/// turns every call into a logged no-op instead of an error. At most one
/// summarize call runs at a time per instance: a call that arrives while
/// another is outstanding is rejected immediately with `None` rather than
/// queued, so model invocations never overlap.
pub struct Summarizer {
    model: Arc<dyn SummaryModel>,
    available: bool,
    in_flight: AtomicBool,
    destroyed: AtomicBool,
}

impl Summarizer {
    pub fn new(model: Arc<dyn SummaryModel>) -> Self {
        let available = model.is_available();
        if !available {
            error!("Summarization capability is not available; scans will produce no signal");
        }

        Self {
            model,
            available,
            in_flight: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Summarize one unit of text. `None` means this unit produced nothing:
    /// backend unavailable, torn down, busy, errored, or returned an empty
    /// summary.
    pub async fn summarize(&self, text: &str) -> Option<String> {
        if self.destroyed.load(Ordering::Acquire) {
            warn!("summarize called after teardown");
            return None;
        }
        if !self.available {
            return None;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("summarization already in progress; request rejected");
            return None;
        }

        let result = match self.model.summarize(text).await {
            Ok(summary) if !summary.trim().is_empty() => Some(summary),
            Ok(_) => {
                warn!("summarization returned an empty summary");
                None
            }
            Err(err) => {
                error!("summarization failed: {err}");
                None
            }
        };

        self.in_flight.store(false, Ordering::Release);
        result
    }

    /// Release the backend. Further calls return `None`.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use tokio::time::Duration;

    use super::*;

    struct EchoModel {
        available: bool,
        delay: Duration,
    }

    #[async_trait]
    impl SummaryModel for EchoModel {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn summarize(&self, text: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(format!("summary of: {text}"))
        }
    }

    struct FailingModel;

    #[async_trait]
    impl SummaryModel for FailingModel {
        fn is_available(&self) -> bool {
            true
        }

        async fn summarize(&self, _text: &str) -> Result<String> {
            bail!("model exploded")
        }
    }

    #[tokio::test]
    async fn summarizes_when_available() {
        let summarizer = Summarizer::new(Arc::new(EchoModel {
            available: true,
            delay: Duration::ZERO,
        }));
        let summary = summarizer.summarize("some page text").await;
        assert_eq!(summary.as_deref(), Some("summary of: some page text"));
    }

    #[tokio::test]
    async fn unavailable_backend_yields_none() {
        let summarizer = Summarizer::new(Arc::new(EchoModel {
            available: false,
            delay: Duration::ZERO,
        }));
        assert!(summarizer.summarize("text").await.is_none());
    }

    #[tokio::test]
    async fn backend_error_yields_none() {
        let summarizer = Summarizer::new(Arc::new(FailingModel));
        assert!(summarizer.summarize("text").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_call_is_rejected_not_queued() {
        let summarizer = Arc::new(Summarizer::new(Arc::new(EchoModel {
            available: true,
            delay: Duration::from_secs(5),
        })));

        // join! polls left-to-right: the first call takes the slot and
        // parks on the sleep; the second must be rejected immediately.
        let (first, second) = tokio::join!(summarizer.summarize("one"), summarizer.summarize("two"));
        assert!(first.is_some());
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn calls_after_destroy_yield_none() {
        let summarizer = Summarizer::new(Arc::new(EchoModel {
            available: true,
            delay: Duration::ZERO,
        }));
        assert!(summarizer.summarize("before").await.is_some());

        summarizer.destroy();
        assert!(summarizer.summarize("after").await.is_none());
    }
}
