use std::sync::atomic::{AtomicBool, Ordering};

use crate::analysis::chunk::split_text;
use crate::analysis::config::AnalysisConfig;
use crate::analysis::summarizer::Summarizer;
use crate::analysis::tokens::TokenEstimator;

// Set to false to silence per-round logging on the analysis path
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Collapses arbitrarily long text into one summary under a token budget.
///
/// Each round splits the text into overlapping chunks, summarizes them in
/// order (failed chunks are skipped), and greedily packs the summaries into
/// newline-joined batches no larger than the budget. One batch is the
/// answer; several mean another round runs on the joined batches. Rounds
/// are bounded and must strictly shrink the text, so a backend that stops
/// shortening its input turns into a logged failure instead of a loop.
///
/// Only one top-level reduction may run at a time; a concurrent request is
/// rejected with `None` so batch state never interleaves.
pub struct RecursiveSummarizer {
    summarizer: Summarizer,
    tokens: TokenEstimator,
    config: AnalysisConfig,
    in_flight: AtomicBool,
}

impl RecursiveSummarizer {
    pub fn new(summarizer: Summarizer, tokens: TokenEstimator, config: AnalysisConfig) -> Self {
        Self {
            summarizer,
            tokens,
            config,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Reduce `text` to a single summary, or `None` if the pipeline
    /// produced no signal this cycle.
    pub async fn reduce(&self, text: &str) -> Option<String> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log_warn!("reduction already in progress; request rejected");
            return None;
        }

        let result = self.reduce_rounds(text).await;
        self.in_flight.store(false, Ordering::Release);
        result
    }

    async fn reduce_rounds(&self, text: &str) -> Option<String> {
        let mut current = text.to_string();

        for round in 0..self.config.max_reduce_rounds {
            let batches = self.summarize_round(&current).await;

            match batches.len() {
                0 => {
                    log_warn!("every chunk failed to summarize (round {round})");
                    return None;
                }
                1 => {
                    return batches.into_iter().next();
                }
                n => {
                    let combined = batches.join("\n");
                    if combined.chars().count() >= current.chars().count() {
                        log_warn!(
                            "reduction stopped shrinking on round {round} ({} -> {} chars); giving up",
                            current.chars().count(),
                            combined.chars().count()
                        );
                        return None;
                    }
                    log_info!(
                        "round {round}: {n} batches, {} -> {} chars",
                        current.chars().count(),
                        combined.chars().count()
                    );
                    current = combined;
                }
            }
        }

        log_warn!(
            "reduction did not converge after {} rounds",
            self.config.max_reduce_rounds
        );
        None
    }

    /// One round: chunk, summarize, pack into batches under the budget.
    async fn summarize_round(&self, text: &str) -> Vec<String> {
        let chunks = split_text(text, self.config.chunk_size, self.config.chunk_overlap);

        let mut batches: Vec<String> = Vec::new();
        let mut current_batch: Vec<String> = Vec::new();

        for chunk in &chunks {
            let trimmed = chunk.trim();
            if trimmed.is_empty() {
                continue;
            }

            let Some(summary) = self.summarizer.summarize(trimmed).await else {
                continue;
            };

            current_batch.push(summary);

            let combined = current_batch.join("\n");
            if self.tokens.estimate(&combined).await > self.config.max_summary_tokens {
                // The freshly added summary tipped the batch over: close the
                // batch without it and let it open the next one.
                if let Some(last) = current_batch.pop() {
                    if !current_batch.is_empty() {
                        batches.push(current_batch.join("\n"));
                        current_batch.clear();
                    }
                    current_batch.push(last);
                }
            }
        }

        if !current_batch.is_empty() {
            batches.push(current_batch.join("\n"));
        }

        batches
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use tokio::time::Duration;

    use super::*;
    use crate::inference::SummaryModel;

    /// Returns at most the first `keep` chars of its input, so every round
    /// strictly shrinks the text.
    struct ShorteningModel {
        keep: usize,
        delay: Duration,
    }

    #[async_trait]
    impl SummaryModel for ShorteningModel {
        fn is_available(&self) -> bool {
            true
        }

        async fn summarize(&self, text: &str) -> Result<String> {
            tokio::time::sleep(self.delay).await;
            Ok(text.chars().take(self.keep).collect())
        }
    }

    /// Always returns the same fixed-size summary, regardless of input, so
    /// combining summaries can grow the text instead of shrinking it.
    struct ConstantModel {
        output: String,
    }

    #[async_trait]
    impl SummaryModel for ConstantModel {
        fn is_available(&self) -> bool {
            true
        }

        async fn summarize(&self, _text: &str) -> Result<String> {
            Ok(self.output.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl SummaryModel for FailingModel {
        fn is_available(&self) -> bool {
            true
        }

        async fn summarize(&self, _text: &str) -> Result<String> {
            bail!("no summary for you")
        }
    }

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            chunk_size: 40,
            chunk_overlap: 4,
            max_summary_tokens: 10,
            max_reduce_rounds: 8,
        }
    }

    fn reducer_with(model: Arc<dyn SummaryModel>, config: AnalysisConfig) -> RecursiveSummarizer {
        RecursiveSummarizer::new(
            Summarizer::new(model),
            TokenEstimator::probe(None),
            config,
        )
    }

    #[tokio::test]
    async fn long_text_converges_under_the_budget() {
        let config = small_config();
        let reducer = reducer_with(
            Arc::new(ShorteningModel {
                keep: 10,
                delay: Duration::ZERO,
            }),
            config.clone(),
        );

        let text = "the quick brown fox jumps over the lazy dog ".repeat(12);
        let summary = reducer.reduce(&text).await.expect("should converge");

        let estimator = TokenEstimator::probe(None);
        assert!(
            estimator.estimate(&summary).await <= config.max_summary_tokens,
            "final summary must fit the token budget"
        );
    }

    #[tokio::test]
    async fn short_text_is_a_single_round() {
        let reducer = reducer_with(
            Arc::new(ShorteningModel {
                keep: 10,
                delay: Duration::ZERO,
            }),
            small_config(),
        );

        let summary = reducer.reduce("just a short line").await;
        assert_eq!(summary.as_deref(), Some("just a sho"));
    }

    #[tokio::test]
    async fn all_chunks_failing_yields_none() {
        let reducer = reducer_with(Arc::new(FailingModel), small_config());
        let text = "some page text ".repeat(20);
        assert!(reducer.reduce(&text).await.is_none());
    }

    #[tokio::test]
    async fn non_shrinking_backend_is_detected() {
        // Every "summary" is 100 chars, so joining batches grows the text
        // and the convergence guard must fire instead of looping.
        let reducer = reducer_with(
            Arc::new(ConstantModel {
                output: "n".repeat(100),
            }),
            small_config(),
        );

        let text = "some page text ".repeat(20);
        assert!(reducer.reduce(&text).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reduction_is_rejected() {
        let reducer = Arc::new(reducer_with(
            Arc::new(ShorteningModel {
                keep: 10,
                delay: Duration::from_secs(1),
            }),
            small_config(),
        ));

        let (first, second) = tokio::join!(reducer.reduce("focus text"), reducer.reduce("other"));
        assert!(first.is_some());
        assert!(second.is_none());
    }
}
