use std::sync::Arc;

use log::warn;

use crate::inference::TokenCountModel;

const AVERAGE_CHARS_PER_TOKEN: usize = 4;

/// Token count estimation with a probed-once strategy.
///
/// If an exact counting capability is available when the estimator is
/// built, it is used for the estimator's whole lifetime; otherwise a
/// chars-per-token heuristic stands in. Estimation itself never fails: an
/// exact counter that errors at runtime falls back to the heuristic for
/// that call.
pub struct TokenEstimator {
    counter: Option<Arc<dyn TokenCountModel>>,
}

impl TokenEstimator {
    /// Fix the counting strategy: exact when a capability is present,
    /// heuristic when not.
    pub fn probe(counter: Option<Arc<dyn TokenCountModel>>) -> Self {
        Self { counter }
    }

    pub async fn estimate(&self, text: &str) -> usize {
        if let Some(counter) = &self.counter {
            match counter.count_tokens(text).await {
                Ok(count) => return count,
                Err(err) => {
                    warn!("exact token count failed, using heuristic: {err}");
                }
            }
        }
        heuristic_count(text)
    }
}

fn heuristic_count(text: &str) -> usize {
    text.chars().count().div_ceil(AVERAGE_CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::*;

    struct FixedCounter(usize);

    #[async_trait]
    impl TokenCountModel for FixedCounter {
        async fn count_tokens(&self, _text: &str) -> Result<usize> {
            Ok(self.0)
        }
    }

    struct FailingCounter;

    #[async_trait]
    impl TokenCountModel for FailingCounter {
        async fn count_tokens(&self, _text: &str) -> Result<usize> {
            bail!("tokenizer offline")
        }
    }

    #[tokio::test]
    async fn heuristic_rounds_up() {
        let estimator = TokenEstimator::probe(None);
        assert_eq!(estimator.estimate("").await, 0);
        assert_eq!(estimator.estimate("abcd").await, 1);
        assert_eq!(estimator.estimate("abcde").await, 2);
        assert_eq!(estimator.estimate(&"x".repeat(800)).await, 200);
    }

    #[tokio::test]
    async fn exact_counter_wins_when_probed() {
        let estimator = TokenEstimator::probe(Some(Arc::new(FixedCounter(42))));
        assert_eq!(estimator.estimate("anything at all").await, 42);
    }

    #[tokio::test]
    async fn failing_counter_falls_back_to_heuristic() {
        let estimator = TokenEstimator::probe(Some(Arc::new(FailingCounter)));
        assert_eq!(estimator.estimate("abcdefgh").await, 2);
    }
}
