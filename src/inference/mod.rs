//! Model capabilities consumed by the analysis pipeline.
//!
//! Each capability is a trait so the decision of which backend to use is
//! made once, at wiring time, instead of being re-probed all over the
//! call sites. Production backends live in this module; tests inject
//! deterministic stubs.

mod cloud;
mod embedder;

pub use cloud::CloudSummaryModel;
pub use embedder::FastEmbedder;

use anyhow::Result;
use async_trait::async_trait;

/// Text summarization backend.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    /// Whether the backend can serve requests at all. Probed once when the
    /// wrapping [`Summarizer`](crate::analysis::Summarizer) is built.
    fn is_available(&self) -> bool;

    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Sentence embedding backend. One call embeds a whole batch.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

/// Exact token counting, when a backend exposes its tokenizer.
#[async_trait]
pub trait TokenCountModel: Send + Sync {
    async fn count_tokens(&self, text: &str) -> Result<usize>;
}
