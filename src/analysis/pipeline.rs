use async_trait::async_trait;

use crate::analysis::reduce::RecursiveSummarizer;
use crate::analysis::similarity::SimilarityScorer;

/// Outcome of analyzing one content sample against the goal.
#[derive(Debug, Clone)]
pub struct ContentVerdict {
    /// Cosine similarity between the goal and the content summary.
    pub score: f32,
    /// The summary that was scored, kept for the distraction record.
    pub summary: String,
}

/// Scores page content against a goal. `None` means the cycle produced no
/// signal and contributes nothing to the session.
#[async_trait]
pub trait ContentAnalyzer: Send + Sync {
    async fn analyze(&self, goal: &str, content: &str) -> Option<ContentVerdict>;
}

/// The production pipeline: recursively summarize the content under the
/// token budget, then embed goal and summary and take their cosine.
pub struct AnalysisPipeline {
    reducer: RecursiveSummarizer,
    scorer: SimilarityScorer,
}

impl AnalysisPipeline {
    pub fn new(reducer: RecursiveSummarizer, scorer: SimilarityScorer) -> Self {
        Self { reducer, scorer }
    }
}

#[async_trait]
impl ContentAnalyzer for AnalysisPipeline {
    async fn analyze(&self, goal: &str, content: &str) -> Option<ContentVerdict> {
        let summary = self.reducer.reduce(content).await?;
        let score = self.scorer.score(goal, &summary).await?;
        Some(ContentVerdict { score, summary })
    }
}
