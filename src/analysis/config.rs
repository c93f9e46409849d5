use crate::db::models::TrackingMode;

/// Below this score a Broad-mode scan counts as a distraction.
pub const SIMILARITY_THRESHOLD_BROAD: f32 = 0.4;
/// Below this score a Specific-mode scan counts as a distraction.
/// Invariant: Specific is at least as strict as Broad.
pub const SIMILARITY_THRESHOLD_SPECIFIC: f32 = 0.5;

/// Threshold for the given mode. Looked up at scoring time, never cached
/// into the session, so a mode change applies to the next scan.
pub fn threshold_for(mode: TrackingMode) -> f32 {
    match mode {
        TrackingMode::Broad => SIMILARITY_THRESHOLD_BROAD,
        TrackingMode::Specific => SIMILARITY_THRESHOLD_SPECIFIC,
    }
}

/// Tunables for the summarize-and-score pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Window size for splitting page text before summarization, in chars.
    pub chunk_size: usize,

    /// Overlap between adjacent windows, in chars. Kept near 6-7% of the
    /// chunk size so context spanning a boundary survives the split.
    pub chunk_overlap: usize,

    /// Token budget for one summarization unit; batches of chunk summaries
    /// are closed when they would exceed it.
    pub max_summary_tokens: usize,

    /// Upper bound on reduction rounds before giving up on convergence.
    pub max_reduce_rounds: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3000,
            chunk_overlap: 200,
            max_summary_tokens: 800,
            max_reduce_rounds: 8,
        }
    }
}
