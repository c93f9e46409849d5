pub mod chunk;
pub mod config;
pub mod pipeline;
pub mod reduce;
pub mod similarity;
pub mod summarizer;
pub mod tokens;

pub use config::{threshold_for, AnalysisConfig};
pub use pipeline::{AnalysisPipeline, ContentAnalyzer, ContentVerdict};
pub use reduce::RecursiveSummarizer;
pub use similarity::SimilarityScorer;
pub use summarizer::Summarizer;
pub use tokens::TokenEstimator;
