use std::sync::Arc;

use log::warn;

use crate::inference::EmbeddingModel;

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Returns `None` for mismatched dimensions or when either vector has zero
/// magnitude; the quotient is undefined there, and treating it as "no
/// signal" keeps a degenerate embedding from counting as a distraction.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }

    Some(dot / (norm_a * norm_b))
}

/// Scores how semantically close two strings are by embedding both in one
/// batched call and taking the cosine of the vectors.
pub struct SimilarityScorer {
    model: Arc<dyn EmbeddingModel>,
}

impl SimilarityScorer {
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self { model }
    }

    /// `None` when the embedding backend fails or returns unusable vectors;
    /// the caller treats that cycle as having produced no signal.
    pub async fn score(&self, text_a: &str, text_b: &str) -> Option<f32> {
        let embeddings = match self
            .model
            .embed(vec![text_a.to_string(), text_b.to_string()])
            .await
        {
            Ok(embeddings) => embeddings,
            Err(err) => {
                warn!("embedding failed: {err}");
                return None;
            }
        };

        let [vec_a, vec_b] = embeddings.as_slice() else {
            warn!(
                "embedding backend returned {} vectors for 2 inputs",
                embeddings.len()
            );
            return None;
        };

        cosine_similarity(vec_a, vec_b)
    }
}
