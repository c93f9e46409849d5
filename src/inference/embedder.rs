use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use fastembed::{EmbeddingModel as FastembedModel, TextEmbedding, TextInitOptions};
use log::info;
use tokio::sync::Mutex;

use super::EmbeddingModel;

/// Local sentence embeddings via fastembed's `AllMiniLML6V2`
/// (sentence-transformers/all-MiniLM-L6-v2, 384-dim, mean pooling).
///
/// The ONNX model (~80 MB) is downloaded on first use and cached under the
/// app data directory, so construction is cheap and the first `embed` call
/// pays the initialization cost. `TextEmbedding::embed` takes `&mut self`
/// and is synchronous; calls are moved onto a blocking thread.
pub struct FastEmbedder {
    cache_dir: PathBuf,
    engine: Mutex<Option<TextEmbedding>>,
}

impl FastEmbedder {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            engine: Mutex::new(None),
        }
    }

    fn init_engine(cache_dir: PathBuf) -> Result<TextEmbedding> {
        info!(
            "Initializing embedding model (cache: {})",
            cache_dir.display()
        );
        TextEmbedding::try_new(
            TextInitOptions::new(FastembedModel::AllMiniLML6V2)
                .with_cache_dir(cache_dir)
                .with_show_download_progress(false),
        )
        .map_err(|err| anyhow!("failed to initialize embedding model: {err}"))
    }
}

#[async_trait]
impl EmbeddingModel for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut guard = self.engine.lock().await;

        let mut engine = match guard.take() {
            Some(engine) => engine,
            None => {
                let cache_dir = self.cache_dir.clone();
                tokio::task::spawn_blocking(move || Self::init_engine(cache_dir))
                    .await
                    .context("embedding init worker join failed")??
            }
        };

        let (engine, result) = tokio::task::spawn_blocking(move || {
            let result = engine.embed(texts, None);
            (engine, result)
        })
        .await
        .context("embedding worker join failed")?;

        *guard = Some(engine);

        result.map_err(|err| anyhow!("embedding inference failed: {err}"))
    }
}
