//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `tickertalk-core` using fastembed's
//! BGESmallENV15 model (384 dimensions) with ONNX runtime inference.

use std::path::PathBuf;
use std::sync::Arc;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::Mutex;

use tickertalk_core::knowledge::embedder::Embedder;
use tickertalk_types::error::RepositoryError;

use super::schema::EMBEDDING_DIMENSION;

const MODEL_NAME: &str = "bge-small-en-v1.5";

/// Local embedder. Inference runs on the blocking pool.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load the model, downloading it into `cache_dir` on first use.
    pub fn new(cache_dir: PathBuf) -> Result<Self, RepositoryError> {
        std::fs::create_dir_all(&cache_dir).map_err(|e| {
            RepositoryError::Query(format!(
                "Failed to create model cache {}: {e}",
                cache_dir.display()
            ))
        })?;

        tracing::info!(model = MODEL_NAME, "Loading embedding model");
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::BGESmallENV15).with_cache_dir(cache_dir),
        )
        .map_err(|e| RepositoryError::Query(format!("Failed to load embedding model: {e}")))?;

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut model = model.blocking_lock();
            model.embed(texts, None)
        })
        .await
        .map_err(|e| RepositoryError::Query(format!("Embedding task failed: {e}")))?
        .map_err(|e| RepositoryError::Query(format!("Embedding failed: {e}")))
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIMENSION as usize
    }
}
