/// Text embedding seam
///
/// The pipeline treats the embedding model as a black box behind the
/// [`Embedder`] trait; the local implementation runs sentence-transformer
/// models through fastembed when the `local-embeddings` feature is on.
use async_trait::async_trait;

use crate::error::EngineResult;

/// Maps text to a fixed-length vector.
///
/// Empty or otherwise unembeddable input surfaces as a typed embedding
/// error, never a silently defaulted vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Output dimensionality of this model.
    fn dims(&self) -> usize;
}

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

#[cfg(feature = "local-embeddings")]
mod local {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use crate::error::{EngineError, EngineResult};
    use crate::services::embedding::Embedder;

    /// Local embedding model. Downloaded from Hugging Face on first use and
    /// cached; inference runs on the blocking thread pool.
    pub struct LocalEmbedder {
        model: Arc<Mutex<fastembed::TextEmbedding>>,
        dims: usize,
    }

    impl LocalEmbedder {
        pub fn new(model_name: &str) -> EngineResult<Self> {
            let (model, dims) = resolve_model(model_name)?;
            let text_embedding = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(model).with_show_download_progress(true),
            )
            .map_err(|e| {
                EngineError::Embedding(format!("failed to initialize embedding model: {}", e))
            })?;

            Ok(Self {
                model: Arc::new(Mutex::new(text_embedding)),
                dims,
            })
        }
    }

    fn resolve_model(name: &str) -> EngineResult<(fastembed::EmbeddingModel, usize)> {
        match name {
            "all-minilm-l6-v2" => Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
            "multilingual-e5-small" => Ok((fastembed::EmbeddingModel::MultilingualE5Small, 384)),
            other => Err(EngineError::Embedding(format!(
                "unknown embedding model '{}'. Supported models: \
                 all-minilm-l6-v2, bge-small-en-v1.5, multilingual-e5-small",
                other
            ))),
        }
    }

    #[async_trait]
    impl Embedder for LocalEmbedder {
        async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
            if text.trim().is_empty() {
                return Err(EngineError::Embedding(
                    "cannot embed empty text".to_string(),
                ));
            }

            let model = self.model.clone();
            let text = text.to_string();
            let mut vectors = tokio::task::spawn_blocking(move || {
                let mut model = model
                    .lock()
                    .map_err(|_| EngineError::Embedding("model lock poisoned".to_string()))?;
                model
                    .embed(vec![text], None)
                    .map_err(|e| EngineError::Embedding(e.to_string()))
            })
            .await
            .map_err(|e| EngineError::Embedding(format!("embedding task failed: {}", e)))??;

            vectors
                .pop()
                .ok_or_else(|| EngineError::Embedding("model returned no vector".to_string()))
        }

        fn dims(&self) -> usize {
            self.dims
        }
    }
}
