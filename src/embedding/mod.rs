//! Embedding generation for semantic search and retrieval.

mod openai;

pub use openai::OpenAIEmbeddingModel;

use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Trait for embedding model backends.
///
/// One call embeds one request's worth of texts; batching and validation live
/// in [`Embedder`].
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Generate one embedding per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

/// Batches texts through an [`EmbeddingModel`] and checks what comes back.
pub struct Embedder {
    model: Arc<dyn EmbeddingModel>,
    batch_size: usize,
    timeout: Duration,
}

impl Embedder {
    /// Create an embedder with the default batch size (100) and a 30 second timeout.
    pub fn new(model: Arc<dyn EmbeddingModel>) -> Self {
        Self {
            model,
            batch_size: 100,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the maximum number of texts per model call.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the timeout applied to each model call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Dimensionality every returned vector has.
    pub fn dimensions(&self) -> usize {
        self.model.dimensions()
    }

    /// Embed texts, preserving order and length.
    ///
    /// Fails as a whole if any batch times out, comes back empty, returns the
    /// wrong number of vectors, or returns a vector of the wrong length.
    #[instrument(skip(self, texts), fields(count = texts.len()))]
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let dimensions = self.dimensions();
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for (batch_index, batch) in texts.chunks(self.batch_size).enumerate() {
            let vectors = tokio::time::timeout(self.timeout, self.model.embed_batch(batch))
                .await
                .map_err(|_| {
                    TubeqaError::Embedding(format!(
                        "Batch {} timed out after {:?}",
                        batch_index, self.timeout
                    ))
                })??;

            if vectors.is_empty() {
                return Err(TubeqaError::Embedding(format!(
                    "Batch {} returned no vectors",
                    batch_index
                )));
            }
            if vectors.len() != batch.len() {
                return Err(TubeqaError::Embedding(format!(
                    "Batch {} returned {} vectors for {} inputs",
                    batch_index,
                    vectors.len(),
                    batch.len()
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
                return Err(TubeqaError::Embedding(format!(
                    "Batch {} returned a vector of length {} (expected {})",
                    batch_index,
                    bad.len(),
                    dimensions
                )));
            }

            all_embeddings.extend(vectors);
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    /// Embed a single text.
    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TubeqaError::Embedding("Empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEmbeddingModel;
    use std::sync::atomic::Ordering;

    fn texts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("text {}", i)).collect()
    }

    #[tokio::test]
    async fn test_embed_preserves_length_and_order_across_batches() {
        let model = Arc::new(FakeEmbeddingModel::new(3));
        let embedder = Embedder::new(model.clone()).with_batch_size(4);

        let input = texts(10);
        let vectors = embedder.embed(&input).await.unwrap();

        assert_eq!(vectors.len(), 10);
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
        for (text, vector) in input.iter().zip(&vectors) {
            assert_eq!(vector, &model.vector_for(text));
        }
    }

    #[tokio::test]
    async fn test_empty_input_skips_model() {
        let model = Arc::new(FakeEmbeddingModel::new(3));
        let embedder = Embedder::new(model.clone());

        assert!(embedder.embed(&[]).await.unwrap().is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_response_is_an_error() {
        let model = Arc::new(FakeEmbeddingModel::new(3).drop_last_vector());
        let embedder = Embedder::new(model);

        let err = embedder.embed(&texts(5)).await.unwrap_err();
        assert!(matches!(err, TubeqaError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_an_error() {
        let model = Arc::new(FakeEmbeddingModel::new(3).with_output_len(2));
        let embedder = Embedder::new(model);

        let err = embedder.embed_one("hello").await.unwrap_err();
        assert!(matches!(err, TubeqaError::Embedding(_)));
    }

    #[tokio::test]
    async fn test_failure_in_later_batch_fails_whole_call() {
        let model = Arc::new(FakeEmbeddingModel::new(3).fail_on_call(2));
        let embedder = Embedder::new(model).with_batch_size(2);

        assert!(embedder.embed(&texts(6)).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_model_times_out() {
        let model = Arc::new(FakeEmbeddingModel::new(3).with_delay(Duration::from_millis(200)));
        let embedder = Embedder::new(model).with_timeout(Duration::from_millis(10));

        let err = embedder.embed_one("slow").await.unwrap_err();
        assert!(matches!(err, TubeqaError::Embedding(_)));
    }
}
