//! Similarity retrieval of transcript chunks and prior answers.

use crate::config::RetrievalSettings;
use crate::error::Result;
use crate::vector_store::{ScoredChunk, ScoredQuestionAnswer, VectorStore};
use std::sync::Arc;
use tracing::{debug, instrument};

/// What a question retrieved, both lists ordered by similarity descending.
#[derive(Debug, Clone, Default)]
pub struct Retrieved {
    pub chunks: Vec<ScoredChunk>,
    pub qa_history: Vec<ScoredQuestionAnswer>,
}

impl Retrieved {
    /// Start of the best-matching chunk, or 0 when nothing matched.
    pub fn most_relevant_timestamp(&self) -> f64 {
        self.chunks.first().map(|c| c.chunk.start_time).unwrap_or(0.0)
    }
}

/// Runs the chunk and prior-answer searches for one video.
pub struct Retriever {
    store: Arc<dyn VectorStore>,
    settings: RetrievalSettings,
}

impl Retriever {
    pub fn new(store: Arc<dyn VectorStore>, settings: RetrievalSettings) -> Self {
        Self { store, settings }
    }

    /// Retrieve context for a question embedding. Finding nothing is not an error.
    #[instrument(skip(self, question_embedding))]
    pub async fn retrieve(&self, video_id: i64, question_embedding: &[f32]) -> Result<Retrieved> {
        let (chunks, qa_history) = tokio::try_join!(
            self.store.search_chunks(
                video_id,
                question_embedding,
                self.settings.chunk_min_similarity,
                self.settings.chunk_top_k,
            ),
            self.store.search_question_answers(
                video_id,
                question_embedding,
                self.settings.qa_min_similarity,
                self.settings.qa_top_m,
            ),
        )?;

        debug!(
            "Retrieved {} chunks and {} prior answers",
            chunks.len(),
            qa_history.len()
        );
        Ok(Retrieved { chunks, qa_history })
    }
}
