//! Persistence of completed exchanges.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{NewQuestionAnswer, QuestionAnswer, VectorStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Embeds finished answers and appends them to the conversation history.
pub struct ConversationRecorder {
    store: Arc<dyn VectorStore>,
    embedder: Arc<Embedder>,
}

impl ConversationRecorder {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Store one question with its full answer.
    ///
    /// If the answer cannot be embedded the row is still written, without an
    /// embedding, and will never be retrieved as context.
    #[instrument(skip(self, question, answer), fields(answer_len = answer.len()))]
    pub async fn record(
        &self,
        video_id: i64,
        question: &str,
        answer: &str,
        most_relevant_timestamp: f64,
    ) -> Result<QuestionAnswer> {
        let answer_embedding = match self.embedder.embed_one(answer).await {
            Ok(embedding) => Some(embedding),
            Err(e) => {
                warn!("Failed to embed answer, storing without embedding: {}", e);
                None
            }
        };

        let record = self
            .store
            .insert_question_answer(&NewQuestionAnswer {
                video_id,
                question: question.to_string(),
                answer: answer.to_string(),
                answer_embedding,
                most_relevant_timestamp,
            })
            .await?;

        info!("Recorded answer {} for video {}", record.id, video_id);
        Ok(record)
    }
}
