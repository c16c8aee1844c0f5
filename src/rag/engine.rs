//! Question answering over one video.

use super::{
    assemble_prompt, AnswerGenerator, AnswerSink, AnswerStream, ConversationRecorder, Retrieved,
    Retriever, StreamEvent,
};
use crate::config::RetrievalSettings;
use crate::embedding::Embedder;
use crate::error::{Result, TubeqaError};
use crate::vector_store::{QuestionAnswer, VectorStore, Video};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// An exchange that has retrieved its context and opened a generation stream.
///
/// Nothing has been delivered or written yet; dropping it abandons the exchange.
pub struct PreparedExchange {
    pub exchange_id: Uuid,
    pub video: Video,
    pub question: String,
    pub retrieved: Retrieved,
    stream: AnswerStream,
}

impl PreparedExchange {
    pub fn most_relevant_timestamp(&self) -> f64 {
        self.retrieved.most_relevant_timestamp()
    }
}

/// RAG engine for question answering.
pub struct QaEngine {
    store: Arc<dyn VectorStore>,
    embedder: Arc<Embedder>,
    retriever: Retriever,
    generator: AnswerGenerator,
    recorder: ConversationRecorder,
}

impl QaEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<Embedder>,
        generator: AnswerGenerator,
        retrieval: RetrievalSettings,
    ) -> Self {
        Self {
            retriever: Retriever::new(store.clone(), retrieval),
            recorder: ConversationRecorder::new(store.clone(), embedder.clone()),
            store,
            embedder,
            generator,
        }
    }

    /// Validate the question, retrieve context and open the generation stream.
    ///
    /// Any failure here happens before an event is delivered or a row written.
    #[instrument(skip(self, question), fields(exchange_id = tracing::field::Empty))]
    pub async fn prepare(&self, video_id: i64, question: &str) -> Result<PreparedExchange> {
        let exchange_id = Uuid::new_v4();
        tracing::Span::current().record("exchange_id", tracing::field::display(exchange_id));

        let question = question.trim();
        if question.is_empty() {
            return Err(TubeqaError::Validation("Question is required".to_string()));
        }

        let video = self
            .store
            .get_video(video_id)
            .await?
            .ok_or_else(|| TubeqaError::NotFound(format!("Video {}", video_id)))?;

        debug!(stage = "embedding_question", "Embedding question");
        let question_embedding = self.embedder.embed_one(question).await?;

        debug!(stage = "retrieving", "Retrieving context");
        let retrieved = self.retriever.retrieve(video.id, &question_embedding).await?;

        let prompt = assemble_prompt(&retrieved.chunks, &retrieved.qa_history, question);

        debug!(stage = "generating", prompt_len = prompt.len(), "Opening generation stream");
        let stream = self.generator.open(&prompt).await?;

        Ok(PreparedExchange {
            exchange_id,
            video,
            question: question.to_string(),
            retrieved,
            stream,
        })
    }

    /// Stream the answer to `sink`, record it, then send `done`.
    ///
    /// On a generation or storage failure the sink gets an `error` event and
    /// nothing is written. If the sink goes away the exchange stops without a
    /// write and `Cancelled` is returned.
    #[instrument(skip_all, fields(exchange_id = %exchange.exchange_id, video_id = exchange.video.id))]
    pub async fn complete(
        &self,
        exchange: PreparedExchange,
        sink: &mut dyn AnswerSink,
    ) -> Result<QuestionAnswer> {
        let most_relevant_timestamp = exchange.most_relevant_timestamp();
        let PreparedExchange {
            video,
            question,
            stream,
            ..
        } = exchange;

        let answer = match stream.forward(sink).await {
            Ok(answer) => answer,
            Err(e) => return Err(Self::fail(sink, e, "generating").await),
        };

        let record = match self
            .recorder
            .record(video.id, &question, &answer, most_relevant_timestamp)
            .await
        {
            Ok(record) => record,
            Err(e) => return Err(Self::fail(sink, e, "recording").await),
        };

        let done = StreamEvent::Done {
            question_answer_id: record.id,
            most_relevant_timestamp,
        };
        if sink.emit(done).await.is_err() {
            debug!("Client left after the answer was recorded");
        }

        info!("Answered question on video {} ({} chars)", video.id, answer.len());
        Ok(record)
    }

    /// Run a whole exchange.
    pub async fn ask(
        &self,
        video_id: i64,
        question: &str,
        sink: &mut dyn AnswerSink,
    ) -> Result<QuestionAnswer> {
        let exchange = self.prepare(video_id, question).await?;
        self.complete(exchange, sink).await
    }

    async fn fail(sink: &mut dyn AnswerSink, err: TubeqaError, stage: &str) -> TubeqaError {
        if matches!(err, TubeqaError::Cancelled(_)) {
            info!(stage, "Exchange cancelled: {}", err);
            return err;
        }

        error!(stage, "Exchange failed: {}", err);
        let event = StreamEvent::Error {
            message: err.public_message(),
        };
        if sink.emit(event).await.is_err() {
            debug!("Client left before the error could be delivered");
        }
        err
    }
}
