//! Pipeline orchestrator for tubeqa.
//!
//! Builds every component once from [`Settings`] and exposes the operations
//! the CLI and the HTTP server need.

use crate::chunking::WindowChunker;
use crate::config::Settings;
use crate::embedding::{Embedder, EmbeddingModel, OpenAIEmbeddingModel};
use crate::error::{Result, TubeqaError};
use crate::ingestion::IngestionPipeline;
use crate::openai::create_client_with;
use crate::rag::{
    AnswerGenerator, AnswerSink, GenerationModel, OpenAIGenerationModel, PreparedExchange, QaEngine,
};
use crate::transcript::{TimedTextSource, TranscriptSource};
use crate::vector_store::{MemoryVectorStore, QuestionAnswer, SqliteVectorStore, VectorStore, Video};
use crate::video_source::{extract_video_id, MetadataSource, YoutubeMetadataSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

/// The main orchestrator for the tubeqa pipeline.
pub struct Orchestrator {
    settings: Settings,
    store: Arc<dyn VectorStore>,
    metadata_source: Arc<dyn MetadataSource>,
    transcript_source: Arc<dyn TranscriptSource>,
    ingestion: IngestionPipeline,
    engine: QaEngine,
}

impl Orchestrator {
    /// Create an orchestrator with the configured providers.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = create_client_with(
            settings.openai.api_base.as_deref(),
            Duration::from_secs(settings.openai.timeout_secs),
        )?;
        let dimensions = settings.embedding.dimensions as usize;

        let embedding_model = Arc::new(OpenAIEmbeddingModel::new(
            client.clone(),
            &settings.embedding.model,
            dimensions,
        ));
        let generation_model = Arc::new(
            OpenAIGenerationModel::new(client, &settings.generation.model)
                .with_temperature(settings.generation.temperature),
        );

        let store: Arc<dyn VectorStore> = match settings.vector_store.provider.as_str() {
            "sqlite" => Arc::new(SqliteVectorStore::new(&settings.sqlite_path(), dimensions)?),
            "memory" => Arc::new(MemoryVectorStore::new(dimensions)),
            other => {
                return Err(TubeqaError::Config(format!(
                    "Unknown vector store provider: {}",
                    other
                )))
            }
        };

        if settings.youtube.api_key.is_none() {
            info!("No YouTube API key configured, using oEmbed for metadata");
        }
        let metadata_source = Arc::new(YoutubeMetadataSource::new(settings.youtube.api_key.clone())?);
        let transcript_source = Arc::new(TimedTextSource::new(&settings.youtube.transcript_language)?);

        Self::with_components(
            settings,
            store,
            embedding_model,
            generation_model,
            metadata_source,
            transcript_source,
        )
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: Settings,
        store: Arc<dyn VectorStore>,
        embedding_model: Arc<dyn EmbeddingModel>,
        generation_model: Arc<dyn GenerationModel>,
        metadata_source: Arc<dyn MetadataSource>,
        transcript_source: Arc<dyn TranscriptSource>,
    ) -> Result<Self> {
        if store.dimensions() != embedding_model.dimensions() {
            return Err(TubeqaError::Config(format!(
                "Store expects {}-dimensional vectors but the embedding model produces {}",
                store.dimensions(),
                embedding_model.dimensions()
            )));
        }

        let embedder = Arc::new(
            Embedder::new(embedding_model)
                .with_batch_size(settings.embedding.batch_size)
                .with_timeout(Duration::from_secs(settings.embedding.timeout_secs)),
        );
        let chunker = WindowChunker::new(settings.chunking.window_size, settings.chunking.overlap)?;
        let ingestion = IngestionPipeline::new(store.clone(), embedder.clone(), chunker);

        let generator = AnswerGenerator::new(generation_model)
            .with_timeout(Duration::from_secs(settings.generation.timeout_secs));
        let engine = QaEngine::new(store.clone(), embedder, generator, settings.retrieval.clone());

        Ok(Self {
            settings,
            store,
            metadata_source,
            transcript_source,
            ingestion,
            engine,
        })
    }

    /// Get the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Ingest a video from a URL or bare id, fetching its transcript from YouTube.
    pub async fn ingest_video(&self, url: &str) -> Result<Video> {
        self.ingest_video_with(url, self.transcript_source.as_ref()).await
    }

    /// Ingest a video, taking the transcript from `transcripts`.
    #[instrument(skip(self, transcripts))]
    pub async fn ingest_video_with(
        &self,
        url: &str,
        transcripts: &dyn TranscriptSource,
    ) -> Result<Video> {
        let external_id = extract_video_id(url)
            .ok_or_else(|| TubeqaError::Validation(format!("Not a YouTube video URL or id: {}", url)))?;

        // Fail fast before any network call; the pipeline checks again under its guard
        if self.store.find_video_by_external_id(&external_id).await?.is_some() {
            return Err(TubeqaError::DuplicateVideo(external_id));
        }

        info!("Fetching metadata for {}", external_id);
        let metadata = self.metadata_source.fetch_metadata(&external_id).await?;

        info!("Fetching transcript for {}", external_id);
        let transcript = transcripts.fetch_transcript(&external_id).await?;

        self.ingestion.ingest(&external_id, &transcript, metadata).await
    }

    /// First half of an exchange: everything up to an open generation stream.
    pub async fn prepare_question(&self, video_id: i64, question: &str) -> Result<PreparedExchange> {
        self.engine.prepare(video_id, question).await
    }

    /// Second half of an exchange: stream, record, and finish.
    pub async fn complete_question(
        &self,
        exchange: PreparedExchange,
        sink: &mut dyn AnswerSink,
    ) -> Result<QuestionAnswer> {
        self.engine.complete(exchange, sink).await
    }

    /// Ask a question about a video, streaming the answer to `sink`.
    pub async fn ask_question(
        &self,
        video_id: i64,
        question: &str,
        sink: &mut dyn AnswerSink,
    ) -> Result<QuestionAnswer> {
        self.engine.ask(video_id, question, sink).await
    }

    /// All ingested videos, newest first.
    pub async fn list_videos(&self) -> Result<Vec<Video>> {
        self.store.list_videos().await
    }

    pub async fn get_video(&self, video_id: i64) -> Result<Video> {
        self.store
            .get_video(video_id)
            .await?
            .ok_or_else(|| TubeqaError::NotFound(format!("Video {}", video_id)))
    }

    /// Look a video up by URL or bare platform id.
    pub async fn find_video(&self, url: &str) -> Result<Video> {
        let external_id = extract_video_id(url)
            .ok_or_else(|| TubeqaError::Validation(format!("Not a YouTube video URL or id: {}", url)))?;
        self.store
            .find_video_by_external_id(&external_id)
            .await?
            .ok_or_else(|| TubeqaError::NotFound(format!("Video {}", external_id)))
    }

    pub async fn chunk_count(&self, video_id: i64) -> Result<usize> {
        let video = self.get_video(video_id).await?;
        self.store.chunk_count(video.id).await
    }

    /// Question/answer history of a video, newest first.
    pub async fn conversation_history(&self, video_id: i64) -> Result<Vec<QuestionAnswer>> {
        let video = self.get_video(video_id).await?;
        self.store.list_question_answers(video.id).await
    }
}
