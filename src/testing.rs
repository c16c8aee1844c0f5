//! Scripted collaborators for unit tests.

use crate::embedding::EmbeddingModel;
use crate::error::{Result, TubeqaError};
use crate::rag::{FragmentStream, GenerationModel};
use crate::vector_store::{
    MemoryVectorStore, NewChunk, NewQuestionAnswer, NewVideo, QuestionAnswer, ScoredChunk,
    ScoredQuestionAnswer, TranscriptChunk, VectorStore, Video,
};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Embedding model returning a deterministic vector per text.
pub struct FakeEmbeddingModel {
    dimensions: usize,
    pub calls: AtomicUsize,
    constant: Option<Vec<f32>>,
    drop_last: bool,
    output_len: Option<usize>,
    fail_on_call: Option<usize>,
    delay: Option<Duration>,
}

impl FakeEmbeddingModel {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            constant: None,
            drop_last: false,
            output_len: None,
            fail_on_call: None,
            delay: None,
        }
    }

    /// Every text embeds to `vector`.
    pub fn constant(vector: Vec<f32>) -> Self {
        let mut model = Self::new(vector.len());
        model.constant = Some(vector);
        model
    }

    /// Return one vector fewer than requested.
    pub fn drop_last_vector(mut self) -> Self {
        self.drop_last = true;
        self
    }

    /// Return vectors of length `len` regardless of the declared dimensions.
    pub fn with_output_len(mut self, len: usize) -> Self {
        self.output_len = Some(len);
        self
    }

    /// Fail the `call`-th request (1-based).
    pub fn fail_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// The vector this model returns for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some(vector) = &self.constant {
            return vector.clone();
        }

        let len = self.output_len.unwrap_or(self.dimensions);
        (0..len)
            .map(|i| {
                let mut hasher = DefaultHasher::new();
                (text, i).hash(&mut hasher);
                (hasher.finish() % 1000) as f32 / 1000.0 + 0.001
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingModel for FakeEmbeddingModel {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(TubeqaError::Upstream(format!("embedding call {} failed", call)));
        }

        let mut vectors: Vec<Vec<f32>> = texts.iter().map(|t| self.vector_for(t)).collect();
        if self.drop_last {
            vectors.pop();
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Generation model that streams a fixed list of fragments.
pub struct FakeGenerationModel {
    fragments: Vec<String>,
    fail_after: Option<usize>,
    fail_on_open: bool,
    delay: Option<Duration>,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeGenerationModel {
    pub fn new<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            fail_after: None,
            fail_on_open: false,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Yield `count` fragments, then an error.
    pub fn fail_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    /// Refuse to open the stream at all.
    pub fn fail_on_open(mut self) -> Self {
        self.fail_on_open = true;
        self
    }

    /// Wait before each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationModel for FakeGenerationModel {
    async fn generate_stream(&self, prompt: &str) -> Result<FragmentStream> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail_on_open {
            return Err(TubeqaError::Upstream("generation unavailable".to_string()));
        }

        let mut items: Vec<Result<String>> = self.fragments.iter().cloned().map(Ok).collect();
        if let Some(count) = self.fail_after {
            items.truncate(count);
            items.push(Err(TubeqaError::Upstream("generation stream broke".to_string())));
        }

        let delay = self.delay;
        let stream = futures::stream::iter(items).then(move |item| async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            item
        });
        Ok(Box::pin(stream))
    }
}

/// Memory store whose question/answer writes always fail.
pub struct FailingAnswerStore {
    inner: MemoryVectorStore,
}

impl FailingAnswerStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            inner: MemoryVectorStore::new(dimensions),
        }
    }
}

#[async_trait]
impl VectorStore for FailingAnswerStore {
    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn insert_video_with_chunks(&self, video: &NewVideo, chunks: &[NewChunk]) -> Result<Video> {
        self.inner.insert_video_with_chunks(video, chunks).await
    }

    async fn find_video_by_external_id(&self, external_id: &str) -> Result<Option<Video>> {
        self.inner.find_video_by_external_id(external_id).await
    }

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>> {
        self.inner.get_video(video_id).await
    }

    async fn list_videos(&self) -> Result<Vec<Video>> {
        self.inner.list_videos().await
    }

    async fn chunks_for_video(&self, video_id: i64) -> Result<Vec<TranscriptChunk>> {
        self.inner.chunks_for_video(video_id).await
    }

    async fn chunk_count(&self, video_id: i64) -> Result<usize> {
        self.inner.chunk_count(video_id).await
    }

    async fn search_chunks(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        self.inner
            .search_chunks(video_id, query_embedding, min_similarity, limit)
            .await
    }

    async fn insert_question_answer(&self, _qa: &NewQuestionAnswer) -> Result<QuestionAnswer> {
        Err(TubeqaError::Persistence("disk full".to_string()))
    }

    async fn search_question_answers(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredQuestionAnswer>> {
        self.inner
            .search_question_answers(video_id, query_embedding, min_similarity, limit)
            .await
    }

    async fn list_question_answers(&self, video_id: i64) -> Result<Vec<QuestionAnswer>> {
        self.inner.list_question_answers(video_id).await
    }
}

/// A minimal video row for seeding stores.
pub fn new_video(external_id: &str) -> NewVideo {
    NewVideo {
        external_id: external_id.to_string(),
        title: format!("Video {}", external_id),
        description: String::new(),
        thumbnail_url: String::new(),
        source_url: crate::video_source::watch_url(external_id),
        embed_url: crate::video_source::embed_url(external_id),
    }
}

/// Metadata source that describes any id it is asked about.
pub struct FakeMetadataSource;

#[async_trait]
impl crate::video_source::MetadataSource for FakeMetadataSource {
    async fn fetch_metadata(&self, external_id: &str) -> Result<crate::video_source::VideoMetadata> {
        Ok(crate::video_source::VideoMetadata {
            external_id: external_id.to_string(),
            title: format!("Video {}", external_id),
            description: String::new(),
            thumbnail_url: String::new(),
            source_url: crate::video_source::watch_url(external_id),
        })
    }
}

/// Transcript source returning the same entries for every video.
pub struct FakeTranscriptSource {
    pub entries: Vec<crate::transcript::TranscriptEntry>,
}

#[async_trait]
impl crate::transcript::TranscriptSource for FakeTranscriptSource {
    async fn fetch_transcript(&self, external_id: &str) -> Result<Vec<crate::transcript::TranscriptEntry>> {
        if self.entries.is_empty() {
            return Err(TubeqaError::NotFound(format!("No transcript for {}", external_id)));
        }
        Ok(self.entries.clone())
    }
}
