//! Storage abstraction for tubeqa.
//!
//! Holds videos, their embedded transcript chunks, and the question/answer
//! history, and answers cosine-similarity queries over chunks and answers.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::{Result, TubeqaError};
use crate::video_source::VideoMetadata;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ingested video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: i64,
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub source_url: String,
    pub embed_url: String,
    pub created_at: DateTime<Utc>,
}

/// A video about to be written.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub source_url: String,
    pub embed_url: String,
}

impl From<VideoMetadata> for NewVideo {
    fn from(meta: VideoMetadata) -> Self {
        let embed_url = meta.embed_url();
        Self {
            external_id: meta.external_id,
            title: meta.title,
            description: meta.description,
            thumbnail_url: meta.thumbnail_url,
            source_url: meta.source_url,
            embed_url,
        }
    }
}

/// A stored, embedded span of a video's transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptChunk {
    pub id: i64,
    pub video_id: i64,
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(skip)]
    pub embedding: Vec<f32>,
}

/// A transcript chunk about to be written.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub embedding: Vec<f32>,
}

/// One completed exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnswer {
    pub id: i64,
    pub video_id: i64,
    pub question: String,
    pub answer: String,
    /// Absent when the answer could not be embedded; such rows are never retrieved as context.
    #[serde(skip)]
    pub answer_embedding: Option<Vec<f32>>,
    pub most_relevant_timestamp: f64,
    pub asked_at: DateTime<Utc>,
}

/// A question/answer row about to be written.
#[derive(Debug, Clone)]
pub struct NewQuestionAnswer {
    pub video_id: i64,
    pub question: String,
    pub answer: String,
    pub answer_embedding: Option<Vec<f32>>,
    pub most_relevant_timestamp: f64,
}

/// A chunk with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: TranscriptChunk,
    pub similarity: f32,
}

/// A prior answer with its similarity to a query.
#[derive(Debug, Clone)]
pub struct ScoredQuestionAnswer {
    pub question_answer: QuestionAnswer,
    pub similarity: f32,
}

/// Trait for storage backends.
///
/// Similarity searches keep only results strictly above `min_similarity`,
/// order them by similarity descending and cap them at `limit`. Equal
/// similarities keep insertion order.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Length every stored vector must have.
    fn dimensions(&self) -> usize;

    /// Write a video and all of its chunks as one unit.
    ///
    /// Fails with `DuplicateVideo` if the external id is already stored; any
    /// failure leaves neither the video nor any chunk behind.
    async fn insert_video_with_chunks(&self, video: &NewVideo, chunks: &[NewChunk]) -> Result<Video>;

    /// Look up a video by its platform id.
    async fn find_video_by_external_id(&self, external_id: &str) -> Result<Option<Video>>;

    /// Look up a video by its id.
    async fn get_video(&self, video_id: i64) -> Result<Option<Video>>;

    /// List all videos, newest first.
    async fn list_videos(&self) -> Result<Vec<Video>>;

    /// Chunks of a video ordered by start time.
    async fn chunks_for_video(&self, video_id: i64) -> Result<Vec<TranscriptChunk>>;

    /// Number of chunks stored for a video.
    async fn chunk_count(&self, video_id: i64) -> Result<usize>;

    /// Most similar chunks of one video.
    async fn search_chunks(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// Append a question/answer row.
    async fn insert_question_answer(&self, qa: &NewQuestionAnswer) -> Result<QuestionAnswer>;

    /// Most similar prior answers of one video. Rows without an embedding never match.
    async fn search_question_answers(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredQuestionAnswer>>;

    /// Question/answer history of a video, newest first.
    async fn list_question_answers(&self, video_id: i64) -> Result<Vec<QuestionAnswer>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Reject a vector whose length differs from the store's dimensionality.
pub(crate) fn check_dimensions(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(TubeqaError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

/// Score candidates against a query, keep those strictly above `min_similarity`,
/// and return the best `limit` in descending order.
///
/// The sort is stable, so candidates given in insertion order keep that order on ties.
pub(crate) fn rank_by_similarity<T>(
    candidates: impl IntoIterator<Item = (T, Vec<f32>)>,
    query_embedding: &[f32],
    min_similarity: f32,
    limit: usize,
) -> Vec<(T, f32)> {
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, embedding)| {
            let score = cosine_similarity(query_embedding, &embedding);
            (item, score)
        })
        .filter(|(_, score)| *score > min_similarity)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
}
