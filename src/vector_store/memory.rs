//! In-memory store implementation.
//!
//! Useful for testing and small datasets. Nothing survives a restart.

use super::{
    check_dimensions, rank_by_similarity, NewChunk, NewQuestionAnswer, NewVideo, QuestionAnswer,
    ScoredChunk, ScoredQuestionAnswer, TranscriptChunk, Video, VectorStore,
};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct State {
    videos: Vec<Video>,
    chunks: Vec<TranscriptChunk>,
    question_answers: Vec<QuestionAnswer>,
    next_video_id: i64,
    next_chunk_id: i64,
    next_qa_id: i64,
}

/// In-memory store.
pub struct MemoryVectorStore {
    state: RwLock<State>,
    dimensions: usize,
}

impl MemoryVectorStore {
    /// Create an empty store for vectors of length `dimensions`.
    pub fn new(dimensions: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            dimensions,
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| TubeqaError::Persistence(format!("Failed to acquire lock: {}", e)))
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn insert_video_with_chunks(&self, video: &NewVideo, chunks: &[NewChunk]) -> Result<Video> {
        for chunk in chunks {
            check_dimensions(self.dimensions, &chunk.embedding)?;
        }

        let mut state = self.write()?;
        if state.videos.iter().any(|v| v.external_id == video.external_id) {
            return Err(TubeqaError::DuplicateVideo(video.external_id.clone()));
        }

        // Validate everything before touching state so a failure writes nothing
        let mut seen = HashSet::new();
        for chunk in chunks {
            let key = (chunk.start_time.to_bits(), chunk.end_time.to_bits(), chunk.text.as_str());
            if !seen.insert(key) {
                return Err(TubeqaError::Persistence(format!(
                    "Duplicate chunk at {}s for video {}",
                    chunk.start_time, video.external_id
                )));
            }
        }

        state.next_video_id += 1;
        let stored = Video {
            id: state.next_video_id,
            external_id: video.external_id.clone(),
            title: video.title.clone(),
            description: video.description.clone(),
            thumbnail_url: video.thumbnail_url.clone(),
            source_url: video.source_url.clone(),
            embed_url: video.embed_url.clone(),
            created_at: Utc::now(),
        };
        state.videos.push(stored.clone());

        for chunk in chunks {
            state.next_chunk_id += 1;
            let id = state.next_chunk_id;
            state.chunks.push(TranscriptChunk {
                id,
                video_id: stored.id,
                text: chunk.text.clone(),
                start_time: chunk.start_time,
                end_time: chunk.end_time,
                embedding: chunk.embedding.clone(),
            });
        }

        Ok(stored)
    }

    async fn find_video_by_external_id(&self, external_id: &str) -> Result<Option<Video>> {
        let state = self.read()?;
        Ok(state.videos.iter().find(|v| v.external_id == external_id).cloned())
    }

    async fn get_video(&self, video_id: i64) -> Result<Option<Video>> {
        let state = self.read()?;
        Ok(state.videos.iter().find(|v| v.id == video_id).cloned())
    }

    async fn list_videos(&self) -> Result<Vec<Video>> {
        let state = self.read()?;
        Ok(state.videos.iter().rev().cloned().collect())
    }

    async fn chunks_for_video(&self, video_id: i64) -> Result<Vec<TranscriptChunk>> {
        let state = self.read()?;
        let mut chunks: Vec<TranscriptChunk> = state
            .chunks
            .iter()
            .filter(|c| c.video_id == video_id)
            .cloned()
            .collect();
        chunks.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(chunks)
    }

    async fn chunk_count(&self, video_id: i64) -> Result<usize> {
        let state = self.read()?;
        Ok(state.chunks.iter().filter(|c| c.video_id == video_id).count())
    }

    async fn search_chunks(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredChunk>> {
        check_dimensions(self.dimensions, query_embedding)?;

        let state = self.read()?;
        let candidates = state
            .chunks
            .iter()
            .filter(|c| c.video_id == video_id)
            .map(|c| (c.clone(), c.embedding.clone()));

        Ok(rank_by_similarity(candidates, query_embedding, min_similarity, limit)
            .into_iter()
            .map(|(chunk, similarity)| ScoredChunk { chunk, similarity })
            .collect())
    }

    async fn insert_question_answer(&self, qa: &NewQuestionAnswer) -> Result<QuestionAnswer> {
        if let Some(embedding) = &qa.answer_embedding {
            check_dimensions(self.dimensions, embedding)?;
        }

        let mut state = self.write()?;
        if !state.videos.iter().any(|v| v.id == qa.video_id) {
            return Err(TubeqaError::Persistence(format!(
                "No video with id {}",
                qa.video_id
            )));
        }

        state.next_qa_id += 1;
        let stored = QuestionAnswer {
            id: state.next_qa_id,
            video_id: qa.video_id,
            question: qa.question.clone(),
            answer: qa.answer.clone(),
            answer_embedding: qa.answer_embedding.clone(),
            most_relevant_timestamp: qa.most_relevant_timestamp,
            asked_at: Utc::now(),
        };
        state.question_answers.push(stored.clone());
        Ok(stored)
    }

    async fn search_question_answers(
        &self,
        video_id: i64,
        query_embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<ScoredQuestionAnswer>> {
        check_dimensions(self.dimensions, query_embedding)?;

        let state = self.read()?;
        let candidates = state
            .question_answers
            .iter()
            .filter(|qa| qa.video_id == video_id)
            .filter_map(|qa| Some((qa.clone(), qa.answer_embedding.clone()?)));

        Ok(rank_by_similarity(candidates, query_embedding, min_similarity, limit)
            .into_iter()
            .map(|(question_answer, similarity)| ScoredQuestionAnswer {
                question_answer,
                similarity,
            })
            .collect())
    }

    async fn list_question_answers(&self, video_id: i64) -> Result<Vec<QuestionAnswer>> {
        let state = self.read()?;
        Ok(state
            .question_answers
            .iter()
            .rev()
            .filter(|qa| qa.video_id == video_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_video(external_id: &str) -> NewVideo {
        NewVideo {
            external_id: external_id.to_string(),
            title: "Test Video".to_string(),
            description: String::new(),
            thumbnail_url: String::new(),
            source_url: String::new(),
            embed_url: String::new(),
        }
    }

    fn chunk(text: &str, start: f64, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            text: text.to_string(),
            start_time: start,
            end_time: start + 5.0,
            embedding,
        }
    }

    #[tokio::test]
    async fn test_memory_vector_store() {
        let store = MemoryVectorStore::new(3);

        let video = store
            .insert_video_with_chunks(
                &new_video("mem00000001"),
                &[
                    chunk("Goodbye world", 30.0, vec![0.0, 1.0, 0.0]),
                    chunk("Hello world", 0.0, vec![1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap();

        assert_eq!(store.chunk_count(video.id).await.unwrap(), 2);

        let ordered = store.chunks_for_video(video.id).await.unwrap();
        assert_eq!(ordered[0].text, "Hello world");

        let results = store
            .search_chunks(video.id, &[1.0, 0.0, 0.0], 0.0, 10)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "Hello world");
    }

    #[tokio::test]
    async fn test_ordering_and_limit() {
        let store = MemoryVectorStore::new(2);
        let sims = [0.6f32, 0.9, 0.7];
        let chunks: Vec<NewChunk> = sims
            .iter()
            .enumerate()
            .map(|(i, s)| chunk(&format!("c{}", i), i as f64, vec![*s, (1.0 - s * s).sqrt()]))
            .collect();
        let video = store
            .insert_video_with_chunks(&new_video("ord00000001"), &chunks)
            .await
            .unwrap();

        let results = store.search_chunks(video.id, &[1.0, 0.0], 0.5, 2).await.unwrap();
        let texts: Vec<&str> = results.iter().map(|r| r.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_duplicate_and_invalid_writes_leave_no_rows() {
        let store = MemoryVectorStore::new(3);
        store
            .insert_video_with_chunks(&new_video("dup00000001"), &[])
            .await
            .unwrap();

        let err = store
            .insert_video_with_chunks(&new_video("dup00000001"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, TubeqaError::DuplicateVideo(_)));

        let err = store
            .insert_video_with_chunks(
                &new_video("bad00000001"),
                &[
                    chunk("same", 0.0, vec![1.0, 0.0, 0.0]),
                    chunk("same", 0.0, vec![1.0, 0.0, 0.0]),
                ],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TubeqaError::Persistence(_)));

        let err = store
            .insert_video_with_chunks(&new_video("dim00000001"), &[chunk("x", 0.0, vec![1.0])])
            .await
            .unwrap_err();
        assert!(matches!(err, TubeqaError::DimensionMismatch { .. }));

        assert_eq!(store.list_videos().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_answers_without_embedding_are_listed_but_not_searched() {
        let store = MemoryVectorStore::new(3);
        let video = store
            .insert_video_with_chunks(&new_video("qa000000001"), &[])
            .await
            .unwrap();

        for (question, embedding) in [("first", Some(vec![0.0, 0.0, 1.0])), ("second", None)] {
            store
                .insert_question_answer(&NewQuestionAnswer {
                    video_id: video.id,
                    question: question.to_string(),
                    answer: "answer".to_string(),
                    answer_embedding: embedding,
                    most_relevant_timestamp: 0.0,
                })
                .await
                .unwrap();
        }

        let history = store.list_question_answers(video.id).await.unwrap();
        let questions: Vec<&str> = history.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(questions, vec!["second", "first"]);

        let matches = store
            .search_question_answers(video.id, &[0.0, 0.0, 1.0], 0.6, 3)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].question_answer.question, "first");

        assert!(store
            .search_question_answers(video.id, &[1.0, 0.0], 0.6, 3)
            .await
            .is_err());
    }
}
