//! Ingestion of a video transcript into retrievable chunks.

use crate::chunking::WindowChunker;
use crate::embedding::Embedder;
use crate::error::{Result, TubeqaError};
use crate::transcript::{validate_transcript, TranscriptEntry};
use crate::vector_store::{NewChunk, NewVideo, VectorStore, Video};
use crate::video_source::VideoMetadata;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument};

/// Chunks, embeds and stores a video's transcript.
pub struct IngestionPipeline {
    store: Arc<dyn VectorStore>,
    embedder: Arc<Embedder>,
    chunker: WindowChunker,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl IngestionPipeline {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<Embedder>, chunker: WindowChunker) -> Self {
        Self {
            store,
            embedder,
            chunker,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Ingest one video.
    ///
    /// Rejects a video that is already stored or currently being ingested
    /// with `DuplicateVideo` before doing any work. The video row and all of
    /// its chunks are written together, so a failure leaves nothing behind.
    #[instrument(skip(self, transcript, metadata), fields(entries = transcript.len()))]
    pub async fn ingest(
        &self,
        external_id: &str,
        transcript: &[TranscriptEntry],
        metadata: VideoMetadata,
    ) -> Result<Video> {
        let _guard = self.claim(external_id)?;

        if self.store.find_video_by_external_id(external_id).await?.is_some() {
            return Err(TubeqaError::DuplicateVideo(external_id.to_string()));
        }
        if metadata.external_id != external_id {
            return Err(TubeqaError::Validation(format!(
                "Metadata is for video {}, not {}",
                metadata.external_id, external_id
            )));
        }

        if transcript.is_empty() {
            return Err(TubeqaError::Validation(format!(
                "Transcript for video {} is empty",
                external_id
            )));
        }
        validate_transcript(transcript)?;

        let chunks = self.chunker.chunk(transcript);
        debug!("Created {} chunks", chunks.len());

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(TubeqaError::Ingestion(format!(
                "Got {} embeddings for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let new_chunks: Vec<NewChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| NewChunk {
                text: chunk.text,
                start_time: chunk.start_seconds,
                end_time: chunk.end_seconds,
                embedding,
            })
            .collect();

        let video = self
            .store
            .insert_video_with_chunks(&NewVideo::from(metadata), &new_chunks)
            .await?;

        info!(
            "Ingested video {} ({}) with {} chunks",
            video.id,
            video.external_id,
            new_chunks.len()
        );
        Ok(video)
    }

    fn claim(&self, external_id: &str) -> Result<InFlightGuard> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|e| TubeqaError::Ingestion(format!("Failed to acquire lock: {}", e)))?;

        if !in_flight.insert(external_id.to_string()) {
            return Err(TubeqaError::DuplicateVideo(format!(
                "{} (ingestion already in progress)",
                external_id
            )));
        }

        Ok(InFlightGuard {
            in_flight: self.in_flight.clone(),
            external_id: external_id.to_string(),
        })
    }
}

/// Releases an in-flight claim when dropped.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    external_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(&self.external_id);
        }
    }
}
