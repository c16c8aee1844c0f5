//! tubeqa - Question answering over YouTube transcripts
//!
//! Ingests a video's timed transcript into a vector store and answers
//! questions about it, streaming the answer as it is generated.
//!
//! # Overview
//!
//! - Transcripts are split into overlapping windows of caption entries,
//!   embedded, and stored together with the video's metadata.
//! - A question is embedded, matched against the video's chunks and earlier
//!   answers, and turned into a prompt for a streaming chat model.
//! - Every completed answer is stored with its own embedding so later
//!   questions can reuse it.
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `transcript` - Timed transcript entries and sources
//! - `video_source` - YouTube id parsing and metadata
//! - `chunking` - Sliding-window transcript chunking
//! - `embedding` - Batched embedding generation
//! - `vector_store` - Video, chunk and answer storage with similarity search
//! - `ingestion` - Chunk, embed and store a video
//! - `rag` - Retrieval, prompt assembly and answer streaming
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use tubeqa::config::Settings;
//! use tubeqa::orchestrator::Orchestrator;
//! use tubeqa::rag::StreamEvent;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::new(settings)?;
//!
//!     let video = orchestrator.ingest_video("dQw4w9WgXcQ").await?;
//!
//!     let mut events: Vec<StreamEvent> = Vec::new();
//!     let answer = orchestrator
//!         .ask_question(video.id, "What is this video about?", &mut events)
//!         .await?;
//!     println!("{}", answer.answer);
//!
//!     Ok(())
//! }
//! ```

pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod transcript;
pub mod vector_store;
pub mod video_source;

#[cfg(test)]
mod testing;

pub use error::{Result, TubeqaError};
