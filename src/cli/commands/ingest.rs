//! Ingest command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::TubeqaError;
use crate::orchestrator::Orchestrator;
use crate::transcript::FileTranscriptSource;
use anyhow::Result;

/// Run the ingest command.
pub async fn run_ingest(url: &str, transcript: Option<&str>, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let spinner = Output::spinner("Ingesting video...");
    let result = match transcript {
        Some(path) => {
            let source = FileTranscriptSource::new(path);
            orchestrator.ingest_video_with(url, &source).await
        }
        None => orchestrator.ingest_video(url).await,
    };
    spinner.finish_and_clear();

    match result {
        Ok(video) => {
            let chunks = orchestrator.chunk_count(video.id).await?;
            Output::success(&format!("Ingested '{}'", video.title));
            Output::kv("ID", &video.id.to_string());
            Output::kv("YouTube ID", &video.external_id);
            Output::kv("Chunks", &chunks.to_string());
            Ok(())
        }
        Err(TubeqaError::DuplicateVideo(id)) => {
            Output::warning(&format!("Video {} is already ingested.", id));
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Failed to ingest video: {}", e));
            Err(e.into())
        }
    }
}
