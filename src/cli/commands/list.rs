//! List command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the list command.
pub async fn run_list(settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;

    let videos = match orchestrator.list_videos().await {
        Ok(videos) => videos,
        Err(e) => {
            Output::error(&format!("Failed to list videos: {}", e));
            return Err(e.into());
        }
    };

    if videos.is_empty() {
        Output::info("No videos ingested yet. Use 'tubeqa ingest <url>' to add one.");
        return Ok(());
    }

    Output::header(&format!("Ingested Videos ({})", videos.len()));
    println!();

    let mut total_chunks = 0;
    for video in &videos {
        let chunks = orchestrator.chunk_count(video.id).await?;
        total_chunks += chunks;
        Output::video_info(video, chunks);
    }

    println!();
    Output::kv("Total videos", &videos.len().to_string());
    Output::kv("Total chunks", &total_chunks.to_string());

    Ok(())
}
