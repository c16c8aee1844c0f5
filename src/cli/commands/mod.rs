//! CLI command implementations.

mod ask;
mod config;
mod history;
mod ingest;
mod list;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use history::run_history;
pub use ingest::run_ingest;
pub use list::run_list;
pub use serve::run_serve;

use crate::error::Result;
use crate::orchestrator::Orchestrator;
use crate::vector_store::Video;
use crate::video_source::extract_video_id;

/// Find a stored video from a YouTube URL, YouTube ID, or stored numeric ID.
async fn resolve_video(orchestrator: &Orchestrator, reference: &str) -> Result<Video> {
    if extract_video_id(reference).is_none() {
        if let Ok(id) = reference.trim().parse::<i64>() {
            return orchestrator.get_video(id).await;
        }
    }
    orchestrator.find_video(reference).await
}
