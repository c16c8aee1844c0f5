//! History command implementation.

use super::resolve_video;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the history command.
pub async fn run_history(video: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let video = resolve_video(&orchestrator, video).await?;
    let history = orchestrator.conversation_history(video.id).await?;

    if history.is_empty() {
        Output::info(&format!("No questions asked about '{}' yet.", video.title));
        return Ok(());
    }

    Output::header(&format!("{} ({} questions)", video.title, history.len()));
    for qa in &history {
        Output::question_answer(qa);
    }

    Ok(())
}
