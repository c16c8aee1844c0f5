//! Ask command implementation.

use super::resolve_video;
use crate::chunking::format_timestamp;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::rag::{AnswerSink, StreamEvent};
use crate::video_source::watch_url;
use anyhow::Result;
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::io::Write;

/// Prints fragments to stdout as they arrive.
struct TerminalSink {
    spinner: ProgressBar,
    external_id: String,
}

#[async_trait]
impl AnswerSink for TerminalSink {
    async fn emit(&mut self, event: StreamEvent) -> crate::Result<()> {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
            println!();
        }

        match event {
            StreamEvent::Fragment { text } => {
                print!("{}", text);
                std::io::stdout().flush()?;
            }
            StreamEvent::Done {
                most_relevant_timestamp,
                ..
            } => {
                println!("\n");
                Output::kv(
                    "Most relevant moment",
                    &format!(
                        "{} {}&t={}s",
                        format_timestamp(most_relevant_timestamp),
                        watch_url(&self.external_id),
                        most_relevant_timestamp as u64
                    ),
                );
            }
            StreamEvent::Error { message } => {
                println!();
                Output::error(&message);
            }
        }
        Ok(())
    }
}

/// Run the ask command.
pub async fn run_ask(video: &str, question: &str, settings: Settings) -> Result<()> {
    let orchestrator = Orchestrator::new(settings)?;
    let video = resolve_video(&orchestrator, video).await?;

    let spinner = Output::spinner(&format!("Thinking about '{}'...", video.title));
    let exchange = match orchestrator.prepare_question(video.id, question).await {
        Ok(exchange) => exchange,
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to ask question: {}", e));
            return Err(e.into());
        }
    };

    let mut sink = TerminalSink {
        spinner,
        external_id: video.external_id.clone(),
    };
    orchestrator.complete_question(exchange, &mut sink).await?;

    Ok(())
}
