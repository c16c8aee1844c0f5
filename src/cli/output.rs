//! CLI output formatting utilities.

use crate::chunking::format_timestamp;
use crate::vector_store::{QuestionAnswer, Video};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one video line.
    pub fn video_info(video: &Video, chunks: usize) {
        println!(
            "  {} {} [{}] ({}, {} chunks)",
            style("*").cyan(),
            style(&video.title).bold(),
            video.id,
            style(&video.external_id).dim(),
            chunks
        );
    }

    /// Print one question/answer pair.
    pub fn question_answer(qa: &QuestionAnswer) {
        println!(
            "\n{} {} {}",
            style("Q").green().bold(),
            qa.question,
            style(format!(
                "@ {} ({})",
                format_timestamp(qa.most_relevant_timestamp),
                qa.asked_at.format("%Y-%m-%d %H:%M")
            ))
            .dim()
        );
        println!("{} {}", style("A").cyan().bold(), content_preview(&qa.answer, 300));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
