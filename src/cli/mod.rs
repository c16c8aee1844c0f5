//! CLI module for tubeqa.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// tubeqa - Ask questions about YouTube videos
///
/// Ingests a video's transcript into a local vector store and answers
/// questions about it with a streaming language model.
#[derive(Parser, Debug)]
#[command(name = "tubeqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch, chunk, embed and store a video's transcript
    Ingest {
        /// YouTube URL or video ID
        url: String,

        /// Read the transcript from a JSON file instead of YouTube
        #[arg(short, long)]
        transcript: Option<String>,
    },

    /// Ask a question about an ingested video
    Ask {
        /// Video to ask about (YouTube URL, YouTube ID, or stored numeric ID)
        video: String,

        /// The question to ask
        question: String,
    },

    /// List ingested videos
    List,

    /// Show previous questions and answers for a video
    History {
        /// Video (YouTube URL, YouTube ID, or stored numeric ID)
        video: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from(["tubeqa", "-vv", "ask", "dQw4w9WgXcQ", "What is this?"]).unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask { video, question } => {
                assert_eq!(video, "dQw4w9WgXcQ");
                assert_eq!(question, "What is this?");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_ingest_with_transcript() {
        let cli = Cli::try_parse_from([
            "tubeqa",
            "ingest",
            "https://youtu.be/dQw4w9WgXcQ",
            "--transcript",
            "captions.json",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Ingest { transcript: Some(ref t), .. } if t == "captions.json"
        ));
    }
}
