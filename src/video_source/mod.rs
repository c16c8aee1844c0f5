//! Video metadata lookup.
//!
//! Provides a trait-based interface for metadata providers and the URL parsing
//! used to turn user input into an external video id.

mod youtube;

pub use youtube::YoutubeMetadataSource;

use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Metadata about a video, as returned by the metadata provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Platform video id (e.g. the 11-character YouTube id).
    pub external_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    /// Canonical watch URL of the video.
    pub source_url: String,
}

impl VideoMetadata {
    /// Player URL suitable for an iframe.
    pub fn embed_url(&self) -> String {
        embed_url(&self.external_id)
    }
}

/// Build the embeddable player URL for a video id.
pub fn embed_url(external_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", external_id)
}

/// Build the canonical watch URL for a video id.
pub fn watch_url(external_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", external_id)
}

/// Trait for video metadata providers.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch metadata for a video. Returns `NotFound` for unknown ids.
    async fn fetch_metadata(&self, external_id: &str) -> Result<VideoMetadata>;
}

static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    // Matches various YouTube URL formats and bare video IDs
    Regex::new(
        r"(?x)
        (?:
            (?:https?://)?
            (?:www\.|m\.)?
            (?:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/|youtube\.com/shorts/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("Invalid regex")
});

/// Extract the YouTube video id from a URL or bare id.
pub fn extract_video_id(input: &str) -> Option<String> {
    let input = input.trim();

    // `v` may appear anywhere in the query string, e.g. `watch?feature=share&v=...`
    if let Ok(parsed) = url::Url::parse(input) {
        let is_youtube = parsed
            .host_str()
            .is_some_and(|h| h == "youtube.com" || h.ends_with(".youtube.com"));
        if is_youtube && parsed.path() == "/watch" {
            if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                return VIDEO_ID_REGEX
                    .captures(&v)
                    .and_then(|c| c.get(2))
                    .map(|m| m.as_str().to_string());
            }
        }
    }

    let caps = VIDEO_ID_REGEX.captures(input)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}
