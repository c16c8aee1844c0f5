//! YouTube metadata source implementation.

use super::{watch_url, MetadataSource, VideoMetadata};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";
const OEMBED_URL: &str = "https://www.youtube.com/oembed";

/// Fetches video metadata from YouTube.
///
/// Uses the Data API v3 when an API key is configured, and falls back to the
/// keyless oEmbed endpoint otherwise (which has no description).
pub struct YoutubeMetadataSource {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl YoutubeMetadataSource {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
        })
    }

    async fn fetch_data_api(&self, api_key: &str, video_id: &str) -> Result<VideoMetadata> {
        let response = self
            .client
            .get(DATA_API_URL)
            .query(&[("id", video_id), ("key", api_key), ("part", "snippet")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TubeqaError::Upstream(format!(
                "YouTube Data API returned {} for video {}",
                response.status(),
                video_id
            )));
        }

        let list: VideoListResponse = response.json().await?;
        parse_video_list(list, video_id)
    }

    async fn fetch_oembed(&self, video_id: &str) -> Result<VideoMetadata> {
        let url = watch_url(video_id);
        let response = self
            .client
            .get(OEMBED_URL)
            .query(&[("url", url.as_str()), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND
            || status == reqwest::StatusCode::BAD_REQUEST
            || status == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(TubeqaError::NotFound(format!("Video {} not found", video_id)));
        }
        if !status.is_success() {
            return Err(TubeqaError::Upstream(format!(
                "oEmbed returned {} for video {}",
                status, video_id
            )));
        }

        let oembed: OEmbedResponse = response.json().await?;
        Ok(VideoMetadata {
            external_id: video_id.to_string(),
            title: oembed.title,
            description: String::new(),
            thumbnail_url: oembed.thumbnail_url.unwrap_or_default(),
            source_url: url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    title: String,
    thumbnail_url: Option<String>,
}

fn parse_video_list(list: VideoListResponse, video_id: &str) -> Result<VideoMetadata> {
    let item = list
        .items
        .into_iter()
        .next()
        .ok_or_else(|| TubeqaError::NotFound(format!("Video {} not found", video_id)))?;

    Ok(VideoMetadata {
        external_id: video_id.to_string(),
        title: item.snippet.title,
        description: item.snippet.description,
        thumbnail_url: item
            .snippet
            .thumbnails
            .default
            .map(|t| t.url)
            .unwrap_or_default(),
        source_url: watch_url(video_id),
    })
}

#[async_trait]
impl MetadataSource for YoutubeMetadataSource {
    #[instrument(skip(self))]
    async fn fetch_metadata(&self, external_id: &str) -> Result<VideoMetadata> {
        let metadata = match &self.api_key {
            Some(key) => self.fetch_data_api(key, external_id).await?,
            None => {
                debug!("No YouTube API key configured, using oEmbed");
                self.fetch_oembed(external_id).await?
            }
        };
        debug!("Fetched metadata: {}", metadata.title);
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_list() {
        let list: VideoListResponse = serde_json::from_str(
            r#"{"items": [{"snippet": {
                "title": "Rust in 100 Seconds",
                "description": "Fast.",
                "thumbnails": {"default": {"url": "https://i.ytimg.com/vi/x/default.jpg"}}
            }}]}"#,
        )
        .unwrap();

        let meta = parse_video_list(list, "5C_HPTJg5ek").unwrap();
        assert_eq!(meta.title, "Rust in 100 Seconds");
        assert_eq!(meta.description, "Fast.");
        assert_eq!(meta.thumbnail_url, "https://i.ytimg.com/vi/x/default.jpg");
        assert_eq!(meta.embed_url(), "https://www.youtube.com/embed/5C_HPTJg5ek");
    }

    #[test]
    fn test_empty_item_list_is_not_found() {
        let list: VideoListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        let err = parse_video_list(list, "missing").unwrap_err();
        assert!(matches!(err, TubeqaError::NotFound(_)));
    }
}
