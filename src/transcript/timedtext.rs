//! YouTube caption track fetched through the timedtext endpoint.

use super::{TranscriptEntry, TranscriptSource};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";

/// Fetches captions in the `json3` format.
pub struct TimedTextSource {
    client: reqwest::Client,
    language: String,
}

impl TimedTextSource {
    pub fn new(language: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            language: language.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Json3Track {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Segment>,
}

#[derive(Debug, Deserialize)]
struct Json3Segment {
    #[serde(default)]
    utf8: String,
}

/// Convert a json3 caption track into transcript entries, skipping empty events.
fn parse_json3(body: &str) -> Result<Vec<TranscriptEntry>> {
    let track: Json3Track = serde_json::from_str(body)?;

    let entries = track
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.replace('\n', " ").trim().to_string();
            if text.is_empty() {
                return None;
            }
            Some(TranscriptEntry::new(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
            ))
        })
        .collect();

    Ok(entries)
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    #[instrument(skip(self))]
    async fn fetch_transcript(&self, external_id: &str) -> Result<Vec<TranscriptEntry>> {
        let response = self
            .client
            .get(TIMEDTEXT_URL)
            .query(&[
                ("v", external_id),
                ("lang", self.language.as_str()),
                ("fmt", "json3"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TubeqaError::Upstream(format!(
                "Transcript request for {} returned {}",
                external_id,
                response.status()
            )));
        }

        let body = response.text().await?;
        // An empty body means the video has no captions in this language.
        if body.trim().is_empty() {
            return Err(TubeqaError::NotFound(format!(
                "No '{}' transcript available for video {}",
                self.language, external_id
            )));
        }

        let entries = parse_json3(&body)?;
        if entries.is_empty() {
            return Err(TubeqaError::NotFound(format!(
                "Transcript for video {} is empty",
                external_id
            )));
        }

        debug!("Fetched {} transcript entries", entries.len());
        Ok(entries)
    }
}
