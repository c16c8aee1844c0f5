//! Timestamped transcripts and the sources they are fetched from.

mod file;
mod timedtext;

pub use file::FileTranscriptSource;
pub use timedtext::TimedTextSource;

use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One caption line of a video transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    /// Caption text.
    pub text: String,
    /// Offset from the start of the video, in seconds.
    #[serde(alias = "offset", alias = "offset_seconds")]
    pub offset_seconds: f64,
    /// How long the caption is shown, in seconds.
    #[serde(alias = "duration", alias = "duration_seconds")]
    pub duration_seconds: f64,
}

impl TranscriptEntry {
    /// Create a new transcript entry.
    pub fn new(text: impl Into<String>, offset_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            text: text.into(),
            offset_seconds,
            duration_seconds,
        }
    }

    /// End of this entry in seconds.
    pub fn end_seconds(&self) -> f64 {
        self.offset_seconds + self.duration_seconds
    }
}

/// Check that every entry has a finite, non-negative time span and that
/// offsets never go backwards.
pub fn validate_transcript(entries: &[TranscriptEntry]) -> Result<()> {
    let mut previous_offset = 0.0f64;
    for (i, entry) in entries.iter().enumerate() {
        let finite = entry.offset_seconds.is_finite() && entry.duration_seconds.is_finite();
        if !finite || entry.offset_seconds < 0.0 || entry.duration_seconds < 0.0 {
            return Err(TubeqaError::Validation(format!(
                "Transcript entry {} has an invalid time span (offset {}, duration {})",
                i, entry.offset_seconds, entry.duration_seconds
            )));
        }
        if entry.offset_seconds < previous_offset {
            return Err(TubeqaError::Validation(format!(
                "Transcript entry {} starts at {}s, before the previous entry at {}s",
                i, entry.offset_seconds, previous_offset
            )));
        }
        previous_offset = entry.offset_seconds;
    }
    Ok(())
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the ordered transcript of a video.
    ///
    /// Returns `NotFound` when the video has no transcript available.
    async fn fetch_transcript(&self, external_id: &str) -> Result<Vec<TranscriptEntry>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_negative_duration() {
        let entries = vec![
            TranscriptEntry::new("ok", 0.0, 1.0),
            TranscriptEntry::new("bad", 1.0, -0.5),
        ];
        let err = validate_transcript(&entries).unwrap_err();
        assert!(matches!(err, TubeqaError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_nan_offset() {
        let entries = vec![TranscriptEntry::new("bad", f64::NAN, 1.0)];
        assert!(validate_transcript(&entries).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_order_offsets() {
        let entries = vec![
            TranscriptEntry::new("late", 10.0, 1.0),
            TranscriptEntry::new("early", 0.0, 1.0),
        ];
        let err = validate_transcript(&entries).unwrap_err();
        assert!(matches!(err, TubeqaError::Validation(_)));

        let same_start = vec![
            TranscriptEntry::new("a", 2.0, 1.0),
            TranscriptEntry::new("b", 2.0, 0.5),
        ];
        assert!(validate_transcript(&same_start).is_ok());
    }

    #[test]
    fn test_entry_accepts_short_field_names() {
        let entry: TranscriptEntry =
            serde_json::from_str(r#"{"text":"hi","offset":2.0,"duration":1.5}"#).unwrap();
        assert_eq!(entry, TranscriptEntry::new("hi", 2.0, 1.5));
    }
}
