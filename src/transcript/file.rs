//! Transcripts read from JSON files on disk.

use super::{TranscriptEntry, TranscriptSource};
use crate::error::{Result, TubeqaError};
use async_trait::async_trait;
use std::path::PathBuf;

/// Reads a transcript from a JSON array of `{text, offset, duration}` objects.
///
/// The same file is returned for any external id, which makes this useful for
/// offline ingestion and for videos whose captions cannot be fetched.
pub struct FileTranscriptSource {
    path: PathBuf,
}

impl FileTranscriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TranscriptSource for FileTranscriptSource {
    async fn fetch_transcript(&self, _external_id: &str) -> Result<Vec<TranscriptEntry>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TubeqaError::NotFound(format!("Transcript file {:?} does not exist", self.path))
            } else {
                TubeqaError::Io(e)
            }
        })?;

        let entries: Vec<TranscriptEntry> = serde_json::from_str(&content)?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reads_json_transcript() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"text":"a","offset":0,"duration":1}},{{"text":"b","offsetSeconds":1,"durationSeconds":1}}]"#
        )
        .unwrap();

        let source = FileTranscriptSource::new(file.path());
        let entries = source.fetch_transcript("ignored").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].text, "b");
        assert!((entries[1].offset_seconds - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let source = FileTranscriptSource::new("/definitely/not/here.json");
        let err = source.fetch_transcript("x").await.unwrap_err();
        assert!(matches!(err, TubeqaError::NotFound(_)));
    }
}
