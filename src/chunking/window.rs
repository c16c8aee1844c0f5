//! Sliding-window chunking over transcript entries.

use super::TimedChunk;
use crate::error::{Result, TubeqaError};
use crate::transcript::TranscriptEntry;

/// Entry-count based chunker.
///
/// Each chunk holds `window_size` consecutive entries and the window advances
/// by `window_size - overlap` entries, so neighbouring chunks share `overlap`
/// entries.
#[derive(Debug, Clone, Copy)]
pub struct WindowChunker {
    window_size: usize,
    overlap: usize,
}

impl WindowChunker {
    /// Create a chunker. `overlap` must be smaller than `window_size`.
    pub fn new(window_size: usize, overlap: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(TubeqaError::Config("Chunk window size must be at least 1".to_string()));
        }
        if overlap >= window_size {
            return Err(TubeqaError::Config(format!(
                "Chunk overlap ({}) must be smaller than the window size ({})",
                overlap, window_size
            )));
        }
        Ok(Self { window_size, overlap })
    }

    /// Number of entries the window advances per chunk.
    pub fn stride(&self) -> usize {
        self.window_size - self.overlap
    }

    /// Split a transcript into overlapping chunks, in transcript order.
    pub fn chunk(&self, entries: &[TranscriptEntry]) -> Vec<TimedChunk> {
        (0..entries.len())
            .step_by(self.stride())
            .map(|start| {
                let end = (start + self.window_size).min(entries.len());
                let window = &entries[start..end];

                let text = window
                    .iter()
                    .map(|e| e.text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");

                // The window is never empty: start < entries.len()
                let first = &window[0];
                let last = &window[window.len() - 1];

                TimedChunk {
                    text,
                    start_seconds: first.offset_seconds,
                    end_seconds: last.end_seconds(),
                }
            })
            .collect()
    }
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self {
            window_size: 15,
            overlap: 3,
        }
    }
}
