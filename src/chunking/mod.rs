//! Transcript chunking.
//!
//! Splits a timestamped transcript into overlapping windows of caption lines,
//! which become the unit of retrieval.

mod window;

pub use window::WindowChunker;

use serde::{Deserialize, Serialize};

/// A time-bounded span of transcript text, before it is embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedChunk {
    /// Caption texts of the window joined by single spaces.
    pub text: String,
    /// Offset of the first entry, in seconds.
    pub start_seconds: f64,
    /// End of the last entry (offset + duration), in seconds.
    pub end_seconds: f64,
}

/// Format seconds as MM:SS or HH:MM:SS.
pub fn format_timestamp(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(125.0), "02:05");
        assert_eq!(format_timestamp(3725.9), "01:02:05");
        assert_eq!(format_timestamp(0.0), "00:00");
    }
}
