//! Timed transcription segments

use serde::{Deserialize, Serialize};

/// A contiguous span of transcribed speech
///
/// Segments are ordered by `start` but may overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// One recognition pass over an audio file
#[derive(Debug, Clone, Default)]
pub struct Recognition {
    /// Language code reported (detected or forced) by the backend
    pub language: Option<String>,
    pub segments: Vec<TimedSegment>,
}

impl Recognition {
    /// Stable sort by start time; backends are not trusted to order their output
    pub fn sort_segments(&mut self) {
        self.segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    }
}
