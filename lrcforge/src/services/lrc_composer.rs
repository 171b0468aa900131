//! LRC composition
//!
//! Builds the timed-lyrics document: a fixed metadata header, then each
//! segment's original line followed by its enrichment lines, all tagged with
//! the segment's start timestamp.

use crate::error::RateLimitError;
use crate::models::TimedSegment;
use crate::services::line_enhancer::{EnrichmentContext, LineEnhancer};
use chrono::NaiveDate;
use std::fmt;

/// One line of an LRC document
#[derive(Debug, Clone, PartialEq)]
pub enum LrcLine {
    /// `[key:value]`
    Metadata { key: String, value: String },
    Blank,
    /// `[mm:ss.ff]text`
    Lyric { timestamp: String, text: String },
}

impl fmt::Display for LrcLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LrcLine::Metadata { key, value } => write!(f, "[{}:{}]", key, value),
            LrcLine::Blank => Ok(()),
            LrcLine::Lyric { timestamp, text } => write!(f, "{}{}", timestamp, text),
        }
    }
}

/// Ordered LRC document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LrcDocument {
    lines: Vec<LrcLine>,
}

impl LrcDocument {
    pub fn lines(&self) -> &[LrcLine] {
        &self.lines
    }

    /// Timestamp-tagged lines only, in document order
    pub fn lyric_lines(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            LrcLine::Lyric { timestamp, text } => Some((timestamp.as_str(), text.as_str())),
            _ => None,
        })
    }

    /// UTF-8 text of the document, newline-terminated
    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        out.push('\n');
        out
    }

    fn push_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.lines.push(LrcLine::Metadata {
            key: key.to_string(),
            value: value.into(),
        });
    }

    fn push_lyric(&mut self, timestamp: &str, text: impl Into<String>) {
        self.lines.push(LrcLine::Lyric {
            timestamp: timestamp.to_string(),
            text: text.into(),
        });
    }
}

/// Inputs to the header and to enrichment
#[derive(Debug, Clone)]
pub struct ComposeContext {
    pub enrichment: EnrichmentContext,
    pub engine_label: String,
    pub generated_on: NaiveDate,
}

/// Format seconds as an LRC timestamp tag
///
/// The value is rounded half away from zero to whole centiseconds first and
/// only then split, so `59.999` becomes `[01:00.00]`. Minutes are not clamped.
/// Negative and non-finite input formats as `[00:00.00]`.
pub fn format_timestamp(seconds: f64) -> String {
    let centis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0).round() as u64
    } else {
        0
    };

    let minutes = centis / 6000;
    let secs = (centis % 6000) / 100;
    let hundredths = centis % 100;

    format!("[{:02}:{:02}.{:02}]", minutes, secs, hundredths)
}

/// Compose the LRC document for `segments`
///
/// The enhancer is consulted once per non-blank segment; its lines follow the
/// original immediately and share its timestamp. A rate-limit signal aborts
/// composition.
pub async fn compose(
    segments: &[TimedSegment],
    enhancer: &LineEnhancer,
    context: &ComposeContext,
) -> Result<LrcDocument, RateLimitError> {
    let mut document = LrcDocument::default();

    document.push_metadata("ti", "Unknown Title");
    document.push_metadata("ar", "Unknown Artist");
    document.push_metadata("al", "Unknown Album");
    document.push_metadata(
        "by",
        format!(
            "{} - {}",
            context.engine_label,
            context.generated_on.format("%Y-%m-%d")
        ),
    );
    document.lines.push(LrcLine::Blank);

    for segment in segments {
        let timestamp = format_timestamp(segment.start);
        let text = segment.text.trim();
        document.push_lyric(&timestamp, text);

        if text.is_empty() {
            continue;
        }

        for enrichment in enhancer.enhance(text, &context.enrichment).await? {
            document.push_lyric(&timestamp, enrichment);
        }
    }

    Ok(document)
}
