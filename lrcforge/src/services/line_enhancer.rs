//! Line enhancer
//!
//! Asks the text enrichment service for a transliteration and translation of
//! one lyric line. The reply is trusted for order only: numbering artifacts
//! are stripped, blank lines dropped, and any line count is accepted (fewer
//! than two is logged as a warning, more than two is passed through).
//!
//! Rate limiting is the one failure that escapes: it is returned as
//! [`RateLimitError`] so the batch can stop. Every other service failure is
//! logged and resolves to "no enrichment".

use crate::error::{RateLimitError, TextServiceError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Number of enrichment lines a well-behaved service returns
pub const EXPECTED_ENRICHMENT_LINES: usize = 2;

/// Case-insensitive markers that classify an error message as rate limiting
const RATE_LIMIT_MARKERS: &[&str] = &["rate", "quota", "429"];

/// Known words that contain a marker without meaning rate limiting
const RATE_LIMIT_FALSE_MARKERS: &[&str] = &["generatecontent", "generate"];

/// Request to the text service
#[derive(Debug, Clone)]
pub struct TextRequest {
    pub prompt: String,
    /// JSON schema the reply must follow, when structured output is wanted
    pub response_schema: Option<serde_json::Value>,
}

/// Text generation black box
#[async_trait]
pub trait TextService: Send + Sync {
    async fn generate(&self, request: &TextRequest) -> Result<String, TextServiceError>;
}

/// Song-level context passed along with each line
#[derive(Debug, Clone)]
pub struct EnrichmentContext {
    pub file_name: String,
}

impl EnrichmentContext {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }
}

/// Structured reply shape (either a bare array or `{"lines": [...]}`)
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StructuredReply {
    Lines(Vec<String>),
    Object { lines: Vec<String> },
}

/// Per-line enrichment over an optional text service
#[derive(Clone)]
pub struct LineEnhancer {
    service: Option<Arc<dyn TextService>>,
    structured_output: bool,
}

impl LineEnhancer {
    pub fn new(service: Arc<dyn TextService>, structured_output: bool) -> Self {
        Self {
            service: Some(service),
            structured_output,
        }
    }

    /// Enhancer that never enriches (no service configured)
    pub fn disabled() -> Self {
        Self {
            service: None,
            structured_output: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.service.is_some()
    }

    /// Enrichment lines for `line`, in the order the service returned them
    pub async fn enhance(
        &self,
        line: &str,
        context: &EnrichmentContext,
    ) -> Result<Vec<String>, RateLimitError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Vec::new());
        }

        let Some(service) = &self.service else {
            return Ok(Vec::new());
        };

        let request = self.build_request(line, context);

        let reply = match service.generate(&request).await {
            Ok(reply) => reply,
            Err(err) => {
                if let Some(rate_limit) = classify_rate_limit(&err) {
                    return Err(rate_limit);
                }
                tracing::error!(
                    file = %context.file_name,
                    line = %line,
                    "Enrichment request failed: {}",
                    err
                );
                return Ok(Vec::new());
            }
        };

        let lines = if self.structured_output {
            parse_structured_reply(&reply).unwrap_or_else(|| {
                tracing::debug!("Reply was not the requested JSON, falling back to text parsing");
                clean_reply_lines(&reply)
            })
        } else {
            clean_reply_lines(&reply)
        };

        if lines.len() < EXPECTED_ENRICHMENT_LINES {
            tracing::warn!(
                file = %context.file_name,
                line = %line,
                "Expected {} enrichment lines, got {}",
                EXPECTED_ENRICHMENT_LINES,
                lines.len()
            );
        } else if lines.len() > EXPECTED_ENRICHMENT_LINES {
            tracing::info!(
                file = %context.file_name,
                "Enrichment returned {} lines (expected {}), keeping all",
                lines.len(),
                EXPECTED_ENRICHMENT_LINES
            );
        }

        Ok(lines)
    }

    fn build_request(&self, line: &str, context: &EnrichmentContext) -> TextRequest {
        let prompt = build_prompt(line, &context.file_name, self.structured_output);
        let response_schema = self.structured_output.then(|| {
            json!({
                "type": "ARRAY",
                "items": { "type": "STRING" }
            })
        });

        TextRequest {
            prompt,
            response_schema,
        }
    }
}

fn build_prompt(line: &str, file_name: &str, structured_output: bool) -> String {
    let output_format = if structured_output {
        "Return a JSON array of strings: [transliteration, translation]. \
         Return an empty array [] if the line is already English."
    } else {
        "Return exactly two lines: the transliteration on the first line and the \
         translation on the second. Return nothing if the line is already English. \
         No numbering, labels, timestamps or explanations."
    };

    format!(
        "You are an expert music linguist.\n\
         The following lyric line comes from the song file \"{file_name}\".\n\
         If the line is not in English:\n\
         1. Transliterate it into Latin (Roman) script.\n\
         2. Translate it into English.\n\
         Keep the meaning and tone of the lyric; do not add commentary.\n\
         {output_format}\n\n\
         Lyric line:\n{line}"
    )
}

/// Map a service error to the rate-limit signal, if it is one
///
/// Structured classification first, then the message keyword heuristic.
pub fn classify_rate_limit(err: &TextServiceError) -> Option<RateLimitError> {
    if let TextServiceError::RateLimited(message) = err {
        return Some(RateLimitError::new(message.clone()));
    }

    let message = RATE_LIMIT_FALSE_MARKERS
        .iter()
        .fold(err.to_string().to_lowercase(), |msg, word| msg.replace(word, " "));
    let is_rate_limit = RATE_LIMIT_MARKERS.iter().any(|m| message.contains(m));

    is_rate_limit.then(|| RateLimitError::new(err.to_string()))
}

/// Parse a schema-following reply; `None` if it isn't one
pub fn parse_structured_reply(reply: &str) -> Option<Vec<String>> {
    let trimmed = strip_code_fence(reply.trim());
    let parsed: StructuredReply = serde_json::from_str(trimmed).ok()?;
    let lines = match parsed {
        StructuredReply::Lines(lines) => lines,
        StructuredReply::Object { lines } => lines,
    };

    // An element may itself hold several lines
    Some(
        lines
            .iter()
            .flat_map(|l| l.lines())
            .map(strip_line_artifacts)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Loose text parsing: strip numbering per line, keep non-empty lines
pub fn clean_reply_lines(reply: &str) -> Vec<String> {
    strip_code_fence(reply.trim())
        .lines()
        .map(strip_line_artifacts)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Remove a surrounding Markdown code fence, if present
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Strip leading list/numbering artifacts and echoed LRC timestamps
///
/// `"1. Dil se"`, `"2) Dil se"`, `"- Dil se"` and `"[00:12.34] Dil se"` all become `"Dil se"`.
fn strip_line_artifacts(line: &str) -> &str {
    let mut rest = line.trim();

    // Echoed timestamp tag
    if rest.starts_with('[') {
        if let Some(end) = rest.find(']') {
            let tag = &rest[1..end];
            if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_digit() || c == ':' || c == '.') {
                rest = rest[end + 1..].trim_start();
            }
        }
    }

    // Bullets
    rest = rest
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '•'))
        .trim_start();

    // Numbering: digits followed by '.', ')' or ':'
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let after = &rest[digits..];
        if let Some(stripped) = after
            .strip_prefix('.')
            .or_else(|| after.strip_prefix(')'))
            .or_else(|| after.strip_prefix(':'))
        {
            rest = stripped.trim_start();
        }
    }

    rest.trim()
}
