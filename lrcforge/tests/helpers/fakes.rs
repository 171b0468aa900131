//! Fake transcription and enrichment collaborators
//!
//! No model, subprocess or network is involved.

use async_trait::async_trait;
use lrcforge::error::{TextServiceError, TranscriptionError};
use lrcforge::models::{Recognition, TimedSegment};
use lrcforge::services::{SpeechBackend, TextRequest, TextService};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Speech backend returning two fixed segments per file
///
/// Files whose name contains `fail_marker` produce a backend error.
#[derive(Clone, Default)]
pub struct FakeSpeechBackend {
    pub fail_marker: Option<String>,
    calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl FakeSpeechBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(marker: &str) -> Self {
        Self {
            fail_marker: Some(marker.to_string()),
            ..Self::default()
        }
    }

    /// Paths recognized so far, in call order
    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechBackend for FakeSpeechBackend {
    async fn recognize(
        &self,
        audio: &Path,
        _language: Option<&str>,
    ) -> Result<Recognition, TranscriptionError> {
        self.calls.lock().unwrap().push(audio.to_path_buf());

        let name = audio
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        if let Some(marker) = &self.fail_marker {
            if name.contains(marker.as_str()) {
                return Err(TranscriptionError::Backend(format!("cannot decode {}", name)));
            }
        }

        Ok(Recognition {
            language: Some("hi".to_string()),
            segments: vec![
                TimedSegment::new(0.0, 2.5, format!("{} first line", name)),
                TimedSegment::new(2.5, 5.0, format!("{} second line", name)),
            ],
        })
    }
}

/// Text service answering with a transliteration and a translation
///
/// Requests about the file named `rate_limit_on` fail with HTTP 429.
#[derive(Clone, Default)]
pub struct ScriptedTextService {
    pub rate_limit_on: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTextService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rate_limiting(file_name: &str) -> Self {
        Self {
            rate_limit_on: Some(file_name.to_string()),
            ..Self::default()
        }
    }

    pub fn request_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextService for ScriptedTextService {
    async fn generate(&self, request: &TextRequest) -> Result<String, TextServiceError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());

        if let Some(file_name) = &self.rate_limit_on {
            if request.prompt.contains(&format!("\"{}\"", file_name)) {
                return Err(TextServiceError::RateLimited(
                    "Quota exceeded for quota metric 'Generate Content API requests per minute'"
                        .to_string(),
                ));
            }
        }

        Ok(r#"["transliterated", "translated"]"#.to_string())
    }
}
