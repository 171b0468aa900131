//! Transcription engine
//!
//! Two interchangeable variants behind one `transcribe` capability:
//! - **Precise**: the backend reads the original file directly
//! - **Fast**: the file is first normalized to 16 kHz mono; the temporary
//!   waveform is deleted however transcription ends
//!
//! Both apply the language override policy: when the first pass detects the
//! trigger language, that pass is discarded and the file is transcribed again
//! with the target language forced.

pub mod normalizer;
pub mod whisper_cli;

pub use normalizer::{AudioNormalizer, FfmpegNormalizer, NormalizedAudio};
pub use whisper_cli::WhisperCliBackend;

use crate::error::TranscriptionError;
use crate::models::{Recognition, TimedSegment};
use async_trait::async_trait;
use lrcforge_common::config::{EngineKind, LanguageOverrideConfig, TranscriptionConfig};
use std::path::Path;

/// Speech recognition black box
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    /// Recognize `audio`; `language` forces the language, `None` auto-detects
    async fn recognize(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Recognition, TranscriptionError>;
}

/// Detected language that must be re-run with another language forced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageOverride {
    pub trigger: String,
    pub target: String,
}

impl LanguageOverride {
    pub fn new(trigger: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            target: target.into(),
        }
    }

    fn applies_to(&self, detected: Option<&str>) -> bool {
        detected == Some(self.trigger.as_str())
    }
}

impl From<&LanguageOverrideConfig> for LanguageOverride {
    fn from(config: &LanguageOverrideConfig) -> Self {
        Self::new(config.trigger.clone(), config.target.clone())
    }
}

/// Transcription engine variants
pub enum TranscriptionEngine {
    Precise {
        backend: Box<dyn SpeechBackend>,
        language_override: LanguageOverride,
    },
    Fast {
        backend: Box<dyn SpeechBackend>,
        normalizer: Box<dyn AudioNormalizer>,
        language_override: LanguageOverride,
    },
}

impl TranscriptionEngine {
    /// Build the configured engine with its command-line backend
    pub fn from_config(config: &TranscriptionConfig) -> Self {
        let language_override = LanguageOverride::from(&config.language_override);

        match config.engine {
            EngineKind::Precise => {
                tracing::info!("Using Whisper engine (model: {})", config.model);
                TranscriptionEngine::Precise {
                    backend: Box::new(WhisperCliBackend::precise(config)),
                    language_override,
                }
            }
            EngineKind::Fast => {
                tracing::info!(
                    "Using Faster-Whisper engine (model: {}, compute_type: {})",
                    config.model,
                    config.compute_type
                );
                TranscriptionEngine::Fast {
                    backend: Box::new(WhisperCliBackend::fast(config)),
                    normalizer: Box::new(FfmpegNormalizer::new(config.ffmpeg_program.clone())),
                    language_override,
                }
            }
        }
    }

    /// Label written into the LRC `[by:]` tag
    pub fn label(&self) -> &'static str {
        match self {
            TranscriptionEngine::Precise { .. } => "Whisper AI",
            TranscriptionEngine::Fast { .. } => "Faster-Whisper",
        }
    }

    /// Transcribe an audio file into time-ordered segments
    pub async fn transcribe(&self, audio: &Path) -> Result<Vec<TimedSegment>, TranscriptionError> {
        tracing::info!("Transcribing: {}", audio.display());

        let recognition = match self {
            TranscriptionEngine::Precise {
                backend,
                language_override,
            } => recognize_with_override(backend.as_ref(), audio, language_override).await?,
            TranscriptionEngine::Fast {
                backend,
                normalizer,
                language_override,
            } => {
                let normalized = normalizer.normalize(audio).await?;
                // `normalized` is dropped (and the file removed) on every path out of this arm
                recognize_with_override(backend.as_ref(), normalized.path(), language_override)
                    .await?
            }
        };

        Ok(recognition.segments)
    }
}

/// Detect once; re-run with the target forced if the trigger was detected
async fn recognize_with_override(
    backend: &dyn SpeechBackend,
    audio: &Path,
    language_override: &LanguageOverride,
) -> Result<Recognition, TranscriptionError> {
    let first = backend.recognize(audio, None).await?;

    let mut recognition = if language_override.applies_to(first.language.as_deref()) {
        tracing::debug!(
            "Detected language '{}', re-transcribing with '{}' forced",
            language_override.trigger,
            language_override.target
        );
        backend
            .recognize(audio, Some(language_override.target.as_str()))
            .await?
    } else {
        first
    };

    recognition.sort_segments();
    Ok(recognition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    /// Backend that answers from a script and records each call
    struct ScriptedBackend {
        detected: Option<String>,
        calls: Arc<Mutex<Vec<(PathBuf, Option<String>)>>>,
        fail: bool,
    }

    impl ScriptedBackend {
        fn detecting(language: Option<&str>) -> (Self, Arc<Mutex<Vec<(PathBuf, Option<String>)>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    detected: language.map(str::to_string),
                    calls: calls.clone(),
                    fail: false,
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl SpeechBackend for ScriptedBackend {
        async fn recognize(
            &self,
            audio: &Path,
            language: Option<&str>,
        ) -> Result<Recognition, TranscriptionError> {
            self.calls
                .lock()
                .unwrap()
                .push((audio.to_path_buf(), language.map(str::to_string)));

            if self.fail {
                return Err(TranscriptionError::Backend("boom".to_string()));
            }

            let (language, text) = match language {
                Some(forced) => (forced.to_string(), format!("forced {}", forced)),
                None => (
                    self.detected.clone().unwrap_or_default(),
                    "auto".to_string(),
                ),
            };

            Ok(Recognition {
                language: Some(language),
                segments: vec![TimedSegment::new(0.0, 1.0, text)],
            })
        }
    }

    /// Normalizer that creates a real temp file so cleanup can be observed
    struct TouchNormalizer {
        created: Arc<Mutex<Option<PathBuf>>>,
    }

    #[async_trait]
    impl AudioNormalizer for TouchNormalizer {
        async fn normalize(&self, _source: &Path) -> Result<NormalizedAudio, TranscriptionError> {
            let guard = NormalizedAudio::temp_wav()?;
            std::fs::write(guard.path(), b"RIFF")?;
            *self.created.lock().unwrap() = Some(guard.path().to_path_buf());
            Ok(guard)
        }
    }

    fn urdu_to_hindi() -> LanguageOverride {
        LanguageOverride::new("ur", "hi")
    }

    #[tokio::test]
    async fn test_override_trigger_uses_second_pass() {
        let (backend, calls) = ScriptedBackend::detecting(Some("ur"));
        let engine = TranscriptionEngine::Precise {
            backend: Box::new(backend),
            language_override: urdu_to_hindi(),
        };

        let segments = engine.transcribe(Path::new("/music/song.mp3")).await.unwrap();

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "forced hi");

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].1, None);
        assert_eq!(calls[1].1.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_other_language_keeps_first_pass() {
        let (backend, calls) = ScriptedBackend::detecting(Some("hi"));
        let engine = TranscriptionEngine::Precise {
            backend: Box::new(backend),
            language_override: urdu_to_hindi(),
        };

        let segments = engine.transcribe(Path::new("/music/song.mp3")).await.unwrap();

        assert_eq!(segments[0].text, "auto");
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fast_engine_transcribes_normalized_file_and_cleans_up() {
        let (backend, calls) = ScriptedBackend::detecting(Some("ur"));
        let created = Arc::new(Mutex::new(None));
        let engine = TranscriptionEngine::Fast {
            backend: Box::new(backend),
            normalizer: Box::new(TouchNormalizer {
                created: created.clone(),
            }),
            language_override: urdu_to_hindi(),
        };

        let segments = engine.transcribe(Path::new("/music/song.mp3")).await.unwrap();
        assert_eq!(segments[0].text, "forced hi");

        let normalized = created.lock().unwrap().clone().unwrap();
        let calls = calls.lock().unwrap();
        // Both passes read the normalized file, never the original
        assert!(calls.iter().all(|(path, _)| path == &normalized));
        assert!(!normalized.exists(), "temporary WAV was not removed");
    }

    #[tokio::test]
    async fn test_fast_engine_cleans_up_on_backend_failure() {
        let (mut backend, _calls) = ScriptedBackend::detecting(Some("en"));
        backend.fail = true;
        let created = Arc::new(Mutex::new(None));
        let engine = TranscriptionEngine::Fast {
            backend: Box::new(backend),
            normalizer: Box::new(TouchNormalizer {
                created: created.clone(),
            }),
            language_override: urdu_to_hindi(),
        };

        let result = engine.transcribe(Path::new("/music/song.mp3")).await;
        assert!(matches!(result, Err(TranscriptionError::Backend(_))));

        let normalized = created.lock().unwrap().clone().unwrap();
        assert!(!normalized.exists(), "temporary WAV leaked after failure");
    }

    #[test]
    fn test_labels_and_from_config() {
        let mut config = TranscriptionConfig::default();
        config.engine = EngineKind::Precise;
        assert_eq!(TranscriptionEngine::from_config(&config).label(), "Whisper AI");

        config.engine = EngineKind::Fast;
        assert_eq!(
            TranscriptionEngine::from_config(&config).label(),
            "Faster-Whisper"
        );
    }
}
