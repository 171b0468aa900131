//! Whisper command-line backend
//!
//! Runs a Whisper-compatible program (`whisper` or `whisper-ctranslate2`)
//! that writes Whisper JSON into an output directory, then reads the
//! segments and detected language back.

use super::SpeechBackend;
use crate::error::TranscriptionError;
use crate::models::{Recognition, TimedSegment};
use async_trait::async_trait;
use lrcforge_common::config::TranscriptionConfig;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Whisper JSON output (only the fields we use)
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

/// Parse Whisper JSON into a sorted [`Recognition`]
pub fn parse_whisper_json(content: &str) -> Result<Recognition, TranscriptionError> {
    let output: WhisperOutput =
        serde_json::from_str(content).map_err(|e| TranscriptionError::Parse(e.to_string()))?;

    let mut recognition = Recognition {
        language: output.language.filter(|l| !l.is_empty()),
        segments: output
            .segments
            .into_iter()
            .map(|s| TimedSegment::new(s.start, s.end, s.text))
            .collect(),
    };
    recognition.sort_segments();

    Ok(recognition)
}

/// Speech backend driving a Whisper-compatible CLI
#[derive(Debug, Clone)]
pub struct WhisperCliBackend {
    program: String,
    model: String,
    device: String,
    compute_type: Option<String>,
    word_timestamps: bool,
    no_speech_threshold: f32,
}

impl WhisperCliBackend {
    /// Reference Whisper with word-level timestamps
    pub fn precise(config: &TranscriptionConfig) -> Self {
        Self {
            program: config.precise_program.clone(),
            model: config.model.clone(),
            device: config.device.clone(),
            compute_type: None,
            word_timestamps: true,
            no_speech_threshold: config.no_speech_threshold,
        }
    }

    /// CTranslate2 Whisper at the configured compute precision
    pub fn fast(config: &TranscriptionConfig) -> Self {
        Self {
            program: config.fast_program.clone(),
            model: config.model.clone(),
            device: config.device.clone(),
            compute_type: Some(config.compute_type.clone()),
            word_timestamps: false,
            no_speech_threshold: config.no_speech_threshold,
        }
    }

    fn build_args(&self, audio: &Path, output_dir: &Path, language: Option<&str>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            audio.into(),
            "--model".into(),
            self.model.as_str().into(),
            "--device".into(),
            self.device.as_str().into(),
            "--task".into(),
            "transcribe".into(),
            "--output_format".into(),
            "json".into(),
            "--output_dir".into(),
            output_dir.into(),
            "--verbose".into(),
            "False".into(),
            "--no_speech_threshold".into(),
            self.no_speech_threshold.to_string().into(),
        ];

        if let Some(compute_type) = &self.compute_type {
            args.push("--compute_type".into());
            args.push(compute_type.as_str().into());
        }

        if self.word_timestamps {
            args.push("--word_timestamps".into());
            args.push("True".into());
        }

        if let Some(language) = language {
            args.push("--language".into());
            args.push(language.into());
        }

        args
    }
}

#[async_trait]
impl SpeechBackend for WhisperCliBackend {
    async fn recognize(
        &self,
        audio: &Path,
        language: Option<&str>,
    ) -> Result<Recognition, TranscriptionError> {
        let output_dir = tempfile::Builder::new().prefix("lrcforge_whisper_").tempdir()?;

        tracing::debug!(
            program = %self.program,
            audio = %audio.display(),
            language = ?language,
            "Running speech recognition"
        );

        let output = Command::new(&self.program)
            .args(self.build_args(audio, output_dir.path(), language))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TranscriptionError::Backend(format!("Failed to run {}: {}", self.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Backend(format!(
                "{} exit code: {:?}, stderr: {}",
                self.program,
                output.status.code(),
                stderr.trim()
            )));
        }

        let json_path = find_json_output(output_dir.path())?;
        let content = tokio::fs::read_to_string(&json_path).await?;
        let recognition = parse_whisper_json(&content)?;

        tracing::info!(
            audio = %audio.display(),
            language = recognition.language.as_deref().unwrap_or("unknown"),
            segments = recognition.segments.len(),
            "Speech recognition completed"
        );

        Ok(recognition)
    }
}

/// Locate the JSON file the program wrote
fn find_json_output(output_dir: &Path) -> Result<PathBuf, TranscriptionError> {
    for entry in std::fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            return Ok(path);
        }
    }

    Err(TranscriptionError::Parse(format!(
        "No JSON output written to {}",
        output_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_as_strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_parse_whisper_json() {
        let json = r#"{
            "text": " Hello there. General Kenobi.",
            "segments": [
                {"id": 1, "start": 4.5, "end": 6.0, "text": " General Kenobi."},
                {"id": 0, "start": 0.0, "end": 4.5, "text": " Hello there."}
            ],
            "language": "en"
        }"#;

        let recognition = parse_whisper_json(json).unwrap();
        assert_eq!(recognition.language.as_deref(), Some("en"));
        assert_eq!(recognition.segments.len(), 2);
        assert_eq!(recognition.segments[0].text, " Hello there.");
        assert_eq!(recognition.segments[1].start, 4.5);
    }

    #[test]
    fn test_parse_whisper_json_without_segments() {
        let recognition = parse_whisper_json(r#"{"text": "", "language": ""}"#).unwrap();
        assert!(recognition.segments.is_empty());
        assert_eq!(recognition.language, None);
    }

    #[test]
    fn test_parse_whisper_json_rejects_garbage() {
        assert!(matches!(
            parse_whisper_json("not json"),
            Err(TranscriptionError::Parse(_))
        ));
    }

    #[test]
    fn test_precise_args_request_word_timestamps() {
        let backend = WhisperCliBackend::precise(&TranscriptionConfig::default());
        let args = args_as_strings(&backend.build_args(
            Path::new("/music/a.mp3"),
            Path::new("/tmp/out"),
            None,
        ));

        assert_eq!(args[0], "/music/a.mp3");
        assert!(args.windows(2).any(|w| w == ["--word_timestamps", "True"]));
        assert!(!args.contains(&"--compute_type".to_string()));
        assert!(!args.contains(&"--language".to_string()));
    }

    #[test]
    fn test_fast_args_with_forced_language() {
        let backend = WhisperCliBackend::fast(&TranscriptionConfig::default());
        let args = args_as_strings(&backend.build_args(
            Path::new("/tmp/n.wav"),
            Path::new("/tmp/out"),
            Some("hi"),
        ));

        assert!(args.windows(2).any(|w| w == ["--compute_type", "int8"]));
        assert!(args.windows(2).any(|w| w == ["--language", "hi"]));
        assert!(args.windows(2).any(|w| w == ["--model", "large-v3"]));
        assert!(!args.contains(&"--word_timestamps".to_string()));
    }

    #[tokio::test]
    async fn test_missing_program_is_backend_error() {
        let mut config = TranscriptionConfig::default();
        config.precise_program = "lrcforge-no-such-whisper".to_string();
        let backend = WhisperCliBackend::precise(&config);

        let result = backend.recognize(Path::new("/tmp/a.mp3"), None).await;
        assert!(matches!(result, Err(TranscriptionError::Backend(_))));
    }
}
