//! Audio normalization for the fast engine
//!
//! The fast backend wants 16 kHz mono PCM. Conversion is delegated to ffmpeg;
//! the converted file is owned by a [`NormalizedAudio`] guard that removes it
//! when dropped, whichever way the transcription ends.

use crate::error::TranscriptionError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tempfile::TempPath;
use tokio::process::Command;

/// Target sample rate for normalized audio
pub const NORMALIZED_SAMPLE_RATE: u32 = 16_000;

/// Converts source audio into the waveform format a backend expects
#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    async fn normalize(&self, source: &Path) -> Result<NormalizedAudio, TranscriptionError>;
}

/// Temporary normalized audio file, deleted on drop
#[derive(Debug)]
pub struct NormalizedAudio {
    path: Option<TempPath>,
}

impl NormalizedAudio {
    /// Take ownership of `path`; the file is removed on drop
    pub fn new(path: TempPath) -> Self {
        Self { path: Some(path) }
    }

    /// Empty WAV file with a unique name in the system temp directory
    pub fn temp_wav() -> Result<Self, TranscriptionError> {
        let file = tempfile::Builder::new()
            .prefix("lrcforge_")
            .suffix(".wav")
            .tempfile()?;
        Ok(Self::new(file.into_temp_path()))
    }

    pub fn path(&self) -> &Path {
        self.path.as_deref().unwrap_or(Path::new(""))
    }
}

impl Drop for NormalizedAudio {
    fn drop(&mut self) {
        let Some(temp_path) = self.path.take() else {
            return;
        };
        let path = temp_path.to_path_buf();

        match temp_path.close() {
            Ok(()) => {
                tracing::debug!("Cleaned up temporary WAV file: {}", path.display());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    "Failed to remove temporary WAV file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }
}

/// ffmpeg-backed normalizer
pub struct FfmpegNormalizer {
    program: String,
}

impl FfmpegNormalizer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl AudioNormalizer for FfmpegNormalizer {
    async fn normalize(&self, source: &Path) -> Result<NormalizedAudio, TranscriptionError> {
        // Guard exists before ffmpeg starts so partial output is removed on failure
        let target = NormalizedAudio::temp_wav()?;

        tracing::debug!(
            source = %source.display(),
            target = %target.path().display(),
            "Converting to mono 16 kHz WAV"
        );

        let output = Command::new(&self.program)
            .arg("-y")
            .arg("-i")
            .arg(source)
            .arg("-ar")
            .arg(NORMALIZED_SAMPLE_RATE.to_string())
            .arg("-ac")
            .arg("1")
            .arg(target.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                TranscriptionError::Normalization(format!("Failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TranscriptionError::Normalization(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        Ok(target)
    }
}
