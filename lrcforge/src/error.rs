//! Error types for the lrcforge pipeline
//!
//! Severity is encoded in the type:
//! - [`ScanError`] aborts a run before any file is processed
//! - [`RateLimitError`] aborts the remaining queue of a run
//! - everything wrapped by [`ProcessError`] (other than rate limiting) fails one file only

use crate::services::batch_orchestrator::RunReport;
use std::path::PathBuf;
use thiserror::Error;

/// Audio discovery errors (terminal for the whole batch)
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Transcription failures for a single file
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// External audio normalization failed
    #[error("Audio normalization failed: {0}")]
    Normalization(String),

    /// Speech recognition program could not be run or exited unsuccessfully
    #[error("Transcription backend failed: {0}")]
    Backend(String),

    /// Backend output could not be understood
    #[error("Failed to parse transcription output: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures reported by the text enrichment service
#[derive(Debug, Error)]
pub enum TextServiceError {
    /// Service signalled quota exhaustion or throttling
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Service returned no text")]
    EmptyResponse,
}

/// Enrichment stopped because the text service is rate limiting us
///
/// Never swallowed by the enhancer or the per-file error isolation.
#[derive(Debug, Clone, Error)]
#[error("Enrichment service rate limit reached: {message}")]
pub struct RateLimitError {
    pub message: String,
}

impl RateLimitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure while processing one audio file
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitError),

    #[error("Failed to write {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger error: {0}")]
    Ledger(#[from] lrcforge_common::Error),
}

/// Conditions that end a batch run early
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// Remaining files were not attempted; `report` covers what was
    #[error("Run stopped at {identifier}: {source}")]
    RateLimited {
        identifier: String,
        #[source]
        source: RateLimitError,
        report: Box<RunReport>,
    },
}
