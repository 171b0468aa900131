//! Batch orchestration
//!
//! Drives the per-file pipeline over a directory tree:
//! discover → skip check → transcribe → compose → write artifact → ledger.
//!
//! A file is skipped when its `.lrc` artifact already exists; the ledger is
//! only an audit trail. Failures are isolated per file, except a rate-limit
//! signal from enrichment, which ends the run.

use crate::db::{ProcessingLedger, RecordOutcome};
use crate::error::{ProcessError, RunError};
use crate::models::AudioFile;
use crate::services::audio_catalog::{canonical_identifier, AudioCatalog};
use crate::services::line_enhancer::{EnrichmentContext, LineEnhancer};
use crate::services::lrc_composer::{compose, ComposeContext};
use crate::services::transcription::TranscriptionEngine;
use lrcforge_common::time;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// What happened to one discovered file
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Artifact written; `lyric_lines` counts originals plus enrichment lines
    Processed { lyric_lines: usize },
    /// Artifact already present
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub identifier: String,
    pub status: FileStatus,
}

/// Summary of one run
///
/// `outcomes` holds only the files that were attempted; a cancelled or
/// rate-limited run leaves the rest out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub discovered: usize,
    pub outcomes: Vec<FileOutcome>,
}

impl RunReport {
    pub fn attempted(&self) -> usize {
        self.outcomes.len()
    }

    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Processed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, FileStatus::Failed { .. }))
    }

    fn count(&self, predicate: impl Fn(&FileStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }
}

/// Sequential transcription pipeline over a media tree
pub struct BatchOrchestrator {
    catalog: AudioCatalog,
    engine: TranscriptionEngine,
    enhancer: LineEnhancer,
    ledger: ProcessingLedger,
    media_root: PathBuf,
    artifact_extension: String,
}

impl BatchOrchestrator {
    pub fn new(
        catalog: AudioCatalog,
        engine: TranscriptionEngine,
        enhancer: LineEnhancer,
        ledger: ProcessingLedger,
        media_root: impl Into<PathBuf>,
        artifact_extension: impl Into<String>,
    ) -> Self {
        Self {
            catalog,
            engine,
            enhancer,
            ledger,
            media_root: absolute_or_unchanged(media_root.into()),
            artifact_extension: artifact_extension.into(),
        }
    }

    pub fn ledger(&self) -> &ProcessingLedger {
        &self.ledger
    }

    /// Process every audio file under `root` in path order
    ///
    /// Cancellation takes effect between files.
    pub async fn run(&self, root: &Path, cancel: &CancellationToken) -> Result<RunReport, RunError> {
        let files = self.catalog.discover(root)?;
        let total = files.len();

        tracing::info!(
            root = %root.display(),
            total,
            engine = self.engine.label(),
            enrichment = self.enhancer.is_enabled(),
            "Starting transcription run"
        );

        let mut report = RunReport {
            discovered: total,
            outcomes: Vec::with_capacity(total),
        };

        for (idx, file) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::info!(
                    attempted = report.attempted(),
                    remaining = total - idx,
                    "Run cancelled"
                );
                break;
            }

            let identifier = canonical_identifier(file.path(), &self.media_root);
            let artifact = file.artifact_path(&self.artifact_extension);

            if artifact.exists() {
                tracing::info!(
                    index = idx + 1,
                    total,
                    file = %identifier,
                    "Skipping, lyrics already exist"
                );
                report.outcomes.push(FileOutcome {
                    identifier,
                    status: FileStatus::Skipped,
                });
                continue;
            }

            tracing::info!(index = idx + 1, total, file = %identifier, "Processing file");

            let status = match self.process_file(file, &identifier, &artifact).await {
                Ok(lyric_lines) => {
                    tracing::info!(
                        file = %identifier,
                        lyric_lines,
                        artifact = %artifact.display(),
                        "File complete"
                    );
                    FileStatus::Processed { lyric_lines }
                }
                Err(ProcessError::RateLimited(source)) => {
                    tracing::warn!(
                        file = %identifier,
                        remaining = total - idx - 1,
                        "Enrichment rate limit reached, stopping run: {}",
                        source
                    );
                    return Err(RunError::RateLimited {
                        identifier,
                        source,
                        report: Box::new(report),
                    });
                }
                Err(e) => {
                    tracing::error!(file = %identifier, "Failed to process file: {:?}", e);
                    FileStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };

            report.outcomes.push(FileOutcome { identifier, status });
        }

        tracing::info!(
            discovered = report.discovered,
            processed = report.processed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Transcription run complete"
        );

        Ok(report)
    }

    /// Run the pipeline for one file; returns the number of lyric lines written
    async fn process_file(
        &self,
        file: &AudioFile,
        identifier: &str,
        artifact: &Path,
    ) -> Result<usize, ProcessError> {
        let added_at = time::now();

        let segments = self.engine.transcribe(file.path()).await?;
        tracing::debug!(file = %identifier, segments = segments.len(), "Transcribed");

        let context = ComposeContext {
            enrichment: EnrichmentContext::new(file.file_name()),
            engine_label: self.engine.label().to_string(),
            generated_on: time::today(),
        };
        let document = compose(&segments, &self.enhancer, &context).await?;

        write_artifact(artifact, &document.render()).await?;

        match self.ledger.record(identifier, time::now(), added_at).await? {
            RecordOutcome::Inserted(file_id) => {
                tracing::debug!(file = %identifier, file_id, "Ledger entry recorded");
            }
            RecordOutcome::AlreadyRecorded => {
                tracing::info!(file = %identifier, "Ledger already had an entry; artifact regenerated");
            }
        }

        Ok(document.lyric_lines().count())
    }
}

/// Resolve a relative media root against the working directory
fn absolute_or_unchanged(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

/// Write `contents` to `<path>.tmp`, then rename into place
async fn write_artifact(path: &Path, contents: &str) -> Result<(), ProcessError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let result = async {
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, path).await
    }
    .await;

    if let Err(source) = result {
        if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove {}: {}", tmp_path.display(), e);
            }
        }
        return Err(ProcessError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        });
    }

    Ok(())
}
