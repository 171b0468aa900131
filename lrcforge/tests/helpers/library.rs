//! Test media libraries and orchestrator wiring

use super::{FakeSpeechBackend, ScriptedTextService};
use lrcforge::db::ProcessingLedger;
use lrcforge::services::{
    AudioCatalog, BatchOrchestrator, LanguageOverride, LineEnhancer, TranscriptionEngine,
};
use lrcforge_common::config::DEFAULT_AUDIO_EXTENSIONS;
use lrcforge_common::db::init_memory_database;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a media root with empty placeholder audio files
///
/// Returns the TempDir (keep it alive for the test) and the created paths.
pub fn create_test_library(relative_paths: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let root = TempDir::new().unwrap();
    let mut paths = Vec::new();

    for relative in relative_paths {
        let path = root.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"not really audio").unwrap();
        paths.push(path);
    }

    (root, paths)
}

/// Orchestrator over fakes and an in-memory ledger
pub async fn create_test_orchestrator(
    media_root: &Path,
    backend: FakeSpeechBackend,
    service: Option<ScriptedTextService>,
) -> BatchOrchestrator {
    let engine = TranscriptionEngine::Precise {
        backend: Box::new(backend),
        language_override: LanguageOverride::new("ur", "hi"),
    };

    let enhancer = match service {
        Some(service) => LineEnhancer::new(Arc::new(service), true),
        None => LineEnhancer::disabled(),
    };

    let ledger = ProcessingLedger::new(init_memory_database().await.unwrap());

    BatchOrchestrator::new(
        AudioCatalog::new(DEFAULT_AUDIO_EXTENSIONS),
        engine,
        enhancer,
        ledger,
        media_root,
        "lrc",
    )
}

/// Contents of the `.lrc` written next to `audio`
pub fn read_artifact(audio: &Path) -> String {
    fs::read_to_string(audio.with_extension("lrc")).unwrap()
}
