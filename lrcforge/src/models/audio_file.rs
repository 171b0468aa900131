//! Discovered audio files

use std::path::{Path, PathBuf};

/// An audio file found under the scanned root
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AudioFile {
    path: PathBuf,
}

impl AudioFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base file name, used as context for enrichment and in log lines
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Sibling path with the same base name and the given extension
    pub fn artifact_path(&self, extension: &str) -> PathBuf {
        self.path.with_extension(extension)
    }
}
