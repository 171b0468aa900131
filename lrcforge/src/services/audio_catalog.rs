//! Audio file catalog
//!
//! Recursive audio file discovery and canonical identifiers.
//! Extensions are compared exactly as configured: `song.MP3` is not an `mp3`.

use crate::error::ScanError;
use crate::models::AudioFile;
use std::path::Path;
use walkdir::WalkDir;

/// Audio file catalog
#[derive(Debug, Clone)]
pub struct AudioCatalog {
    extensions: Vec<String>,
}

impl AudioCatalog {
    /// Create a catalog for the given extension allow-list
    ///
    /// Leading dots are tolerated (`".mp3"` and `"mp3"` are equivalent).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Discover audio files under `root`, sorted by full path
    ///
    /// A relative `root` is resolved against the working directory, so the
    /// returned paths are always absolute.
    pub fn discover(&self, root: &Path) -> Result<Vec<AudioFile>, ScanError> {
        let root = std::path::absolute(root)
            .map_err(|_| ScanError::PathNotFound(root.to_path_buf()))?;
        let root = root.as_path();

        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }

        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(root).follow_links(false) {
            match entry {
                Ok(entry) => {
                    // Symlinked files count; symlinked directories are not descended
                    let is_file = entry.file_type().is_file()
                        || (entry.file_type().is_symlink() && entry.path().is_file());
                    if is_file && self.is_audio_extension(entry.path()) {
                        files.push(AudioFile::new(entry.into_path()));
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                    // Continue scanning, don't abort
                }
            }
        }

        files.sort();
        files.dedup();

        tracing::debug!(
            root = %root.display(),
            count = files.len(),
            "Audio discovery complete"
        );

        Ok(files)
    }

    /// Check the path's extension against the allow-list
    fn is_audio_extension(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.iter().any(|allowed| allowed == ext),
            None => false,
        }
    }
}

/// Path of `absolute_path` relative to `media_root`
///
/// Paths outside the media root are returned unchanged.
pub fn canonical_identifier(absolute_path: &Path, media_root: &Path) -> String {
    match absolute_path.strip_prefix(media_root) {
        Ok(relative) => relative.to_string_lossy().into_owned(),
        Err(_) => absolute_path.to_string_lossy().into_owned(),
    }
}
