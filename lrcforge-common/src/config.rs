//! Configuration loading
//!
//! Resolution priority (highest first):
//! 1. Command-line arguments (applied by the binary after loading)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit config file
pub const ENV_CONFIG_PATH: &str = "LRCFORGE_CONFIG";
pub const ENV_MEDIA_ROOT: &str = "LRCFORGE_MEDIA_ROOT";
pub const ENV_ENGINE: &str = "LRCFORGE_ENGINE";
pub const ENV_MODEL: &str = "LRCFORGE_MODEL";
pub const ENV_DEVICE: &str = "LRCFORGE_DEVICE";
pub const ENV_COMPUTE_TYPE: &str = "LRCFORGE_COMPUTE_TYPE";
pub const ENV_DB_BACKEND: &str = "LRCFORGE_DB_BACKEND";
pub const ENV_DB_PATH: &str = "LRCFORGE_DB_PATH";
pub const ENV_ENRICHMENT_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_ENRICHMENT_MODEL: &str = "LRCFORGE_ENRICHMENT_MODEL";

/// Audio extensions recognized by default (matched case-sensitively)
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] =
    &["mp3", "wav", "flac", "m4a", "ogg", "opus", "wma", "aac"];

/// Which transcription backend drives a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum EngineKind {
    /// Reference Whisper, word-level timestamps, single pass
    Precise,
    /// CTranslate2 Whisper on a pre-normalized 16 kHz mono waveform
    Fast,
}

impl FromStr for EngineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "precise" => Ok(EngineKind::Precise),
            "faster" | "fast" => Ok(EngineKind::Fast),
            other => Err(Error::Config(format!(
                "Unsupported transcription engine: '{}'. Use 'openai' or 'faster'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for EngineKind {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Where the processing ledger lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LedgerBackend {
    Sqlite,
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(LedgerBackend::Sqlite),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(Error::Config(format!(
                "Unsupported ledger backend: '{}'. Use 'sqlite' or 'memory'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for LedgerBackend {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root that canonical identifiers are relative to
    pub media_root: PathBuf,
    /// Extensions (without the dot) treated as audio
    pub audio_extensions: Vec<String>,
    pub transcription: TranscriptionConfig,
    pub database: DatabaseConfig,
    pub enrichment: EnrichmentConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub engine: EngineKind,
    /// Model size/variant passed to the backend (e.g. "large-v3")
    pub model: String,
    /// "cpu" or "cuda"
    pub device: String,
    /// Compute precision for the fast engine (e.g. "int8", "float16")
    pub compute_type: String,
    pub no_speech_threshold: f32,
    pub precise_program: String,
    pub fast_program: String,
    pub ffmpeg_program: String,
    pub language_override: LanguageOverrideConfig,
}

/// Detected language that triggers a forced re-transcription
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LanguageOverrideConfig {
    pub trigger: String,
    pub target: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: LedgerBackend,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Ask the service for schema-validated JSON instead of free text
    pub structured_output: bool,
    pub min_request_interval_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Extension of the lyrics artifact written next to each audio file
    pub extension: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("/music"),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            transcription: TranscriptionConfig::default(),
            database: DatabaseConfig::default(),
            enrichment: EnrichmentConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Fast,
            model: "large-v3".to_string(),
            device: "cpu".to_string(),
            compute_type: "int8".to_string(),
            no_speech_threshold: 0.3,
            precise_program: "whisper".to_string(),
            fast_program: "whisper-ctranslate2".to_string(),
            ffmpeg_program: "ffmpeg".to_string(),
            language_override: LanguageOverrideConfig::default(),
        }
    }
}

impl Default for LanguageOverrideConfig {
    fn default() -> Self {
        // Urdu and Hindi are acoustically close; Hindi lyrics are often detected as Urdu
        Self {
            trigger: "ur".to_string(),
            target: "hi".to_string(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::Sqlite,
            path: default_database_path(),
        }
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            structured_output: true,
            min_request_interval_ms: 500,
            timeout_secs: 60,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            extension: "lrc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the resolved TOML file (if any) and the process environment
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit_path)? {
            Some(path) => {
                tracing::debug!("Loading config file: {}", path.display());
                Self::from_toml_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse configuration from TOML text (missing keys fall back to defaults)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML config file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Apply environment-style overrides
    ///
    /// `lookup` maps a variable name to its value; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = get(ENV_MEDIA_ROOT) {
            self.media_root = PathBuf::from(root);
        }
        if let Some(engine) = get(ENV_ENGINE) {
            self.transcription.engine = engine.parse()?;
        }
        if let Some(model) = get(ENV_MODEL) {
            self.transcription.model = model;
        }
        if let Some(device) = get(ENV_DEVICE) {
            self.transcription.device = device;
        }
        if let Some(compute_type) = get(ENV_COMPUTE_TYPE) {
            self.transcription.compute_type = compute_type;
        }
        if let Some(backend) = get(ENV_DB_BACKEND) {
            self.database.backend = backend.parse()?;
        }
        if let Some(path) = get(ENV_DB_PATH) {
            self.database.path = PathBuf::from(path);
        }
        if let Some(key) = get(ENV_ENRICHMENT_API_KEY) {
            self.enrichment.api_key = Some(key);
        }
        if let Some(model) = get(ENV_ENRICHMENT_MODEL) {
            self.enrichment.model = model;
        }

        Ok(())
    }

    /// API key for the enrichment service, if one is usable
    pub fn enrichment_api_key(&self) -> Option<&str> {
        self.enrichment
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Find the config file to load
///
/// An explicitly requested file must exist; the default locations are optional.
fn resolve_config_path(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file from {} not found: {}",
                ENV_CONFIG_PATH,
                path.display()
            )));
        }
        return Ok(Some(path));
    }

    Ok(dirs::config_dir()
        .map(|d| d.join("lrcforge").join("config.toml"))
        .filter(|p| p.exists()))
}

/// OS-dependent default ledger location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lrcforge").join("lrcforge.db"))
        .unwrap_or_else(|| PathBuf::from("./lrcforge_data/lrcforge.db"))
}
