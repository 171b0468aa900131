//! Pipeline services

pub mod audio_catalog;
pub mod batch_orchestrator;
pub mod gemini_client;
pub mod line_enhancer;
pub mod lrc_composer;
pub mod transcription;

pub use audio_catalog::{canonical_identifier, AudioCatalog};
pub use batch_orchestrator::{BatchOrchestrator, FileOutcome, FileStatus, RunReport};
pub use gemini_client::{GeminiClient, ModelInfo};
pub use line_enhancer::{EnrichmentContext, LineEnhancer, TextRequest, TextService};
pub use lrc_composer::{compose, format_timestamp, ComposeContext, LrcDocument, LrcLine};
pub use transcription::{LanguageOverride, SpeechBackend, TranscriptionEngine};
