//! lrcforge library
//!
//! Transcribes a music library into time-synced `.lrc` lyrics, enriching each
//! line with a transliteration and a translation.

pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use error::{ProcessError, RateLimitError, RunError, ScanError, TranscriptionError};
