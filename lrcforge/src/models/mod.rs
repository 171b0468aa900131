//! Transient pipeline data types

pub mod audio_file;
pub mod segment;

pub use audio_file::AudioFile;
pub use segment::{Recognition, TimedSegment};
