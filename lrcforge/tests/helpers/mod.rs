//! Test Helper Utilities
//!
//! Shared fakes and fixtures for lrcforge integration tests

#![allow(dead_code)]

pub mod fakes;
pub mod library;

pub use fakes::{FakeSpeechBackend, ScriptedTextService};
pub use library::{create_test_library, create_test_orchestrator, read_artifact};
