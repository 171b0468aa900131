//! # lrcforge Common Library
//!
//! Shared code for the lrcforge workspace:
//! - Error and result types
//! - Configuration loading (TOML file, environment, defaults)
//! - Ledger database initialization
//! - Outbound request pacing
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod pacing;
pub mod time;

pub use error::{Error, Result};
