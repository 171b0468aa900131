//! Tests for configuration loading and override priority

use lrcforge_common::config::{Config, EngineKind, LedgerBackend, ENV_CONFIG_PATH};
use lrcforge_common::Error;
use serial_test::serial;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.media_root, PathBuf::from("/music"));
    assert_eq!(config.transcription.engine, EngineKind::Fast);
    assert_eq!(config.transcription.language_override.trigger, "ur");
    assert_eq!(config.transcription.language_override.target, "hi");
    assert_eq!(config.database.backend, LedgerBackend::Sqlite);
    assert_eq!(config.output.extension, "lrc");
    assert!(config.enrichment.structured_output);
    assert_eq!(config.audio_extensions.len(), 8);
    assert!(config.audio_extensions.contains(&"opus".to_string()));
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config = Config::from_toml_str(
        r#"
        media_root = "/srv/music"

        [transcription]
        engine = "openai"
        model = "medium"
        "#,
    )
    .unwrap();

    assert_eq!(config.media_root, PathBuf::from("/srv/music"));
    assert_eq!(config.transcription.engine, EngineKind::Precise);
    assert_eq!(config.transcription.model, "medium");
    // Untouched keys keep their defaults
    assert_eq!(config.transcription.device, "cpu");
    assert_eq!(config.enrichment.model, "gemini-2.5-flash");
}

#[test]
fn test_unsupported_engine_in_toml_is_rejected() {
    let result = Config::from_toml_str(
        r#"
        [transcription]
        engine = "vosk"
        "#,
    );
    match result {
        Err(Error::Config(msg)) => assert!(msg.contains("vosk"), "message: {}", msg),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_unsupported_backend_override_is_fatal() {
    let mut config = Config::default();
    let result = config.apply_overrides(lookup_from(&[("LRCFORGE_DB_BACKEND", "postgres")]));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_environment_overrides_toml() {
    let mut config = Config::from_toml_str(
        r#"
        media_root = "/from/toml"
        [enrichment]
        model = "toml-model"
        "#,
    )
    .unwrap();

    config
        .apply_overrides(lookup_from(&[
            ("LRCFORGE_MEDIA_ROOT", "/from/env"),
            ("LRCFORGE_ENGINE", "FASTER"),
            ("LRCFORGE_DB_BACKEND", "memory"),
            ("GEMINI_API_KEY", "secret"),
        ]))
        .unwrap();

    assert_eq!(config.media_root, PathBuf::from("/from/env"));
    assert_eq!(config.transcription.engine, EngineKind::Fast);
    assert_eq!(config.database.backend, LedgerBackend::Memory);
    assert_eq!(config.enrichment_api_key(), Some("secret"));
    // Not overridden
    assert_eq!(config.enrichment.model, "toml-model");
}

#[test]
fn test_blank_overrides_are_ignored() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup_from(&[("GEMINI_API_KEY", "   "), ("LRCFORGE_MODEL", "")]))
        .unwrap();
    assert_eq!(config.enrichment_api_key(), None);
    assert_eq!(config.transcription.model, "large-v3");
}

#[test]
#[serial]
fn test_explicit_missing_config_file_is_an_error() {
    let result = Config::load(Some(Path::new("/nonexistent/lrcforge.toml")));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_reads_config_from_environment_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[output]\nextension = \"txt\"\n").unwrap();

    std::env::set_var(ENV_CONFIG_PATH, &path);
    let result = Config::load(None);
    std::env::remove_var(ENV_CONFIG_PATH);

    assert_eq!(result.unwrap().output.extension, "txt");
}
