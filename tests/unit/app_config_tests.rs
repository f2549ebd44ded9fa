/*!
 * Tests for configuration loading and validation
 */

use anyhow::Result;
use doc_mt::BackendId;
use doc_mt::app_config::{Config, LockStoreKind};

#[test]
fn test_fromFile_withFullConfig_shouldLoadEverySection() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(
        &path,
        r#"{
            "default_backend": "deepl",
            "default_category": "tech",
            "log_level": "debug",
            "backends": [
                {"id": "dev", "char_limit": 500},
                {"id": "deepl", "api_key": "abc:fx", "concurrent_requests": 2,
                 "locale_map": {"en": "EN-GB"}}
            ],
            "segmentation": {
                "placeholder_prefix": "SKIP",
                "non_translatable": {"tags": ["code", "pre"]}
            },
            "lock": {"store": "database", "lease_secs": 10, "acquire_timeout_secs": 5},
            "database": {"path": "/tmp/doc-mt-test.db"}
        }"#,
    )?;

    let config = Config::from_file(&path)?;

    config.validate()?;
    assert_eq!(config.default_backend, BackendId::DeepL);
    assert_eq!(config.concurrent_requests(), 2);
    assert_eq!(config.get_backend_config(BackendId::Dev).map(|b| b.char_limit), Some(500));
    assert_eq!(config.segmentation.placeholder_prefix, "SKIP");
    assert_eq!(config.segmentation.non_translatable.tags, vec!["code", "pre"]);
    assert_eq!(config.segmentation.non_translatable.classes, vec!["notranslate"]);
    assert_eq!(config.lock.store, LockStoreKind::Database);
    assert_eq!(config.lock.poll_interval_ms, 100);
    assert!(config.database.path.is_some());
    Ok(())
}

#[test]
fn test_fromFile_withMalformedJson_shouldFail() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json")?;

    let err = Config::from_file(&path).unwrap_err();

    assert!(err.to_string().contains("Failed to parse config file"));
    Ok(())
}

#[test]
fn test_validate_withDuplicateBackend_shouldFail() {
    let mut config = Config::default();
    config.backends.push(config.backends[0].clone());

    let err = config.validate().unwrap_err();

    assert!(err.to_string().contains("configured twice"));
}

#[test]
fn test_validate_withBadPlaceholderPrefix_shouldFail() {
    let mut config = Config::default();
    config.segmentation.placeholder_prefix = "a b".to_string();

    assert!(config.validate().is_err());
}
