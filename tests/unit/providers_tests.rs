/*!
 * Tests for the backend registry and the configured backends
 */

use doc_mt::BackendId;
use doc_mt::app_config::BackendConfig;
use doc_mt::providers::{BackendRegistry, build_backend};
use doc_mt::translation::MediaType;

fn keyed(id: BackendId) -> BackendConfig {
    let mut config = BackendConfig::new(id);
    config.api_key = "test-key".to_string();
    config
}

#[test]
fn test_fromConfigs_shouldRegisterEveryBackend() {
    let configs = vec![
        BackendConfig::new(BackendId::Dev),
        keyed(BackendId::Google),
        keyed(BackendId::DeepL),
        keyed(BackendId::Microsoft),
    ];

    let registry = BackendRegistry::from_configs(&configs).unwrap();

    assert_eq!(
        registry.ids(),
        vec![BackendId::DeepL, BackendId::Dev, BackendId::Google, BackendId::Microsoft]
    );
}

#[test]
fn test_fromConfigs_withMissingApiKey_shouldFail() {
    let configs = vec![BackendConfig::new(BackendId::DeepL)];

    assert!(BackendRegistry::from_configs(&configs).is_err());
}

#[test]
fn test_get_withUnregisteredBackend_shouldNameIt() {
    let registry = BackendRegistry::from_configs(&[BackendConfig::new(BackendId::Dev)]).unwrap();

    let err = registry.get(BackendId::Google).unwrap_err();

    assert!(err.is_invalid_input());
    assert_eq!(err.to_string(), "Invalid input: Unsupported backendId:google");
}

#[test]
fn test_mapLocale_shouldFollowEachEngineConvention() {
    let google = build_backend(&keyed(BackendId::Google)).unwrap();
    let deepl = build_backend(&keyed(BackendId::DeepL)).unwrap();
    let microsoft = build_backend(&keyed(BackendId::Microsoft)).unwrap();

    assert_eq!(google.map_locale("zh-TW").as_deref(), Some("zh-TW"));
    assert_eq!(google.map_locale("he").as_deref(), Some("iw"));
    assert_eq!(deepl.map_locale("pt-BR").as_deref(), Some("PT-BR"));
    assert_eq!(deepl.map_locale("en").as_deref(), Some("EN-US"));
    assert_eq!(microsoft.map_locale("zh-CN").as_deref(), Some("zh-Hans"));
    assert_eq!(microsoft.map_locale("de-AT").as_deref(), Some("de"));
}

#[test]
fn test_mapLocale_withOverride_shouldPreferConfiguredCode() {
    let mut config = keyed(BackendId::Google);
    config
        .locale_map
        .insert("pt-BR".to_string(), "pt".to_string());

    let google = build_backend(&config).unwrap();

    assert_eq!(google.map_locale("pt-BR").as_deref(), Some("pt"));
}

#[test]
fn test_devBackend_shouldPseudoTranslateInOrder() {
    let dev = build_backend(&BackendConfig::new(BackendId::Dev)).unwrap();
    let sources = vec!["one".to_string(), "two".to_string()];

    let results = tokio_test::block_on(dev.translate_batch(
        &sources,
        Some("en"),
        "de",
        MediaType::Plain,
        None,
    ))
    .unwrap();

    let contents: Vec<_> = results.iter().map(|r| r.content.as_str()).collect();
    assert_eq!(contents, vec!["translated[网 one 网]", "translated[网 two 网]"]);
}
