/*!
 * Tests for locale utility functions
 */

use doc_mt::language_utils::{language_subtag, primary_language};
use doc_mt::{get_language_name, language_codes_match, normalize_locale};

#[test]
fn test_normalizeLocale_withRegionAndScript_shouldUseCanonicalCase() {
    assert_eq!(normalize_locale(" en-us ").unwrap(), "en-US");
    assert_eq!(normalize_locale("ZH_hant").unwrap(), "zh-TW");
    assert_eq!(normalize_locale("zh-Hans").unwrap(), "zh-CN");
    assert_eq!(normalize_locale("de").unwrap(), "de");
}

#[test]
fn test_normalizeLocale_withGarbage_shouldFail() {
    for code in ["", "  ", "123", "en US", "english"] {
        assert!(normalize_locale(code).is_err(), "{:?} should be rejected", code);
    }
}

#[test]
fn test_languageSubtag_shouldLowercaseFirstPart() {
    assert_eq!(language_subtag("PT-br"), "pt");
    assert_eq!(language_subtag("sr_Latn_RS"), "sr");
}

#[test]
fn test_primaryLanguage_shouldAcceptTwoAndThreeLetterCodes() {
    assert_eq!(primary_language("fr"), primary_language("fra"));
    assert!(primary_language("fr-CA").is_some());
    assert!(primary_language("q").is_none());
}

#[test]
fn test_languageCodesMatch_withRegions_shouldIgnoreThem() {
    assert!(language_codes_match("pt-BR", "pt-PT"));
    assert!(!language_codes_match("zh-CN", "ja"));
    assert!(!language_codes_match("", "en"));
}

#[test]
fn test_getLanguageName_withUnknownCode_shouldFail() {
    assert_eq!(get_language_name("de-CH").unwrap(), "German");
    assert!(get_language_name("zz").is_err());
}
