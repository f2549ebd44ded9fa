//! Locale utilities
//!
//! Locale codes are BCP 47 style tags such as `de`, `pt-BR` or `zh-CN`.
//! The language subtag is validated against ISO 639 with `isolang`; script
//! and region subtags are only case-normalized.

use anyhow::{Result, anyhow};
use isolang::Language;

/// Resolve the language subtag of a locale code
pub fn primary_language(code: &str) -> Option<Language> {
    let primary = language_subtag(code);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
}

/// Lowercase language subtag of a locale code
pub fn language_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Normalize a locale code to `ll`, `ll-RR` or `ll-Ssss-RR` form
///
/// Chinese script tags map to the region tags backends understand:
/// `zh-Hans` becomes `zh-CN` and `zh-Hant` becomes `zh-TW`.
pub fn normalize_locale(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Locale code is empty"));
    }
    if primary_language(trimmed).is_none() {
        return Err(anyhow!("Invalid locale code: {}", code));
    }

    let mut parts = Vec::new();
    for (index, subtag) in trimmed.split(['-', '_']).enumerate() {
        if subtag.is_empty() || !subtag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(anyhow!("Invalid locale code: {}", code));
        }
        let normalized = match (index, subtag.len()) {
            (0, _) => subtag.to_lowercase(),
            (_, 4) => {
                let lower = subtag.to_lowercase();
                let mut chars = lower.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => lower,
                }
            }
            (_, 2) | (_, 3) => subtag.to_uppercase(),
            _ => subtag.to_lowercase(),
        };
        parts.push(normalized);
    }

    let joined = parts.join("-");
    Ok(match joined.as_str() {
        "zh-Hans" => "zh-CN".to_string(),
        "zh-Hant" => "zh-TW".to_string(),
        _ => joined,
    })
}

/// Check if two locale codes refer to the same language
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (primary_language(code1), primary_language(code2)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Get the English language name for a locale code
pub fn get_language_name(code: &str) -> Result<String> {
    let lang = primary_language(code)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", code))?;
    Ok(lang.to_name().to_string())
}
