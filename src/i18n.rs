use std::collections::HashMap;

use fluent_templates::{
    fluent_bundle::{FluentArgs, FluentValue},
    static_loader, Loader,
};
use once_cell::sync::Lazy;
use unic_langid::{langid, LanguageIdentifier};

static_loader! {
    static LOCALES = {
        locales: "./locales",
        fallback_language: "en",
    };
}

/// Supported languages (code, picker button label).
///
/// Order matches the picker layout, two buttons per row.
pub static SUPPORTED_LANGS: &[(&str, &str)] = &[
    ("en", "English 🇬🇧"),
    ("zh", "中文 🇨🇳"),
    ("id", "Indonesia 🇮🇩"),
    ("fil", "Filipino 🇵🇭"),
    ("vi", "Tiếng Việt 🇻🇳"),
    ("ru", "Русский 🇷🇺"),
];

/// Default language identifier used as a fallback.
static DEFAULT_LANG: Lazy<LanguageIdentifier> = Lazy::new(|| langid!("en"));

/// Base language
pub fn default_lang() -> LanguageIdentifier {
    DEFAULT_LANG.clone()
}

/// Normalizes a language code into a LanguageIdentifier (falls back to default).
pub fn lang_from_code(code: &str) -> LanguageIdentifier {
    let code_normalized = code.trim().to_lowercase();
    let normalized = match code_normalized.as_str() {
        "en" | "en-us" | "en-gb" => "en",
        "zh" | "zh-cn" | "zh-hans" => "zh",
        "id" | "id-id" => "id",
        // Older clients send "ph" or "tl" for Filipino
        "fil" | "ph" | "tl" | "fil-ph" => "fil",
        "vi" | "vi-vn" => "vi",
        "ru" | "ru-ru" => "ru",
        other => other,
    };

    normalized.parse().unwrap_or_else(|_| DEFAULT_LANG.clone())
}

/// Maps a language-picker button label to its language.
pub fn language_from_button(label: &str) -> Option<LanguageIdentifier> {
    SUPPORTED_LANGS
        .iter()
        .find(|(_, button)| *button == label.trim())
        .map(|(code, _)| lang_from_code(code))
}

/// Picker rows: two buttons per row.
pub fn language_keyboard_rows() -> Vec<Vec<String>> {
    SUPPORTED_LANGS
        .chunks(2)
        .map(|pair| pair.iter().map(|(_, button)| button.to_string()).collect())
        .collect()
}

/// Returns a localized string for the given key.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t(lang: &LanguageIdentifier, key: &str) -> String {
    let text = LOCALES
        .lookup(lang, key)
        .unwrap_or_else(|| LOCALES.lookup(&DEFAULT_LANG, key).unwrap_or_else(|| key.to_string()));
    text.replace("\\n", "\n")
}

/// Returns a localized string with arguments for interpolation.
/// Converts literal `\n` sequences to actual newlines for proper Telegram formatting.
pub fn t_args(lang: &LanguageIdentifier, key: &str, args: &FluentArgs) -> String {
    let args_map: HashMap<String, FluentValue> = args.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();

    let text = LOCALES.lookup_with_args(lang, key, &args_map).unwrap_or_else(|| {
        LOCALES
            .lookup_with_args(&DEFAULT_LANG, key, &args_map)
            .unwrap_or_else(|| key.to_string())
    });
    // Fluent wraps placeables in bidi isolation marks
    text.replace("\\n", "\n").replace(['\u{2068}', '\u{2069}'], "")
}
