//! Translation lookup over static JSON dictionaries.
//!
//! Keys are dotted paths into nested objects (`catalog.starting_from`).
//! Lookups fall back to English, then to the raw key.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Fr,
    Es,
    De,
    Ar,
}

impl Language {
    pub const ALL: [Language; 5] = [Language::En, Language::Fr, Language::Es, Language::De, Language::Ar];

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Fr => "fr",
            Language::Es => "es",
            Language::De => "de",
            Language::Ar => "ar",
        }
    }

    /// Name of the language in itself, for the language picker.
    pub fn native_name(self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Fr => "Français",
            Language::Es => "Español",
            Language::De => "Deutsch",
            Language::Ar => "العربية",
        }
    }

    pub fn is_rtl(self) -> bool {
        self == Language::Ar
    }

    /// Matches the primary subtag of a BCP 47 tag (`fr-CA`, `es_MX.UTF-8`).
    pub fn from_locale_tag(tag: &str) -> Option<Self> {
        let primary = tag.split(['-', '_', '.']).next()?.trim();
        Language::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(primary))
    }

    /// Language of the OS locale, when supported.
    pub fn detect() -> Option<Self> {
        sys_locale::get_locale().and_then(|tag| Self::from_locale_tag(&tag))
    }

    fn source(self) -> &'static str {
        match self {
            Language::En => include_str!("../locales/en.json"),
            Language::Fr => include_str!("../locales/fr.json"),
            Language::Es => include_str!("../locales/es.json"),
            Language::De => include_str!("../locales/de.json"),
            Language::Ar => include_str!("../locales/ar.json"),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::from_locale_tag(s).ok_or_else(|| format!("unsupported language: {}", s))
    }
}

static DICTIONARIES: OnceLock<Vec<(Language, Value)>> = OnceLock::new();

fn dictionary(language: Language) -> &'static Value {
    static EMPTY: Value = Value::Null;

    let all = DICTIONARIES.get_or_init(|| {
        Language::ALL
            .into_iter()
            .map(|lang| {
                let value = serde_json::from_str(lang.source()).unwrap_or_else(|err| {
                    tracing::error!(language = %lang, error = %err, "locale dictionary is not valid JSON");
                    Value::Null
                });
                (lang, value)
            })
            .collect()
    });

    all.iter()
        .find(|(lang, _)| *lang == language)
        .map(|(_, value)| value)
        .unwrap_or(&EMPTY)
}

fn lookup<'a>(dictionary: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(dictionary, |node, segment| node.as_object()?.get(segment))?
        .as_str()
}

/// Replaces `{name}` tokens. Unmatched tokens stay as they are.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    params.iter().fold(template.to_string(), |text, (name, value)| {
        text.replace(&format!("{{{}}}", name), value)
    })
}

/// Resolves keys for one active language.
#[derive(Debug, Clone, Copy, Default)]
pub struct Translator {
    language: Language,
}

impl Translator {
    pub fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// Translated string for `key`. Missing keys fall back to English and then
    /// to the key itself, with a warning.
    pub fn t(&self, key: &str, params: &[(&str, &str)]) -> String {
        let found = lookup(dictionary(self.language), key).or_else(|| {
            if self.language != Language::En {
                tracing::trace!(language = %self.language, key, "falling back to English");
            }
            lookup(dictionary(Language::En), key)
        });

        match found {
            Some(template) => interpolate(template, params),
            None => {
                tracing::warn!(language = %self.language, key, "missing translation");
                key.to_string()
            }
        }
    }

    /// True when the active language or English has a string at `key`.
    pub fn has(&self, key: &str) -> bool {
        lookup(dictionary(self.language), key).is_some() || lookup(dictionary(Language::En), key).is_some()
    }
}

/// Every leaf key of the English dictionary, dotted.
pub fn default_keys() -> Vec<String> {
    fn walk(node: &Value, prefix: &str, out: &mut Vec<String>) {
        match node {
            Value::Object(map) => {
                for (name, child) in map {
                    let path = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{}.{}", prefix, name)
                    };
                    walk(child, &path, out);
                }
            }
            Value::String(_) => out.push(prefix.to_string()),
            _ => {}
        }
    }

    let mut keys = Vec::new();
    walk(dictionary(Language::En), "", &mut keys);
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_key_resolves_in_every_language() {
        let keys = default_keys();
        assert!(!keys.is_empty());

        for language in Language::ALL {
            let translator = Translator::new(language);
            for key in &keys {
                let value = translator.t(key, &[]);
                assert_ne!(&value, key, "{} did not resolve for {}", key, language);
            }
        }
    }

    #[test]
    fn uses_active_language_first() {
        let fr = Translator::new(Language::Fr);
        assert_eq!(fr.t("nav.home", &[]), "Accueil");
        // Only in English.
        assert_eq!(fr.t("devices.laptop", &[]), "Laptops");
    }

    #[test]
    fn non_string_nodes_fall_through() {
        let en = Translator::new(Language::En);
        assert_eq!(en.t("orders.status", &[]), "orders.status");
        assert_eq!(en.t("orders.status.pending.extra", &[]), "orders.status.pending.extra");
        assert!(!en.has("nav"));
    }

    #[test]
    fn missing_key_returns_key() {
        let de = Translator::new(Language::De);
        assert_eq!(de.t("nope.nothing", &[]), "nope.nothing");
    }

    #[test]
    fn substitutes_placeholders_and_keeps_unmatched() {
        let en = Translator::new(Language::En);
        assert_eq!(en.t("profile.greeting", &[("name", "Sam")]), "Hello, Sam");
        assert_eq!(en.t("catalog.starting_from", &[("other", "x")]), "From {price}");
        assert_eq!(
            interpolate("{a} and {a} but {b}", &[("a", "1")]),
            "1 and 1 but {b}"
        );
    }

    #[test]
    fn lookups_are_idempotent() {
        let es = Translator::new(Language::Es);
        let params = [("price", "$5.00")];
        assert_eq!(es.t("catalog.starting_from", &params), es.t("catalog.starting_from", &params));
    }

    #[test]
    fn parses_locale_tags() {
        assert_eq!(Language::from_locale_tag("fr-CA"), Some(Language::Fr));
        assert_eq!(Language::from_locale_tag("es_MX.UTF-8"), Some(Language::Es));
        assert_eq!(Language::from_locale_tag("AR"), Some(Language::Ar));
        assert_eq!(Language::from_locale_tag("ja-JP"), None);
        assert_eq!("de".parse::<Language>(), Ok(Language::De));
        assert!(Language::Ar.is_rtl());
    }
}
