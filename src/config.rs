use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::time::Duration;

use crate::errors::StorefrontError;
use crate::i18n::Language;
use crate::policy::{CachePolicy, RetryPolicy};
use crate::session::DEFAULT_SESSION_MAX_AGE;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// Storefront client configuration, sourced from environment variables.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub api_base_url: Url,
    pub request_timeout: Duration,
    pub cache: CachePolicy,
    pub retry: RetryPolicy,
    pub session_max_age: Duration,
    /// Forces a UI language instead of the persisted/OS one.
    pub language: Option<Language>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api_base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default base URL is valid"),
            request_timeout: Duration::from_secs(30),
            cache: CachePolicy::default(),
            retry: RetryPolicy::default(),
            session_max_age: DEFAULT_SESSION_MAX_AGE,
            language: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StorefrontConfigOverride {
    api_base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    stale_after_secs: Option<u64>,
    evict_after_secs: Option<u64>,
    max_retries: Option<u32>,
    session_max_age_secs: Option<u64>,
    language: Option<String>,
}

impl StorefrontConfig {
    pub fn from_env() -> Result<Self, StorefrontError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Environment first, then `ESIM_STOREFRONT_CONFIG` (a TOML file) on top.
    pub fn from_env_or_toml() -> Result<Self, StorefrontError> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("ESIM_STOREFRONT_CONFIG") {
            let contents = fs::read_to_string(&path)
                .map_err(|err| StorefrontError::Config(format!("read ESIM_STOREFRONT_CONFIG {}: {}", path, err)))?;
            config.apply_toml(&contents)?;
        }
        Ok(config)
    }

    /// Reads settings through `lookup` so callers can supply something other
    /// than the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorefrontError> {
        let overrides = StorefrontConfigOverride {
            api_base_url: lookup("ESIM_API_BASE_URL"),
            request_timeout_secs: parse_var(&lookup, "ESIM_REQUEST_TIMEOUT_SECS")?,
            stale_after_secs: parse_var(&lookup, "ESIM_STALE_AFTER_SECS")?,
            evict_after_secs: parse_var(&lookup, "ESIM_EVICT_AFTER_SECS")?,
            max_retries: parse_var(&lookup, "ESIM_MAX_RETRIES")?,
            session_max_age_secs: parse_var(&lookup, "ESIM_SESSION_MAX_AGE_SECS")?,
            language: lookup("ESIM_LANGUAGE"),
        };

        let mut config = Self::default();
        config.apply(overrides)?;
        Ok(config)
    }

    pub fn apply_toml(&mut self, contents: &str) -> Result<(), StorefrontError> {
        let overrides: StorefrontConfigOverride = toml::from_str(contents)
            .map_err(|err| StorefrontError::Config(format!("parse storefront config toml: {}", err)))?;
        self.apply(overrides)
    }

    fn apply(&mut self, overrides: StorefrontConfigOverride) -> Result<(), StorefrontError> {
        if let Some(value) = overrides.api_base_url {
            self.api_base_url = parse_base_url(&value)?;
        }
        if let Some(secs) = overrides.request_timeout_secs {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.stale_after_secs {
            self.cache.stale_after = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.evict_after_secs {
            self.cache.evict_after = Duration::from_secs(secs);
        }
        if let Some(retries) = overrides.max_retries {
            self.retry.max_retries = retries;
        }
        if let Some(secs) = overrides.session_max_age_secs {
            self.session_max_age = Duration::from_secs(secs);
        }
        if let Some(value) = overrides.language {
            let language = value.parse::<Language>().map_err(StorefrontError::Config)?;
            self.language = Some(language);
        }

        if self.cache.evict_after < self.cache.stale_after {
            return Err(StorefrontError::Config(
                "evict_after must not be shorter than stale_after".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, StorefrontError> {
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| StorefrontError::Config(format!("parse {}: {:?}", key, raw)))
        })
        .transpose()
}

fn parse_base_url(value: &str) -> Result<Url, StorefrontError> {
    let url = Url::parse(value).map_err(|err| StorefrontError::Config(format!("parse api_base_url: {}", err)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(StorefrontError::Config(format!(
            "api_base_url must be http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = StorefrontConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.api_base_url.as_str(), "http://localhost:8000/api");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.cache.stale_after, Duration::from_secs(60));
        assert_eq!(config.language, None);
    }

    #[test]
    fn reads_env_values() {
        let config = StorefrontConfig::from_lookup(lookup(&[
            ("ESIM_API_BASE_URL", "https://api.example.com/v1"),
            ("ESIM_STALE_AFTER_SECS", "30"),
            ("ESIM_MAX_RETRIES", "0"),
            ("ESIM_LANGUAGE", "fr-FR"),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url.as_str(), "https://api.example.com/v1");
        assert_eq!(config.cache.stale_after, Duration::from_secs(30));
        assert_eq!(config.retry.max_retries, 0);
        assert_eq!(config.language, Some(Language::Fr));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(StorefrontConfig::from_lookup(lookup(&[("ESIM_MAX_RETRIES", "two")])).is_err());
        assert!(StorefrontConfig::from_lookup(lookup(&[("ESIM_API_BASE_URL", "ftp://x")])).is_err());
        assert!(StorefrontConfig::from_lookup(lookup(&[("ESIM_EVICT_AFTER_SECS", "5")])).is_err());
    }

    #[test]
    fn toml_overrides_env() {
        let mut config = StorefrontConfig::from_lookup(lookup(&[("ESIM_LANGUAGE", "de")])).unwrap();
        config
            .apply_toml("api_base_url = \"https://staging.example.com/api\"\nlanguage = \"es\"\nrequest_timeout_secs = 5\n")
            .unwrap();
        assert_eq!(config.api_base_url.host_str(), Some("staging.example.com"));
        assert_eq!(config.language, Some(Language::Es));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
