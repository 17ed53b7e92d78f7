use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub mod catalog;
pub mod client;
pub mod order;
pub mod ticket;
pub mod user;

/// One page of a paginated listing.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default = "first_page")]
    pub current_page: u32,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub per_page: Option<u32>,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

impl<T> Paginated<T> {
    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn next_page(&self) -> Option<u32> {
        self.has_next().then_some(self.current_page + 1)
    }
}

/// Site-wide settings returned by `/generalSettings`.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct GeneralSettings {
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub support_email: Option<String>,
    #[serde(default)]
    pub support_phone: Option<String>,
    #[serde(default)]
    pub default_currency: Option<String>,
    #[serde(default)]
    pub social_links: HashMap<String, String>,
    /// Keys this client does not model yet.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// CMS page (about, what-is-eSIM, terms).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub meta_description: Option<String>,
}

/// Accepts `12.5`, `"12.50"` or `null` (as 0).
pub(crate) fn de_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().ok_or_else(|| de::Error::custom("number out of range")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("expected a number, got {:?}", s))),
        Value::Null => Ok(0.0),
        other => Err(de::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Accepts a string or a number and keeps its textual form.
pub(crate) fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(de::Error::custom(format!("expected text, got {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paginated_navigation() {
        let page: Paginated<u32> =
            serde_json::from_value(json!({"data": [1, 2], "current_page": 1, "last_page": 3, "total": 6}))
                .unwrap();
        assert_eq!(page.next_page(), Some(2));

        let last: Paginated<u32> = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(!last.has_next());
    }

    #[test]
    fn settings_keep_unknown_keys() {
        let settings: GeneralSettings = serde_json::from_value(json!({
            "site_name": "Roam",
            "maintenance": false
        }))
        .unwrap();
        assert_eq!(settings.site_name.as_deref(), Some("Roam"));
        assert_eq!(settings.extra.get("maintenance"), Some(&json!(false)));
    }
}
