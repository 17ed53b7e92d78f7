use serde::{Deserialize, Serialize};

use super::{de_number, de_text};
use crate::format;

/// Country listed in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Country {
    pub id: u64,
    pub slug: String,
    pub name: String,
    /// ISO 3166-1 alpha-2 code, used for the flag glyph.
    #[serde(default, alias = "iso_code")]
    pub code: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    /// Cheapest plan price, if the backend includes it.
    #[serde(default)]
    pub starting_price: Option<f64>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

impl Country {
    pub fn flag(&self) -> String {
        format::country_flag(self.code.as_deref().unwrap_or_default())
    }
}

/// Multi-country region (e.g. "Europe", "Global").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    pub id: u64,
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub countries: Vec<Country>,
    #[serde(default)]
    pub packages: Vec<Package>,
}

/// Purchasable data plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: u64,
    #[serde(default)]
    pub slug: Option<String>,
    pub name: String,
    #[serde(deserialize_with = "de_number")]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Validity in days.
    #[serde(default)]
    pub validity: u32,
    /// Data allowance in GB, as the backend sends it ("0.5", "3", "unlimited").
    #[serde(default, deserialize_with = "de_text")]
    pub data: String,
    #[serde(default)]
    pub image: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Package {
    pub fn is_featured(&self) -> bool {
        format::is_featured(self.price)
    }

    pub fn data_label(&self) -> String {
        format::format_data_size(&self.data)
    }

    pub fn price_label(&self) -> String {
        format::format_price(self.price, &self.currency)
    }

    pub fn validity_label(&self) -> String {
        format::format_validity(self.validity)
    }
}

/// Device entry from `/deviceCompatible`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub brand: String,
    #[serde(alias = "name")]
    pub model: String,
    #[serde(default)]
    pub os: Option<String>,
}
