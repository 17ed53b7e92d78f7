//! Groups the flat device-compatibility list for display.
//!
//! The backend only sends free-text brand/OS/model fields, so categories and
//! brands are inferred by substring matching. All of the matching lives in
//! the two tables below.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::structs::catalog::Device;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Phone,
    Tablet,
    Wearable,
    Laptop,
}

impl DeviceCategory {
    /// Translation key for the category heading.
    pub fn label_key(self) -> &'static str {
        match self {
            DeviceCategory::Phone => "devices.phone",
            DeviceCategory::Tablet => "devices.tablet",
            DeviceCategory::Wearable => "devices.wearable",
            DeviceCategory::Laptop => "devices.laptop",
        }
    }
}

/// First match wins; anything unmatched is a phone.
const CATEGORY_RULES: &[(DeviceCategory, &[&str])] = &[
    (DeviceCategory::Wearable, &["watch", "wear os"]),
    (DeviceCategory::Tablet, &["ipad", "ipados", "tablet", "galaxy tab", " tab "]),
    (
        DeviceCategory::Laptop,
        &["windows", "macbook", "chromebook", "surface", "laptop", "thinkpad"],
    ),
];

const BRAND_RULES: &[(&str, &[&str])] = &[
    ("Apple", &["apple", "iphone", "ipad", "ios", "macbook"]),
    ("Samsung", &["samsung", "galaxy"]),
    ("Google", &["google", "pixel"]),
    ("Huawei", &["huawei"]),
    ("Xiaomi", &["xiaomi", "redmi", "poco"]),
    ("Motorola", &["motorola", "moto "]),
    ("OnePlus", &["oneplus"]),
    ("Oppo", &["oppo"]),
    ("Sony", &["sony", "xperia"]),
    ("Microsoft", &["microsoft", "surface"]),
];

const OTHER_BRAND: &str = "Other";

fn haystack(device: &Device) -> String {
    format!(
        " {} {} {} ",
        device.brand,
        device.os.as_deref().unwrap_or_default(),
        device.model
    )
    .to_lowercase()
}

pub fn categorize(device: &Device) -> DeviceCategory {
    let text = haystack(device);
    CATEGORY_RULES
        .iter()
        .find(|(_, needles)| needles.iter().any(|n| text.contains(n)))
        .map(|(category, _)| *category)
        .unwrap_or(DeviceCategory::Phone)
}

/// Canonical brand name; the trimmed raw brand when no rule matches.
pub fn brand_of(device: &Device) -> String {
    let brand_text = format!(" {} ", device.brand).to_lowercase();
    let full_text = haystack(device);

    // Prefer the brand field; model/OS text is only a fallback.
    [brand_text, full_text]
        .iter()
        .find_map(|text| {
            BRAND_RULES
                .iter()
                .find(|(_, needles)| needles.iter().any(|n| text.contains(n)))
                .map(|(brand, _)| brand.to_string())
        })
        .unwrap_or_else(|| {
            let raw = device.brand.trim();
            if raw.is_empty() {
                OTHER_BRAND.to_string()
            } else {
                raw.to_string()
            }
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandGroup {
    pub brand: String,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryGroup {
    pub category: DeviceCategory,
    pub brands: Vec<BrandGroup>,
}

/// category → brand → models. Categories follow enum order, brands are
/// alphabetical, models keep their input order without duplicates.
pub fn group_devices(devices: &[Device]) -> Vec<CategoryGroup> {
    let mut tree: BTreeMap<DeviceCategory, BTreeMap<String, Vec<String>>> = BTreeMap::new();

    for device in devices {
        let model = device.model.trim();
        if model.is_empty() {
            continue;
        }
        let models = tree
            .entry(categorize(device))
            .or_default()
            .entry(brand_of(device))
            .or_default();
        if !models.iter().any(|m| m == model) {
            models.push(model.to_string());
        }
    }

    tree.into_iter()
        .map(|(category, brands)| CategoryGroup {
            category,
            brands: brands
                .into_iter()
                .map(|(brand, models)| BrandGroup { brand, models })
                .collect(),
        })
        .collect()
}
