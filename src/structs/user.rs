use serde::{Deserialize, Serialize};

/// Profile returned by `/profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Country of residence, ISO alpha-2.
    #[serde(default)]
    pub country: Option<String>,
    /// Preferred billing currency. Falls back to the site default when null.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub membership_level: MembershipLevel,
}

/// Loyalty tier. Unknown tiers from the backend are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MembershipLevel {
    #[default]
    Basic,
    Silver,
    Gold,
    Platinum,
    Other(String),
}

impl From<String> for MembershipLevel {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "basic" | "" => MembershipLevel::Basic,
            "silver" => MembershipLevel::Silver,
            "gold" => MembershipLevel::Gold,
            "platinum" => MembershipLevel::Platinum,
            _ => MembershipLevel::Other(value),
        }
    }
}

impl From<MembershipLevel> for String {
    fn from(level: MembershipLevel) -> Self {
        match level {
            MembershipLevel::Basic => "basic".to_string(),
            MembershipLevel::Silver => "silver".to_string(),
            MembershipLevel::Gold => "gold".to_string(),
            MembershipLevel::Platinum => "platinum".to_string(),
            MembershipLevel::Other(other) => other,
        }
    }
}

/// Profile snippet kept in the `user_data` cookie so pages can greet the
/// user without waiting for `/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCookieData {
    pub id: u64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub currency: Option<String>,
}

impl From<&Profile> for UserCookieData {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id,
            name: profile.name.clone(),
            email: profile.email.clone(),
            currency: profile.currency.clone(),
        }
    }
}
