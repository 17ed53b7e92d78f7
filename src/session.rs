//! Session and user-data cookies.
//!
//! The token itself is issued by the backend login endpoint; this module only
//! stores it, expires it after a fixed max-age, and renders or parses the
//! cookie headers so server and client render contexts see the same values.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::errors::StorefrontError;
use crate::structs::user::UserCookieData;

pub const SESSION_COOKIE: &str = "auth_token";
pub const USER_COOKIE: &str = "user_data";

/// Default max-age of both cookies.
pub const DEFAULT_SESSION_MAX_AGE: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    /// Percent-encoded value as it appears on the wire.
    pub value: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
}

impl Cookie {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `Set-Cookie` header value.
    pub fn to_set_cookie(&self, now: DateTime<Utc>) -> String {
        let max_age = (self.expires_at - now).num_seconds().max(0);
        format!(
            "{}={}; Max-Age={}; Path={}; SameSite=Lax",
            self.name, self.value, max_age, self.path
        )
    }
}

/// `Set-Cookie` header value that deletes `name`.
pub fn removal_cookie(name: &str) -> String {
    format!("{}=; Max-Age=0; Path=/; SameSite=Lax", name)
}

/// Thread-safe cookie jar holding the session token and user snippet.
#[derive(Debug)]
pub struct CookieJar {
    cookies: DashMap<String, Cookie>,
    max_age: Duration,
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_MAX_AGE)
    }
}

impl CookieJar {
    pub fn new(max_age: std::time::Duration) -> Self {
        Self {
            cookies: DashMap::new(),
            max_age: Duration::from_std(max_age).unwrap_or_else(|_| Duration::days(7)),
        }
    }

    /// Builds a jar from an incoming `Cookie` request header. Cookies from a
    /// request carry no expiry, so they get a fresh max-age.
    pub fn from_cookie_header(header: &str, max_age: std::time::Duration) -> Self {
        let jar = Self::new(max_age);
        let now = Utc::now();

        for pair in header.split(';') {
            let Some((name, value)) = pair.trim().split_once('=') else {
                continue;
            };
            if name == SESSION_COOKIE || name == USER_COOKIE {
                jar.put(name, value.to_string(), now);
            }
        }

        jar
    }

    fn put(&self, name: &str, value: String, now: DateTime<Utc>) {
        self.cookies.insert(
            name.to_string(),
            Cookie {
                name: name.to_string(),
                value,
                path: "/".to_string(),
                expires_at: now + self.max_age,
            },
        );
    }

    fn live_value(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        let expired = {
            let cookie = self.cookies.get(name)?;
            if !cookie.is_expired_at(now) {
                return Some(cookie.value.clone());
            }
            true
        };

        if expired {
            tracing::debug!(cookie = name, "dropping expired cookie");
            self.cookies.remove(name);
        }
        None
    }

    pub fn set_session_token(&self, token: &str) {
        self.set_session_token_at(token, Utc::now());
    }

    pub fn set_session_token_at(&self, token: &str, now: DateTime<Utc>) {
        self.put(SESSION_COOKIE, urlencoding::encode(token).into_owned(), now);
    }

    pub fn session_token(&self) -> Option<String> {
        self.session_token_at(Utc::now())
    }

    pub fn session_token_at(&self, now: DateTime<Utc>) -> Option<String> {
        let raw = self.live_value(SESSION_COOKIE, now)?;
        let token = urlencoding::decode(&raw).ok()?.into_owned();
        (!token.is_empty()).then_some(token)
    }

    pub fn set_user(&self, user: &UserCookieData) -> Result<(), StorefrontError> {
        let json = serde_json::to_string(user)?;
        self.put(USER_COOKIE, urlencoding::encode(&json).into_owned(), Utc::now());
        Ok(())
    }

    /// Stored user snippet. A cookie that fails to decode is treated as absent.
    pub fn user(&self) -> Option<UserCookieData> {
        let raw = self.live_value(USER_COOKIE, Utc::now())?;
        let json = urlencoding::decode(&raw).ok()?;
        match serde_json::from_str(&json) {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed user cookie");
                None
            }
        }
    }

    /// Removes both cookies (logout, or a 401 from a protected call).
    pub fn clear_session(&self) {
        self.cookies.remove(SESSION_COOKIE);
        self.cookies.remove(USER_COOKIE);
    }

    /// `Set-Cookie` values to send back, including removals for cleared cookies.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        let now = Utc::now();
        [SESSION_COOKIE, USER_COOKIE]
            .iter()
            .map(|name| match self.cookies.get(*name) {
                Some(cookie) if !cookie.is_expired_at(now) => cookie.to_set_cookie(now),
                _ => removal_cookie(name),
            })
            .collect()
    }

    /// `Cookie` request header carrying every live cookie.
    pub fn cookie_header(&self) -> String {
        let now = Utc::now();
        let mut pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| !c.is_expired_at(now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        pairs.sort();
        pairs.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserCookieData {
        UserCookieData {
            id: 9,
            name: "Lin Park".into(),
            email: "lin@example.com".into(),
            currency: Some("EUR".into()),
        }
    }

    #[test]
    fn token_expires_after_max_age() {
        let jar = CookieJar::new(std::time::Duration::from_secs(60));
        let now = Utc::now();
        jar.set_session_token_at("abc|123", now);

        assert_eq!(jar.session_token_at(now + Duration::seconds(59)).as_deref(), Some("abc|123"));
        assert_eq!(jar.session_token_at(now + Duration::seconds(60)), None);
        assert_eq!(jar.session_token_at(now), None);
    }

    #[test]
    fn user_cookie_survives_header_round_trip() {
        let jar = CookieJar::default();
        jar.set_session_token("tok");
        jar.set_user(&user()).unwrap();

        let parsed = CookieJar::from_cookie_header(&jar.cookie_header(), DEFAULT_SESSION_MAX_AGE);
        assert_eq!(parsed.session_token().as_deref(), Some("tok"));
        assert_eq!(parsed.user(), Some(user()));
    }

    #[test]
    fn clearing_emits_removals() {
        let jar = CookieJar::default();
        jar.set_session_token("tok");
        assert!(jar.set_cookie_headers()[0].starts_with("auth_token=tok; Max-Age="));

        jar.clear_session();
        assert_eq!(
            jar.set_cookie_headers(),
            vec![removal_cookie(SESSION_COOKIE), removal_cookie(USER_COOKIE)]
        );
        assert!(jar.session_token().is_none());
    }

    #[test]
    fn ignores_foreign_and_malformed_cookies() {
        let jar = CookieJar::from_cookie_header("theme=dark; user_data=%7Bnot-json; junk", DEFAULT_SESSION_MAX_AGE);
        assert!(jar.user().is_none());
        assert!(jar.session_token().is_none());
        assert_eq!(jar.cookie_header(), "user_data=%7Bnot-json");
    }
}
