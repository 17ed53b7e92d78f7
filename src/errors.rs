use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Storefront client errors.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// The API answered with a non-2xx status or a `success: false` envelope.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Failed to send a request to the storefront API.
    #[error("Failed to send a request to the storefront API: {0}")]
    Transport(String),

    /// The response body did not match the expected shape.
    #[error("Failed to decode storefront API response: {0}")]
    Decode(String),

    /// The client configuration is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Reading or writing persisted preferences failed.
    #[error("Preference storage failed: {0}")]
    Storage(String),

    /// A caller-supplied value was rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorefrontError {
    /// Returns the API error when this is one.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            StorefrontError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for StorefrontError {
    fn from(err: serde_json::Error) -> Self {
        StorefrontError::Decode(err.to_string())
    }
}

/// Error returned by the storefront API.
///
/// Both transport-level failures (non-2xx) and envelope-level failures
/// (HTTP 200 with `success: false`) are normalized into this one shape.
#[derive(Debug, Clone, Error)]
#[error("{kind} ({status}): {message}")]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: ApiErrorKind,
    pub message: String,
    /// Best-effort parsed error body. `Value::Null` when the body was not JSON.
    pub body: Value,
}

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// 400: the parameters passed to the endpoint were not correct.
    BadRequest,
    /// 401: the bearer token is missing or expired.
    Unauthorized,
    /// 403: the session is not allowed to access the resource.
    Forbidden,
    /// 404
    NotFound,
    /// 422: payload failed server-side validation.
    Validation,
    /// 429
    RateLimited,
    /// Any other 4xx.
    Client,
    /// 5xx and anything unexpected.
    Server,
    /// HTTP 2xx with `success: false`.
    Envelope,
}

impl std::fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApiErrorKind::BadRequest => "Bad request",
            ApiErrorKind::Unauthorized => "Unauthorized",
            ApiErrorKind::Forbidden => "Forbidden",
            ApiErrorKind::NotFound => "Not found",
            ApiErrorKind::Validation => "Validation failed",
            ApiErrorKind::RateLimited => "Rate limited",
            ApiErrorKind::Client => "Client error",
            ApiErrorKind::Server => "Server error",
            ApiErrorKind::Envelope => "Request unsuccessful",
        };
        f.write_str(name)
    }
}

impl ApiError {
    /// Builds an error from a non-2xx response.
    pub fn from_status(status: StatusCode, body: Value) -> Self {
        let kind = match status {
            StatusCode::BAD_REQUEST => ApiErrorKind::BadRequest,
            StatusCode::UNAUTHORIZED => ApiErrorKind::Unauthorized,
            StatusCode::FORBIDDEN => ApiErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ApiErrorKind::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => ApiErrorKind::Validation,
            StatusCode::TOO_MANY_REQUESTS => ApiErrorKind::RateLimited,
            s if s.is_client_error() => ApiErrorKind::Client,
            _ => ApiErrorKind::Server,
        };
        let message = message_from_body(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Request failed").to_string());

        Self {
            status,
            kind,
            message,
            body,
        }
    }

    /// Builds an error from a 2xx response whose envelope reported `success: false`.
    pub fn from_envelope(status: StatusCode, body: Value) -> Self {
        let message = message_from_body(&body).unwrap_or_else(|| "Request unsuccessful".to_string());

        Self {
            status,
            kind: ApiErrorKind::Envelope,
            message,
            body,
        }
    }

    /// True for any 4xx status.
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// True for 401 and 403.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
    }

    /// Field-level validation messages, when the body carries an `errors` map.
    pub fn field_errors(&self) -> Vec<(String, String)> {
        let Some(errors) = self.body.get("errors").and_then(Value::as_object) else {
            return Vec::new();
        };

        errors
            .iter()
            .filter_map(|(field, messages)| {
                let first = match messages {
                    Value::Array(items) => items.first().and_then(Value::as_str),
                    Value::String(s) => Some(s.as_str()),
                    _ => None,
                }?;
                Some((field.clone(), first.to_string()))
            })
            .collect()
    }
}

fn message_from_body(body: &Value) -> Option<String> {
    ["message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_auth_statuses() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, Value::Null);
        assert_eq!(err.kind, ApiErrorKind::Forbidden);
        assert!(err.is_auth_error());
        assert!(err.is_client_error());
        assert_eq!(err.message, "Forbidden");
    }

    #[test]
    fn server_errors_are_not_client_errors() {
        let err = ApiError::from_status(StatusCode::BAD_GATEWAY, json!({"message": "upstream down"}));
        assert_eq!(err.kind, ApiErrorKind::Server);
        assert!(!err.is_client_error());
        assert_eq!(err.message, "upstream down");
    }

    #[test]
    fn envelope_error_keeps_http_status() {
        let err = ApiError::from_envelope(StatusCode::OK, json!({"success": false, "message": "Out of stock"}));
        assert_eq!(err.kind, ApiErrorKind::Envelope);
        assert_eq!(err.status, StatusCode::OK);
        assert_eq!(err.to_string(), "Request unsuccessful (200 OK): Out of stock");
    }

    #[test]
    fn reads_field_errors() {
        let err = ApiError::from_status(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"message": "invalid", "errors": {"subject": ["The subject field is required."]}}),
        );
        assert_eq!(
            err.field_errors(),
            vec![("subject".to_string(), "The subject field is required.".to_string())]
        );
    }
}
