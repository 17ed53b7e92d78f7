use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::errors::StorefrontError;

/// A request ready to be put on the wire.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    /// Bearer token sent in the `Authorization` header.
    pub bearer: Option<String>,
    /// Sent as `Accept-Language` so the backend localizes catalog text.
    pub language: Option<String>,
    pub body: RequestBody,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Serialized with a JSON content type.
    Json(Value),
    /// Passed through untouched; the transport sets its own multipart boundary.
    Form(FormPayload),
}

/// Multipart form payload, used for ticket attachments.
#[derive(Debug, Clone, Default)]
pub struct FormPayload {
    pub parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

#[derive(Debug, Clone)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: FormValue::Text(value.into()),
        });
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        self.parts.push(FormPart {
            name: name.to_string(),
            value: FormValue::File {
                file_name: file_name.to_string(),
                mime: mime.to_string(),
                bytes,
            },
        });
        self
    }
}

/// Raw response: status and undecoded body bytes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// Sends requests to the storefront API.
///
/// [`HttpTransport`] is the real implementation; tests substitute an
/// in-memory one.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, StorefrontError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, StorefrontError> {
        Self::from_builder(client_builder(timeout))
    }

    fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, StorefrontError> {
        let client = builder
            .build()
            .map_err(|err| StorefrontError::Config(err.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, StorefrontError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .header(ACCEPT, "application/json");

        if let Some(token) = &request.bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        if let Some(language) = &request.language {
            builder = builder.header(ACCEPT_LANGUAGE, language.as_str());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(payload) => builder.multipart(build_form(payload)?),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| StorefrontError::Transport(err.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| StorefrontError::Transport(err.to_string()))?;

        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("esim-storefront-client/", env!("CARGO_PKG_VERSION")))
}

fn build_form(payload: FormPayload) -> Result<reqwest::multipart::Form, StorefrontError> {
    let mut form = reqwest::multipart::Form::new();

    for part in payload.parts {
        form = match part.value {
            FormValue::Text(text) => form.text(part.name, text),
            FormValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let file = reqwest::multipart::Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(&mime)
                    .map_err(|err| StorefrontError::InvalidInput(err.to_string()))?;
                form.part(part.name, file)
            }
        };
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const OK_RESPONSE: &[u8] =
        b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 16\r\nconnection: close\r\n\r\n{\"success\":true}";

    /// Accepts one connection, reads a whole request and answers 200.
    /// Returns the lower-cased request head.
    async fn capture_head(listener: &TcpListener) -> String {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..read]);
            if request_complete(&raw) {
                break;
            }
        }
        socket.write_all(OK_RESPONSE).await.unwrap();
        socket.shutdown().await.unwrap();

        let text = String::from_utf8_lossy(&raw).to_lowercase();
        text.split("\r\n\r\n").next().unwrap_or_default().to_string()
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw).to_lowercase();
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let head = &text[..end];
        let body_len = raw.len() - end - 4;

        if let Some(length) = head.lines().find_map(|line| line.strip_prefix("content-length:")) {
            return body_len >= length.trim().parse::<usize>().unwrap_or(0);
        }
        if head.contains("transfer-encoding: chunked") {
            return raw.ends_with(b"0\r\n\r\n");
        }
        true
    }

    #[tokio::test]
    async fn json_and_multipart_bodies_carry_their_own_headers() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let json_head = capture_head(&listener).await;
            let form_head = capture_head(&listener).await;
            (json_head, form_head)
        });

        // Loopback only; ignore any proxy configured in the environment.
        let transport = HttpTransport::from_builder(client_builder(Duration::from_secs(5)).no_proxy()).unwrap();
        let json_response = transport
            .send(ApiRequest {
                method: Method::POST,
                url: Url::parse(&format!("{}/tickets", base)).unwrap(),
                bearer: Some("tok-123".into()),
                language: Some("fr".into()),
                body: RequestBody::Json(json!({"subject": "eSIM not activating"})),
            })
            .await
            .unwrap();
        assert_eq!(json_response.status, StatusCode::OK);

        let form = FormPayload::new()
            .text("message", "Screenshot attached")
            .file("attachment", "error.txt", "text/plain", b"activation failed".to_vec());
        transport
            .send(ApiRequest {
                method: Method::POST,
                url: Url::parse(&format!("{}/tickets/5/messages", base)).unwrap(),
                bearer: None,
                language: None,
                body: RequestBody::Form(form),
            })
            .await
            .unwrap();

        let (json_head, form_head) = server.await.unwrap();

        assert!(json_head.starts_with("post /api/tickets http/1.1"));
        assert!(json_head.contains("content-type: application/json"));
        assert!(json_head.contains("authorization: bearer tok-123"));
        assert!(json_head.contains("accept-language: fr"));
        assert!(json_head.contains("accept: application/json"));
        assert!(json_head.contains("user-agent: esim-storefront-client/"));

        assert!(form_head.starts_with("post /api/tickets/5/messages http/1.1"));
        assert!(form_head.contains("content-type: multipart/form-data; boundary="));
        assert!(!form_head.contains("content-type: application/json"));
        assert!(!form_head.contains("authorization:"));
        assert!(!form_head.contains("accept-language:"));
    }

    #[test]
    fn invalid_attachment_mime_is_rejected() {
        let form = FormPayload::new().file("attachment", "x.bin", "not a mime", Vec::new());
        assert!(matches!(build_form(form), Err(StorefrontError::InvalidInput(_))));
    }
}
