use std::sync::Arc;

use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::cache::{CacheKey, QueryCache};
use crate::config::StorefrontConfig;
use crate::errors::{ApiError, StorefrontError};
use crate::policy::{CachePolicy, Freshness, RequestKind, RetryPolicy};
use crate::session::CookieJar;
use crate::state::LanguageStore;
use crate::transport::{ApiRequest, ApiResponse, FormPayload, HttpTransport, RequestBody, Transport};

/// Storefront client. Cheap to clone; clones share the cache and cookie jar.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    base_url: Url,
    transport: Arc<dyn Transport>,
    cookies: Arc<CookieJar>,
    cache: QueryCache,
    cache_policy: CachePolicy,
    retry: RetryPolicy,
    language: watch::Sender<Option<LanguageStore>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url.as_str())
            .field("cached_entries", &self.inner.cache.len())
            .finish()
    }
}

/// Where a query result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuerySource {
    Network,
    Cache,
    /// Served from cache while a background refresh runs.
    StaleCache,
}

#[derive(Debug, Clone)]
pub struct Query<T> {
    pub data: T,
    pub source: QuerySource,
}

/// Outcome of a protected query.
#[derive(Debug, Clone)]
pub enum QueryState<T> {
    /// No session token: nothing was requested.
    Disabled,
    Ready(Query<T>),
}

impl<T> QueryState<T> {
    pub fn is_disabled(&self) -> bool {
        matches!(self, QueryState::Disabled)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(query) => Some(&query.data),
            QueryState::Disabled => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            QueryState::Ready(query) => Some(query.data),
            QueryState::Disabled => None,
        }
    }
}

impl Client {
    /// Creates a client talking HTTP to `config.api_base_url`.
    pub fn new(config: &StorefrontConfig) -> Result<Self, StorefrontError> {
        let transport = HttpTransport::new(config.request_timeout)?;
        let cookies = CookieJar::new(config.session_max_age);
        Ok(Self::with_transport(config, Arc::new(transport), Arc::new(cookies)))
    }

    /// Creates a client over any transport and an existing cookie jar.
    pub fn with_transport(config: &StorefrontConfig, transport: Arc<dyn Transport>, cookies: Arc<CookieJar>) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url: config.api_base_url.clone(),
                transport,
                cookies,
                cache: QueryCache::new(),
                cache_policy: config.cache,
                retry: config.retry,
                language: watch::channel(None).0,
            }),
        }
    }

    /// Sends the selected language as `Accept-Language` on every request.
    pub fn with_language(self, store: LanguageStore) -> Self {
        self.set_language(store);
        self
    }

    /// Like [`Client::with_language`], but applies to every clone of this
    /// client as well.
    pub fn set_language(&self, store: LanguageStore) {
        self.inner.language.send_replace(Some(store));
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.inner.cookies
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Unauthenticated GET through the cache.
    pub async fn fetch_public<T: DeserializeOwned>(&self, path: &str) -> Result<Query<T>, StorefrontError> {
        let path = normalize_path(path);
        let key = CacheKey::public(&path);
        let (value, source) = self.cached_query(key, &path, None).await?;
        Ok(Query {
            data: decode(&path, value)?,
            source,
        })
    }

    /// Authenticated GET through the cache.
    ///
    /// Without a session token nothing is sent and [`QueryState::Disabled`]
    /// is returned. A 401 clears the session cookies.
    pub async fn fetch_protected<T: DeserializeOwned>(&self, path: &str) -> Result<QueryState<T>, StorefrontError> {
        let path = normalize_path(path);
        let Some(token) = self.inner.cookies.session_token() else {
            tracing::debug!(path = %path, "no session token; protected query disabled");
            return Ok(QueryState::Disabled);
        };

        let key = CacheKey::protected(&path, &token);
        let (value, source) = self.cached_query(key, &path, Some(token)).await?;
        Ok(QueryState::Ready(Query {
            data: decode(&path, value)?,
            source,
        }))
    }

    /// Starts a mutation against `path`. Defaults to POST with no body.
    pub fn mutation(&self, path: &str) -> Mutation<'_> {
        Mutation {
            client: self,
            path: normalize_path(path),
            method: Method::POST,
            body: RequestBody::Empty,
        }
    }

    /// Drops cached entries under `prefix`.
    pub fn invalidate(&self, prefix: &str) -> usize {
        let dropped = self.inner.cache.invalidate_prefix(prefix);
        tracing::debug!(prefix, dropped, "invalidated cache entries");
        dropped
    }

    /// Stores a token issued by the login endpoint. Switching to a different
    /// token drops the responses cached for the previous one.
    pub fn sign_in(&self, token: &str) {
        let previous = self.inner.cookies.session_token();
        if previous.as_deref().is_some_and(|previous| previous != token) {
            self.inner.cache.clear_protected();
        }
        self.inner.cookies.set_session_token(token);
    }

    /// Clears the session cookies and every cached authenticated response.
    pub fn sign_out(&self) {
        self.inner.cookies.clear_session();
        self.inner.cache.clear_protected();
    }

    async fn cached_query(
        &self,
        key: CacheKey,
        path: &str,
        bearer: Option<String>,
    ) -> Result<(Value, QuerySource), StorefrontError> {
        match self.inner.cache.lookup(&key, &self.inner.cache_policy) {
            Some((value, Freshness::Fresh)) => return Ok((value, QuerySource::Cache)),
            Some((value, Freshness::Stale)) => {
                self.spawn_revalidation(key, path.to_string(), bearer);
                return Ok((value, QuerySource::StaleCache));
            }
            _ => {}
        }

        let generation = self.inner.cache.generation();
        let value = self
            .execute(RequestKind::Query, Method::GET, path, bearer, RequestBody::Empty)
            .await?;
        self.store(key, value.clone(), generation);
        Ok((value, QuerySource::Network))
    }

    fn store(&self, key: CacheKey, value: Value, generation: u64) {
        let cache = &self.inner.cache;
        if !cache.insert_if_current(key.clone(), value, generation) {
            tracing::debug!(path = key.path(), "cache invalidated while in flight; not storing");
        }
        cache.sweep_expired(&self.inner.cache_policy);
    }

    fn spawn_revalidation(&self, key: CacheKey, path: String, bearer: Option<String>) {
        if !self.inner.cache.begin_revalidation(&key) {
            return;
        }

        let client = self.clone();
        let generation = self.inner.cache.generation();
        tokio::spawn(async move {
            tracing::debug!(path = %path, "revalidating stale entry");
            match client
                .execute(RequestKind::Query, Method::GET, &path, bearer, RequestBody::Empty)
                .await
            {
                Ok(value) => client.store(key, value, generation),
                Err(err) => {
                    tracing::warn!(path = %path, error = %err, "background revalidation failed");
                    client.inner.cache.end_revalidation(&key);
                }
            }
        });
    }

    /// Sends a request, unwraps the envelope and applies the retry policy.
    async fn execute(
        &self,
        kind: RequestKind,
        method: Method,
        path: &str,
        bearer: Option<String>,
        body: RequestBody,
    ) -> Result<Value, StorefrontError> {
        let url = self.url(path)?;
        let language = self
            .inner
            .language
            .borrow()
            .as_ref()
            .map(|store| store.get().code().to_string());
        let mut failures = 0;

        loop {
            let request = ApiRequest {
                method: method.clone(),
                url: url.clone(),
                bearer: bearer.clone(),
                language: language.clone(),
                body: body.clone(),
            };

            let result = match self.inner.transport.send(request).await {
                Ok(response) => parse_envelope(response),
                Err(err) => Err(err),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if bearer.is_some() && err.as_api().is_some_and(|api| api.status == reqwest::StatusCode::UNAUTHORIZED) {
                tracing::info!(path, "session rejected; clearing session cookies");
                self.sign_out();
            }

            failures += 1;
            if !self.inner.retry.should_retry(kind, failures, &err) {
                tracing::debug!(%method, path, failures, error = %err, "request failed");
                return Err(err);
            }

            let delay = self.inner.retry.backoff(failures);
            tracing::debug!(%method, path, failures, ?delay, error = %err, "retrying request");
            tokio::time::sleep(delay).await;
        }
    }

    fn url(&self, path: &str) -> Result<Url, StorefrontError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');

        Url::parse(&format!("{}{}", base, normalize_path(path)))
            .map_err(|err| StorefrontError::InvalidInput(err.to_string()))
    }
}

/// Builder for POST/PUT/PATCH/DELETE calls.
#[must_use = "mutations do nothing until `send` is awaited"]
pub struct Mutation<'a> {
    client: &'a Client,
    path: String,
    method: Method,
    body: RequestBody,
}

impl<'a> Mutation<'a> {
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, payload: &B) -> Result<Self, StorefrontError> {
        self.body = RequestBody::Json(serde_json::to_value(payload)?);
        Ok(self)
    }

    /// Multipart payload. Sent as-is, without a JSON content type.
    pub fn form(mut self, payload: FormPayload) -> Self {
        self.body = RequestBody::Form(payload);
        self
    }

    /// Sends the mutation and decodes `data`. The bearer token is attached
    /// when present; its absence is left for the backend to judge.
    ///
    /// On success, cached responses under the same top-level path are dropped.
    pub async fn send<T: DeserializeOwned>(self) -> Result<T, StorefrontError> {
        let inner = &self.client.inner;
        let bearer = inner.cookies.session_token();

        let value = self
            .client
            .execute(RequestKind::Mutation, self.method, &self.path, bearer, self.body)
            .await?;

        self.client.invalidate(&resource_prefix(&self.path));
        decode(&self.path, value)
    }
}

/// Cache keys and URLs both go through this, so `tickets` and `/tickets`
/// name the same resource.
fn normalize_path(path: &str) -> String {
    // Append a / to path if it does not start with one
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// `/tickets/4/messages` → `/tickets`.
fn resource_prefix(path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    let first = trimmed.split(['/', '?']).next().unwrap_or_default();
    format!("/{}", first)
}

/// Turns a raw response into the envelope's `data`, or an [`ApiError`].
///
/// A 2xx body without a `success` flag is accepted as-is, with `data`
/// unwrapped when present.
pub fn parse_envelope(response: ApiResponse) -> Result<Value, StorefrontError> {
    let parsed = serde_json::from_slice::<Value>(&response.body);

    if !response.status.is_success() {
        let body = parsed.unwrap_or(Value::Null);
        return Err(ApiError::from_status(response.status, body).into());
    }

    let mut body = if response.body.is_empty() {
        Value::Null
    } else {
        parsed?
    };

    let has_flag = body.get("success").is_some();
    match body.get("success").and_then(Value::as_bool) {
        Some(false) => return Err(ApiError::from_envelope(response.status, body).into()),
        None if has_flag => return Err(StorefrontError::Decode("`success` is not a boolean".to_string())),
        _ => {}
    }

    if let Some(data) = body.get_mut("data") {
        return Ok(data.take());
    }
    Ok(if has_flag { Value::Null } else { body })
}

fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T, StorefrontError> {
    serde_json::from_value(value).map_err(|err| {
        tracing::warn!(path, error = %err, "response does not match expected shape");
        StorefrontError::Decode(format!("{}: {}", path, err))
    })
}
