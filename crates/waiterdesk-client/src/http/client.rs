//! REST client with bearer-token injection and 401 session clearing.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use waiterdesk_core::prelude::*;

use super::backend::{HttpBackend, HttpRequest, HttpResponse, Method, ReqwestBackend};
use crate::session::SessionStore;

/// Characters escaped when an id is placed in a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Longest slice of a non-JSON error body carried into [`Error::Http`].
const MAX_ERROR_BODY: usize = 200;

/// Percent-encode `value` for use as one URL path segment.
pub fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

struct Inner<B> {
    backend: B,
    base_url: Url,
    session: SessionStore,
}

/// Shared REST client. Cloning is cheap; clones share the backend and session.
pub struct ApiClient<B = ReqwestBackend> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for ApiClient<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> std::fmt::Debug for ApiClient<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish()
    }
}

impl<B: HttpBackend + Sync> ApiClient<B> {
    pub fn new(backend: B, base_url: Url, session: SessionStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                base_url,
                session,
            }),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve `path` under the base URL, keeping any base path prefix.
    pub fn url(&self, path: &str) -> Result<Url> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| Error::config(format!("Invalid request URL for '{path}': {e}")))
    }

    /// Send one request and return the raw JSON body.
    ///
    /// The stored token, if any, is sent as `Authorization: Bearer <token>`.
    /// A 401 clears the session only if it still holds the token this request
    /// carried, so concurrent 401s clear it once. Non-2xx answers become
    /// [`Error::Http`]; an empty body is `null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Result<Value> {
        let url = self.url(path)?;
        let token = self.inner.session.token()?;

        let mut request_headers: Vec<(String, String)> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(token) = &token {
            request_headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let request = HttpRequest {
            method,
            url,
            headers: request_headers,
            body,
        };
        debug!("{} {}", method, request.url.path());

        let response = self.inner.backend.execute(request).await?;

        if response.status == 401 {
            if let Some(token) = &token {
                self.clear_stale_session(token);
            }
        }

        if !response.is_success() {
            return Err(Error::http(response.status, error_message(&response)));
        }

        parse_body(&response.body)
    }

    fn clear_stale_session(&self, token: &str) {
        match self.inner.session.clear_if_token(token) {
            Ok(true) => warn!("Session rejected by server (401), cleared stored credentials"),
            Ok(false) => trace!("401 for a token that is no longer current"),
            Err(e) => warn!("Failed to clear session after 401: {}", e),
        }
    }

    /// `GET` and decode the (envelope-unwrapped) payload.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = self.request(Method::Get, path, None, &[]).await?;
        decode(path, value)
    }

    pub async fn post<T, P>(&self, path: &str, body: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.send_json(Method::Post, path, body).await
    }

    pub async fn put<T, P>(&self, path: &str, body: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.send_json(Method::Put, path, body).await
    }

    pub async fn patch<T, P>(&self, path: &str, body: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.send_json(Method::Patch, path, body).await
    }

    /// `DELETE`; the response payload is discarded.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.request(Method::Delete, path, None, &[]).await?;
        Ok(())
    }

    async fn send_json<T, P>(&self, method: Method, path: &str, body: &P) -> Result<T>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let body = serde_json::to_value(body)?;
        let value = self.request(method, path, Some(body), &[]).await?;
        decode(path, value)
    }
}

fn parse_body(body: &str) -> Result<Value> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body)
        .map_err(|e| Error::schema(format!("Response body is not JSON: {e}")))
}

/// Unwrap the `{ success, data, message }` envelope when present.
///
/// An object is treated as an envelope if it has a `data` key and either a
/// `success` flag or nothing else.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map)
            if map.contains_key("data") && (map.contains_key("success") || map.len() == 1) =>
        {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decode a response payload into `T`, mapping mismatches to [`Error::Schema`].
pub fn decode<T: DeserializeOwned>(path: &str, value: Value) -> Result<T> {
    serde_json::from_value(unwrap_envelope(value))
        .map_err(|e| Error::schema(format!("{path}: {e}")))
}

fn error_message(response: &HttpResponse) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&response.body) {
        for key in ["message", "error"] {
            if let Some(Value::String(message)) = map.get(key) {
                return message.clone();
            }
        }
    }

    let body = response.body.trim();
    if body.is_empty() {
        return "request failed".to_string();
    }
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
