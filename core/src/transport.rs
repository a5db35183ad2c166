//! Request builders and response classifiers for the two protocol
//! generations.
//!
//! # Design
//! Every function here is pure: builders turn an endpoint, credentials and
//! session state into an `HttpRequest`, and classifiers turn the sender's
//! outcome into either payload bytes or a protocol error. The context layer
//! wires them to the sender, so both protocols share one I/O path while
//! keeping their error conventions apart.
//!
//! - Legacy (`CMD_*`): basic auth on every call, `json=yes` query flag,
//!   form-urlencoded body under a `Content-Type: application/json` header.
//!   A non-empty `error` in the envelope is a failure on any status.
//! - Modern (`/api/*`): JSON body, session cookie plus `X-CSRFToken` when a
//!   session exists, basic auth otherwise. 2xx bodies are always the real
//!   payload; only non-2xx bodies are read as `{type, message}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::{form_urlencoded, Url};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::http::{HttpMethod, HttpRequest};
use crate::session::{Credentials, SessionStore};
use crate::translate::lenient_string;

const JSON: &str = "application/json";
const CSRF_HEADER: &str = "X-CSRFToken";

/// A remote endpoint: a path relative to the protocol root plus query pairs.
///
/// `"API_SHOW_USER_USAGE?bytes=yes"` and
/// `Endpoint::new("API_SHOW_USER_USAGE").query("bytes", "yes")` are
/// equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    path: String,
    query: Vec<(String, String)>,
    session_required: bool,
}

impl Endpoint {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        match path.split_once('?') {
            Some((path, query)) => Self {
                path: path.to_string(),
                query: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
                session_required: false,
            },
            None => Self {
                path,
                query: Vec::new(),
                session_required: false,
            },
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Mark a modern endpoint that rejects basic auth, so a session is
    /// established before the call.
    pub fn session_required(mut self) -> Self {
        self.session_required = true;
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn requires_session(&self) -> bool {
        self.session_required
    }
}

impl From<&str> for Endpoint {
    fn from(path: &str) -> Self {
        Endpoint::new(path)
    }
}

impl From<String> for Endpoint {
    fn from(path: String) -> Self {
        Endpoint::new(path)
    }
}

/// Ordered form fields for a legacy request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    pairs: Vec<(String, String)>,
}

impl Form {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn extend<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in pairs {
            self.push(key, value);
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl IntoIterator for Form {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Form {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Form::new();
        form.extend(iter);
        form
    }
}

impl Form {
    /// Flatten a serializable struct into form fields, sorted by key.
    /// Strings are sent as-is, other scalars as their JSON text, and `null`
    /// fields are left out.
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self> {
        let Value::Object(fields) = serde_json::to_value(value).map_err(Error::Serialization)? else {
            return Err(Error::InvalidInput("form body must serialize to an object".to_string()));
        };
        let mut form = Form::new();
        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::String(s) => form.push(key, s),
                other => form.push(key, other.to_string()),
            }
        }
        Ok(form)
    }
}

/// Serialize a modern request body.
pub fn json_body<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(Error::Serialization)
}

/// Generic legacy envelope. Fields are read leniently because some commands
/// put numbers or objects where others put strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyEnvelope {
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub result: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub success: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub details: String,
}

impl LegacyEnvelope {
    /// `Some` only for a JSON object; list-shaped bodies carry no envelope.
    pub fn probe(body: &[u8]) -> Option<Self> {
        match serde_json::from_slice::<Value>(body).ok()? {
            value @ Value::Object(_) => serde_json::from_value(value).ok(),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        !self.error.is_empty()
    }

    /// Check the `success` string of a 2xx reply. On mismatch the error
    /// carries `result`, or `success` when the panel left `result` empty.
    pub fn expect_success(&self, operation: &str, expected: &str) -> Result<()> {
        if self.success == expected {
            return Ok(());
        }
        Err(Error::unexpected(operation, self.returned()))
    }

    /// Like [`expect_success`](Self::expect_success) for commands that report
    /// their outcome in `result` instead.
    pub fn expect_result(&self, operation: &str, expected: &str) -> Result<()> {
        if self.result == expected {
            return Ok(());
        }
        Err(Error::unexpected(operation, self.returned()))
    }

    fn returned(&self) -> String {
        if self.result.is_empty() {
            self.success.clone()
        } else {
            self.result.clone()
        }
    }

    fn into_error(self) -> Error {
        Error::Legacy {
            error: self.error,
            result: self.result,
        }
    }
}

/// Modern error envelope, only meaningful on a non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModernEnvelope {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

/// Renders the base URL without a trailing slash, the form used both for
/// joining endpoint paths and as the `Referer` value.
pub fn base_str(base: &Url) -> &str {
    base.as_str().trim_end_matches('/')
}

fn join(base: &Url, prefix: &str, endpoint: &Endpoint) -> Result<Url> {
    let path = endpoint.path().trim_start_matches('/');
    let mut url = Url::parse(&format!("{}/{prefix}{path}", base_str(base)))?;
    if !endpoint.query_pairs().is_empty() {
        url.query_pairs_mut().extend_pairs(endpoint.query_pairs().iter());
    }
    Ok(url)
}

pub fn legacy_url(base: &Url, endpoint: &Endpoint) -> Result<Url> {
    let mut url = join(base, "CMD_", endpoint)?;
    url.query_pairs_mut().append_pair("json", "yes");
    Ok(url)
}

pub fn modern_url(base: &Url, endpoint: &Endpoint) -> Result<Url> {
    join(base, "api/", endpoint)
}

/// Build a legacy request. Authentication is always basic auth.
pub fn build_legacy_request(
    base: &Url,
    credentials: &Credentials,
    method: HttpMethod,
    endpoint: &Endpoint,
    form: Option<&Form>,
) -> Result<HttpRequest> {
    let url = legacy_url(base, endpoint)?;
    Ok(HttpRequest {
        method,
        url: url.into(),
        headers: vec![
            ("Content-Type".to_string(), JSON.to_string()),
            ("Authorization".to_string(), credentials.basic_auth()),
        ],
        body: form.map(|form| form.encode().into_bytes()),
    })
}

/// Classify the sender's outcome for a legacy call.
///
/// A non-empty envelope `error` is a failure on any status. A non-2xx without
/// one surfaces the status error unchanged.
pub fn classify_legacy(outcome: Result<Vec<u8>>) -> Result<Vec<u8>> {
    match outcome {
        Ok(body) => match LegacyEnvelope::probe(&body) {
            Some(envelope) if envelope.is_error() => Err(envelope.into_error()),
            _ => Ok(body),
        },
        Err(Error::Status { status, body }) => match LegacyEnvelope::probe(&body) {
            Some(envelope) if envelope.is_error() => Err(envelope.into_error()),
            _ => Err(Error::Status { status, body }),
        },
        Err(other) => Err(other),
    }
}

/// Build a modern request with a JSON body.
pub fn build_modern_request(
    base: &Url,
    credentials: &Credentials,
    store: &SessionStore,
    method: HttpMethod,
    endpoint: &Endpoint,
    body: Option<&Value>,
) -> Result<HttpRequest> {
    let body = body
        .map(serde_json::to_vec)
        .transpose()
        .map_err(Error::Serialization)?;
    modern_request(base, credentials, store, method, endpoint, body, JSON)
}

/// Build a multipart upload. Response handling follows the modern protocol.
pub fn build_upload_request(
    base: &Url,
    credentials: &Credentials,
    store: &SessionStore,
    method: HttpMethod,
    endpoint: &Endpoint,
    body: Vec<u8>,
    content_type: &str,
) -> Result<HttpRequest> {
    modern_request(base, credentials, store, method, endpoint, Some(body), content_type)
}

fn modern_request(
    base: &Url,
    credentials: &Credentials,
    store: &SessionStore,
    method: HttpMethod,
    endpoint: &Endpoint,
    body: Option<Vec<u8>>,
    content_type: &str,
) -> Result<HttpRequest> {
    let url = modern_url(base, endpoint)?;
    let mut headers = vec![
        ("Accept".to_string(), JSON.to_string()),
        ("Content-Type".to_string(), content_type.to_string()),
        ("Referer".to_string(), base_str(base).to_string()),
    ];

    if store.has_session(&url) {
        if let Some(cookies) = store.cookie_header(&url) {
            headers.push(("Cookie".to_string(), cookies));
        }
        if method.is_state_changing() {
            if let Some(token) = store.csrf_token(&url) {
                headers.push((CSRF_HEADER.to_string(), token));
            }
        }
    } else {
        headers.push(("Authorization".to_string(), credentials.basic_auth()));
    }

    Ok(HttpRequest {
        method,
        url: url.into(),
        headers,
        body,
    })
}

/// Classify the sender's outcome for a modern call. 2xx bodies pass through
/// untouched.
pub fn classify_modern(outcome: Result<Vec<u8>>) -> Result<Vec<u8>> {
    match outcome {
        Err(Error::Status { status, body }) => {
            match serde_json::from_slice::<ModernEnvelope>(&body) {
                Ok(envelope) if !envelope.kind.is_empty() || !envelope.message.is_empty() => {
                    Err(Error::Modern {
                        kind: envelope.kind,
                        message: envelope.message,
                    })
                }
                _ => Err(Error::Status { status, body }),
            }
        }
        other => other,
    }
}

/// Decode a payload. An empty body decodes as JSON `null`, so `()` and
/// `Option<T>` targets accept it.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_value(Value::Null).map_err(Error::Deserialization);
    }
    serde_json::from_slice(body).map_err(Error::Deserialization)
}

/// Builder for a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartForm {
    boundary: String,
    body: Vec<u8>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::with_boundary(format!("directadmin-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape_quotes(name)).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, data: &[u8]) -> Self {
        self.open_part();
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                escape_quotes(name),
                escape_quotes(filename)
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Close the body and return it with its `Content-Type`.
    pub fn finish(mut self) -> (Vec<u8>, String) {
        let content_type = self.content_type();
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.body, content_type)
    }

    fn open_part(&mut self) {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
