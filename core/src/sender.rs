//! Low-level sender shared by both protocol generations.
//!
//! The sender executes a prepared request, records any cookies the panel
//! sets, and classifies the status. It never interprets the body: the two
//! protocols disagree on what a non-2xx body means, so that is left to the
//! transport layer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;
use url::Url;

use crate::error::{Error, Result};
use crate::http::{HttpBackend, HttpMethod, HttpRequest, HttpResponse};
use crate::session::SessionStore;

/// Response bodies above this size are truncated in debug traces.
pub const DEBUG_BODY_LIMIT: usize = 32 * 1024;

#[derive(Clone)]
pub(crate) struct Sender {
    backend: Arc<dyn HttpBackend>,
    debug: bool,
}

impl Sender {
    pub(crate) fn new(backend: Arc<dyn HttpBackend>, debug: bool) -> Self {
        Self { backend, debug }
    }

    /// Execute `request`, storing returned cookies in `store`.
    ///
    /// Returns the body on 2xx. Any other status becomes
    /// [`Error::Status`] with the untouched body.
    pub(crate) fn execute(&self, request: &HttpRequest, store: &SessionStore) -> Result<Vec<u8>> {
        let started = Instant::now();
        let url = Url::parse(&request.url)?;
        let response = self.backend.execute(request)?;

        for header in response.set_cookies() {
            store.store_set_cookie(&url, header);
        }

        if self.debug {
            trace_exchange(request, &url, &response, started.elapsed());
        }

        if response.is_success() {
            Ok(response.body)
        } else {
            Err(Error::Status {
                status: response.status,
                body: response.body,
            })
        }
    }
}

impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").field("debug", &self.debug).finish_non_exhaustive()
    }
}

fn trace_exchange(request: &HttpRequest, url: &Url, response: &HttpResponse, elapsed: Duration) {
    let path = match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    };
    let cookies = request.header("cookie").unwrap_or_default();
    let body = truncate_for_trace(&response.body);
    debug!(
        method = %request.method,
        %path,
        status = response.status,
        elapsed_ms = elapsed.as_millis() as u64,
        cookies,
        body = %body,
        "directadmin request"
    );
}

pub(crate) fn truncate_for_trace(body: &[u8]) -> String {
    if body.len() <= DEBUG_BODY_LIMIT {
        return String::from_utf8_lossy(body).into_owned();
    }
    let mut rendered = String::from_utf8_lossy(&body[..DEBUG_BODY_LIMIT]).into_owned();
    rendered.push_str(&format!("... ({} bytes truncated)", body.len() - DEBUG_BODY_LIMIT));
    rendered
}

/// Blocking backend over a `ureq` agent.
///
/// Status codes are returned as data (`http_status_as_error(false)`) so the
/// sender and transport can interpret 4xx/5xx bodies themselves.
pub struct UreqBackend {
    agent: ureq::Agent,
}

impl UreqBackend {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl std::fmt::Debug for UreqBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqBackend").finish_non_exhaustive()
    }
}

impl HttpBackend for UreqBackend {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref().unwrap_or_default();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Delete => with_headers(self.agent.delete(url), &request.headers).call(),
            HttpMethod::Post => with_headers(self.agent.post(url), &request.headers).send(body),
            HttpMethod::Put => with_headers(self.agent.put(url), &request.headers).send(body),
        };
        let mut response = result.map_err(|e| Error::Transport(Box::new(e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| Error::Transport(Box::new(e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedBackend;

    fn request(url: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn success_returns_body_and_stores_cookies() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_with_headers(
            200,
            vec![("Set-Cookie", "session=abc; Path=/"), ("Set-Cookie", "csrftoken=t0k; Path=/api")],
            "{}",
        );
        let sender = Sender::new(backend.clone(), false);
        let store = SessionStore::new();

        let body = sender
            .execute(&request("https://panel.example.com:2222/api/login"), &store)
            .unwrap();
        assert_eq!(body, b"{}");

        let api = Url::parse("https://panel.example.com:2222/api/session").unwrap();
        assert!(store.has_session(&api));
        assert_eq!(store.csrf_token(&api), Some("t0k".to_string()));
    }

    #[test]
    fn non_2xx_keeps_status_and_body_uninterpreted() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push(403, r#"{"type":"FORBIDDEN","message":"nope"}"#);
        let sender = Sender::new(backend, true);

        let err = sender
            .execute(&request("https://panel.example.com:2222/api/license"), &SessionStore::new())
            .unwrap_err();
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, br#"{"type":"FORBIDDEN","message":"nope"}"#.to_vec());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cookies_from_error_responses_are_still_stored() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.push_with_headers(401, vec![("Set-Cookie", "csrftoken=fresh; Path=/")], "");
        let sender = Sender::new(backend, false);
        let store = SessionStore::new();
        let url = "https://panel.example.com:2222/api/login";

        assert!(sender.execute(&request(url), &store).is_err());
        assert_eq!(store.csrf_token(&Url::parse(url).unwrap()), Some("fresh".to_string()));
    }

    #[test]
    fn trace_body_is_truncated_above_limit() {
        let body = vec![b'a'; DEBUG_BODY_LIMIT + 10];
        let rendered = truncate_for_trace(&body);
        assert!(rendered.ends_with("... (10 bytes truncated)"));
        assert_eq!(truncate_for_trace(b"short"), "short");
    }
}
