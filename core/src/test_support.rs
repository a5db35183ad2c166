//! Scripted [`HttpBackend`] for unit tests.
//!
//! Responses come from routes first (persistent, matched by URL substring and
//! optionally method, longest needle wins) and then from a FIFO queue. Fan-out
//! operations issue requests in no particular order, so they are scripted
//! with routes.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::http::{HttpBackend, HttpMethod, HttpRequest, HttpResponse};

struct Route {
    method: Option<HttpMethod>,
    needle: String,
    response: HttpResponse,
}

#[derive(Default)]
pub(crate) struct ScriptedBackend {
    routes: Mutex<Vec<Route>>,
    queue: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn response(status: u16, headers: Vec<(&str, &str)>, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        headers: headers
            .into_iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect(),
        body: body.as_bytes().to_vec(),
    }
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, status: u16, body: &str) {
        self.push_with_headers(status, Vec::new(), body);
    }

    pub(crate) fn push_with_headers(&self, status: u16, headers: Vec<(&str, &str)>, body: &str) {
        self.queue.lock().unwrap().push_back(response(status, headers, body));
    }

    /// Answer every request whose URL contains `needle`.
    pub(crate) fn route(&self, needle: &str, status: u16, body: &str) {
        self.add_route(None, needle, response(status, Vec::new(), body));
    }

    pub(crate) fn route_method(&self, method: HttpMethod, needle: &str, status: u16, body: &str) {
        self.add_route(Some(method), needle, response(status, Vec::new(), body));
    }

    pub(crate) fn route_with_headers(
        &self,
        needle: &str,
        status: u16,
        headers: Vec<(&str, &str)>,
        body: &str,
    ) {
        self.add_route(None, needle, response(status, headers, body));
    }

    fn add_route(&self, method: Option<HttpMethod>, needle: &str, response: HttpResponse) {
        self.routes.lock().unwrap().push(Route {
            method,
            needle: needle.to_string(),
            response,
        });
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_to(&self, needle: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.url.contains(needle))
            .collect()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }
}

impl HttpBackend for ScriptedBackend {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let routed = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .filter(|route| route.method.map_or(true, |m| m == request.method))
            .filter(|route| request.url.contains(&route.needle))
            .max_by_key(|route| route.needle.len())
            .map(|route| route.response.clone());

        if let Some(response) = routed {
            return Ok(response);
        }

        self.queue.lock().unwrap().pop_front().ok_or_else(|| {
            Error::Transport(format!("no scripted response for {} {}", request.method, request.url).into())
        })
    }
}
