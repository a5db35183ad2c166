//! Credentials and per-context session state.
//!
//! Legacy calls authenticate with basic auth on every request. Modern calls
//! prefer the `session` cookie issued by `api/login` and send the
//! `csrftoken` cookie back as `X-CSRFToken` on state-changing verbs. Both
//! cookies live in a [`SessionStore`] owned by one role-scoped context.

use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use url::Url;

pub(crate) const SESSION_COOKIE: &str = "session";
pub(crate) const CSRF_COOKIE: &str = "csrftoken";

/// Username and passkey for one account. The passkey is either the account
/// password or a login key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    passkey: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, passkey: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            passkey: passkey.into(),
        }
    }

    /// Credentials for `actor` acting through to `target`, sharing the
    /// actor's passkey.
    pub fn delegated(&self, target: &str) -> Self {
        Self {
            username: format!("{}|{target}", self.username),
            passkey: self.passkey.clone(),
        }
    }

    /// The full username as sent to the panel, composite form included.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn passkey(&self) -> &str {
        &self.passkey
    }

    /// The account this context acts as.
    pub fn visible_username(&self) -> &str {
        visible_username(&self.username)
    }

    /// The account that authenticates, i.e. the part before `|`.
    pub fn acting_username(&self) -> &str {
        match self.username.split_once('|') {
            Some((actor, _)) => actor,
            None => &self.username,
        }
    }

    pub fn is_delegated(&self) -> bool {
        self.username.contains('|')
    }

    pub(crate) fn basic_auth(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.username, self.passkey));
        format!("Basic {token}")
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("passkey", &"<redacted>")
            .finish()
    }
}

/// Strips a `"reseller|"` delegation prefix from a composite username.
pub fn visible_username(username: &str) -> &str {
    match username.split_once('|') {
        Some((_, target)) => target,
        None => username,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredCookie {
    host: String,
    path: String,
    name: String,
    value: String,
}

/// Cookie store for one context, keyed by host and path.
///
/// Guarded by a mutex so operations issued from several threads on the same
/// context share one session. A second lock serializes session creation so
/// concurrent callers do not each log in.
#[derive(Debug, Default)]
pub struct SessionStore {
    cookies: Mutex<Vec<StoredCookie>>,
    establishing: Mutex<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<StoredCookie>> {
        // Every write leaves the vector consistent, so poisoning is ignored.
        self.cookies.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn establishing(&self) -> MutexGuard<'_, ()> {
        self.establishing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store or replace a cookie. An empty value removes it.
    pub fn set(&self, url: &Url, name: &str, value: &str, path: Option<&str>) {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let path = path.unwrap_or("/").to_string();
        let mut cookies = self.lock();
        cookies.retain(|c| !(c.host == host && c.path == path && c.name == name));
        if !value.is_empty() {
            cookies.push(StoredCookie {
                host,
                path,
                name: name.to_string(),
                value: value.to_string(),
            });
        }
    }

    /// Record one `Set-Cookie` header value received from `url`. Without a
    /// `Path` attribute the cookie is scoped to the directory of `url`.
    pub fn store_set_cookie(&self, url: &Url, header: &str) {
        let Some(cookie) = parse_set_cookie(header) else {
            return;
        };
        let value = if cookie.expired { "" } else { cookie.value };
        let path = cookie.path.unwrap_or_else(|| default_path(url.path()));
        self.set(url, cookie.name, value, Some(path));
    }

    /// Value of the named cookie applicable to `url`; the most specific path
    /// wins.
    pub fn get(&self, url: &Url, name: &str) -> Option<String> {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        self.lock()
            .iter()
            .filter(|c| c.name == name && c.host == host && path_matches(&c.path, url.path()))
            .max_by_key(|c| c.path.len())
            .map(|c| c.value.clone())
    }

    /// `Cookie` header value for `url`, if any cookie applies.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let cookies = self.lock();
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|c| c.host == host && path_matches(&c.path, url.path()))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    pub fn has_session(&self, url: &Url) -> bool {
        self.get(url, SESSION_COOKIE).is_some()
    }

    /// CSRF token scoped to the endpoint at `url`.
    pub fn csrf_token(&self, url: &Url) -> Option<String> {
        self.get(url, CSRF_COOKIE)
    }
}

struct SetCookie<'a> {
    name: &'a str,
    value: &'a str,
    path: Option<&'a str>,
    expired: bool,
}

fn parse_set_cookie(header: &str) -> Option<SetCookie<'_>> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let mut cookie = SetCookie {
        name,
        value: value.trim().trim_matches('"'),
        path: None,
        expired: false,
    };
    for attribute in parts {
        let (key, val) = attribute.split_once('=').unwrap_or((attribute, ""));
        let key = key.trim();
        if key.eq_ignore_ascii_case("path") && val.trim().starts_with('/') {
            cookie.path = Some(val.trim());
        } else if key.eq_ignore_ascii_case("max-age") {
            cookie.expired = val.trim().parse::<i64>().map(|age| age <= 0).unwrap_or(false);
        }
    }
    Some(cookie)
}

/// RFC 6265 default-path: everything before the last `/` of the request
/// path, or `/` when that leaves nothing.
fn default_path(request_path: &str) -> &str {
    match request_path.rfind('/') {
        Some(0) | None => "/",
        Some(index) => &request_path[..index],
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if cookie_path == "/" || cookie_path == request_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://panel.example.com:2222{path}")).unwrap()
    }

    #[test]
    fn visible_username_strips_reseller_prefix() {
        assert_eq!(visible_username("reseller|bob"), "bob");
        assert_eq!(visible_username("alice"), "alice");
    }

    #[test]
    fn delegated_credentials_share_passkey() {
        let admin = Credentials::new("admin", "secret");
        let delegated = admin.delegated("bob");
        assert_eq!(delegated.username(), "admin|bob");
        assert_eq!(delegated.passkey(), "secret");
        assert_eq!(delegated.visible_username(), "bob");
        assert_eq!(delegated.acting_username(), "admin");
        assert!(delegated.is_delegated());
        assert!(!admin.is_delegated());
    }

    #[test]
    fn basic_auth_encodes_username_and_passkey() {
        let creds = Credentials::new("admin", "secret");
        assert_eq!(creds.basic_auth(), "Basic YWRtaW46c2VjcmV0");
    }

    #[test]
    fn debug_output_redacts_passkey() {
        let creds = Credentials::new("admin", "hunter2");
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn set_cookie_is_scoped_by_path() {
        let store = SessionStore::new();
        store.store_set_cookie(&url("/api/login"), "csrftoken=abc; Path=/api; HttpOnly");
        assert_eq!(store.csrf_token(&url("/api/db-manage/create-db")), Some("abc".to_string()));
        assert_eq!(store.csrf_token(&url("/CMD_API_LOGIN_TEST")), None);
        assert_eq!(store.csrf_token(&url("/apiary")), None);
    }

    #[test]
    fn most_specific_path_wins() {
        let store = SessionStore::new();
        store.set(&url("/"), CSRF_COOKIE, "root", Some("/"));
        store.set(&url("/"), CSRF_COOKIE, "api", Some("/api"));
        assert_eq!(store.csrf_token(&url("/api/session")), Some("api".to_string()));
        assert_eq!(store.csrf_token(&url("/CMD_DOMAIN")), Some("root".to_string()));
    }

    #[test]
    fn expired_cookie_is_removed() {
        let store = SessionStore::new();
        store.store_set_cookie(&url("/api/login"), "session=abc; Path=/");
        assert!(store.has_session(&url("/api/session")));
        store.store_set_cookie(&url("/api/logout"), "session=abc; Path=/; Max-Age=0");
        assert!(!store.has_session(&url("/api/session")));
    }

    #[test]
    fn cookies_do_not_leak_across_hosts() {
        let store = SessionStore::new();
        store.set(&url("/"), SESSION_COOKIE, "abc", None);
        let other = Url::parse("https://other.example.com/api/session").unwrap();
        assert!(!store.has_session(&other));
        assert_eq!(store.cookie_header(&other), None);
    }

    #[test]
    fn cookie_header_joins_applicable_cookies() {
        let store = SessionStore::new();
        store.set(&url("/"), SESSION_COOKIE, "abc", None);
        store.set(&url("/"), CSRF_COOKIE, "xyz", Some("/api"));
        assert_eq!(
            store.cookie_header(&url("/api/session")),
            Some("session=abc; csrftoken=xyz".to_string())
        );
        assert_eq!(store.cookie_header(&url("/CMD_API_SHOW_USERS")), Some("session=abc".to_string()));
    }

    #[test]
    fn cookie_without_path_is_scoped_to_request_directory() {
        let store = SessionStore::new();
        store.store_set_cookie(&url("/PLUGINS/phpselector/index.raw"), "csrftoken=plugin");
        store.store_set_cookie(&url("/CMD_API_LOGIN_TEST"), "session=abc");

        assert_eq!(
            store.csrf_token(&url("/PLUGINS/phpselector/index.raw")),
            Some("plugin".to_string())
        );
        assert_eq!(store.csrf_token(&url("/api/session")), None);
        assert!(store.has_session(&url("/api/session")));
    }

    #[test]
    fn default_path_drops_last_segment() {
        assert_eq!(default_path("/api/db-manage/create-db"), "/api/db-manage");
        assert_eq!(default_path("/api"), "/");
        assert_eq!(default_path("/"), "/");
        assert_eq!(default_path(""), "/");
    }

    #[test]
    fn malformed_set_cookie_is_ignored() {
        let store = SessionStore::new();
        store.store_set_cookie(&url("/"), "garbage");
        store.store_set_cookie(&url("/"), "=value");
        assert_eq!(store.cookie_header(&url("/")), None);
    }
}
