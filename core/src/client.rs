//! Client entry point.
//!
//! # Design
//! `DirectAdmin` validates the base URL once and owns the pieces every
//! context shares: the parsed URL, the sender (and through it the HTTP
//! backend), and the optional cache. It carries no per-account state, so one
//! client can log in any number of accounts. Each login returns a
//! role-scoped context with its own session store.

use std::sync::Arc;

use url::{ParseError, Url};

use crate::cache::Cache;
use crate::config::ClientConfig;
use crate::context::{login, AdminContext, ResellerContext, UserContext};
use crate::error::{Error, Result};
use crate::http::HttpBackend;
use crate::model::Role;
use crate::sender::{Sender, UreqBackend};
use crate::session::Credentials;

#[derive(Debug)]
pub(crate) struct ClientInner {
    pub(crate) base: Url,
    pub(crate) sender: Sender,
    pub(crate) cache: Option<Cache>,
}

/// A client bound to one panel.
#[derive(Debug, Clone)]
pub struct DirectAdmin {
    inner: Arc<ClientInner>,
}

impl DirectAdmin {
    /// Build a client with the default blocking backend.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let backend = Arc::new(UreqBackend::new(config.timeout()));
        Self::with_backend(config, backend)
    }

    /// Build a client over a custom [`HttpBackend`]. The configured timeout
    /// is the backend's concern.
    pub fn with_backend(config: ClientConfig, backend: Arc<dyn HttpBackend>) -> Result<Self> {
        let base = parse_base_url(&config.url)?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                base,
                sender: Sender::new(backend, config.debug),
                cache: config.cache_enabled.then(Cache::new),
            }),
        })
    }

    pub fn url(&self) -> &Url {
        &self.inner.base
    }

    /// Log in and require the `Admin` role. The passkey is either the
    /// account password or a login key.
    pub fn login_as_admin(&self, username: &str, passkey: &str) -> Result<AdminContext> {
        let user = self.login(username, passkey, Role::Admin)?;
        Ok(AdminContext::new(user))
    }

    pub fn login_as_reseller(&self, username: &str, passkey: &str) -> Result<ResellerContext> {
        let user = self.login(username, passkey, Role::Reseller)?;
        Ok(ResellerContext::new(user))
    }

    pub fn login_as_user(&self, username: &str, passkey: &str) -> Result<UserContext> {
        self.login(username, passkey, Role::User)
    }

    fn login(&self, username: &str, passkey: &str, role: Role) -> Result<UserContext> {
        login(self.inner.clone(), Credentials::new(username, passkey), role)
    }
}

/// The base URL must be absolute, carry a host, and use http or https.
fn parse_base_url(raw: &str) -> Result<Url> {
    let url = match Url::parse(raw) {
        Ok(url) => url,
        Err(ParseError::RelativeUrlWithoutBase | ParseError::EmptyHost) => {
            return Err(Error::InvalidHost)
        }
        Err(other) => return Err(other.into()),
    };

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidScheme(url.scheme().to_string()));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidHost);
    }
    Ok(url)
}
