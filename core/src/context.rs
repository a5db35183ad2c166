//! Role-scoped contexts.
//!
//! # Design
//! A context is an authenticated account: its credentials, its session
//! store, and the configuration fetched at login. Roles nest by composition:
//! [`AdminContext`] wraps a [`ResellerContext`], which wraps a
//! [`UserContext`], and each dereferences to the one it wraps, so an admin
//! can call every reseller and user operation directly.
//!
//! All protocol calls go through the four `call_*` methods plus
//! [`upload`](UserContext::upload). They share one sender owned by the
//! client; the context only supplies credentials and cookies. Clones of a
//! context share the session store.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::cache::Cache;
use crate::client::ClientInner;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::model::{RawUserConfig, Role, UserConfig};
use crate::session::{Credentials, SessionStore, SESSION_COOKIE};
use crate::transport::{
    build_legacy_request, build_modern_request, build_upload_request, classify_legacy,
    classify_modern, decode, json_body, Endpoint, Form, LegacyEnvelope,
};

/// An authenticated account holder.
#[derive(Debug, Clone)]
pub struct UserContext {
    client: Arc<ClientInner>,
    credentials: Credentials,
    session: Arc<SessionStore>,
    config: UserConfig,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(rename = "sessionID", default)]
    session_id: String,
}

#[derive(Serialize)]
struct SwitchRequest<'a> {
    username: &'a str,
}

/// Verify `credentials`, load the account config and check its role.
pub(crate) fn login(client: Arc<ClientInner>, credentials: Credentials, role: Role) -> Result<UserContext> {
    let mut context = UserContext {
        client,
        credentials,
        session: Arc::new(SessionStore::new()),
        config: UserConfig::default(),
    };

    context.login()?;
    context.config = context.get_my_user_config()?;

    if context.config.user_type != role.as_str() {
        return Err(Error::RoleMismatch {
            expected: role.to_string(),
            actual: context.config.user_type.clone(),
        });
    }

    debug!(username = context.credentials.username(), %role, "logged in");
    Ok(context)
}

impl UserContext {
    /// Configuration fetched at login.
    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The account this context acts as, without any delegation prefix.
    pub fn visible_username(&self) -> &str {
        self.credentials.visible_username()
    }

    pub(crate) fn cache(&self) -> Option<&Cache> {
        self.client.cache.as_ref()
    }

    /// Database and database-user names are namespaced as `{user}_{name}`.
    pub(crate) fn add_username_prefix(&self, name: &str) -> String {
        let prefix = format!("{}_", self.visible_username());
        if name.starts_with(&prefix) {
            name.to_string()
        } else {
            format!("{prefix}{name}")
        }
    }

    /// `GET CMD_API_LOGIN_TEST`; the panel must answer `Login OK`.
    pub fn login(&self) -> Result<()> {
        let envelope: LegacyEnvelope = self.call_legacy(HttpMethod::Get, "API_LOGIN_TEST", None)?;
        if envelope.success != "Login OK" {
            let returned = if envelope.result.is_empty() { envelope.success } else { envelope.result };
            return Err(Error::LoginFailed(returned));
        }
        Ok(())
    }

    pub fn get_my_user_config(&self) -> Result<UserConfig> {
        let raw: RawUserConfig = self.call_legacy(HttpMethod::Get, "API_SHOW_USER_CONFIG", None)?;
        Ok(raw.into())
    }

    pub fn call_legacy<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: impl Into<Endpoint>,
        form: Option<&Form>,
    ) -> Result<T> {
        decode(&self.call_legacy_bytes(method, endpoint, form)?)
    }

    /// Issue a legacy call and return the raw body once the envelope has
    /// been checked for an error.
    pub fn call_legacy_bytes(
        &self,
        method: HttpMethod,
        endpoint: impl Into<Endpoint>,
        form: Option<&Form>,
    ) -> Result<Vec<u8>> {
        let endpoint = endpoint.into();
        let request = build_legacy_request(&self.client.base, &self.credentials, method, &endpoint, form)?;
        classify_legacy(self.client.sender.execute(&request, &self.session))
    }

    pub fn call_modern<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: impl Into<Endpoint>,
        body: Option<Value>,
    ) -> Result<T> {
        decode(&self.call_modern_bytes(method, endpoint, body)?)
    }

    pub fn call_modern_bytes(
        &self,
        method: HttpMethod,
        endpoint: impl Into<Endpoint>,
        body: Option<Value>,
    ) -> Result<Vec<u8>> {
        let endpoint = endpoint.into();
        if endpoint.requires_session() {
            self.ensure_session()?;
        }
        let request = build_modern_request(
            &self.client.base,
            &self.credentials,
            &self.session,
            method,
            &endpoint,
            body.as_ref(),
        )?;
        classify_modern(self.client.sender.execute(&request, &self.session))
    }

    /// Send a prebuilt multipart body. `content_type` must carry the
    /// boundary.
    pub fn upload<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        endpoint: impl Into<Endpoint>,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<T> {
        let endpoint = endpoint.into();
        if endpoint.requires_session() {
            self.ensure_session()?;
        }
        let request = build_upload_request(
            &self.client.base,
            &self.credentials,
            &self.session,
            method,
            &endpoint,
            body,
            content_type,
        )?;
        decode(&classify_modern(self.client.sender.execute(&request, &self.session))?)
    }

    /// Create a session cookie unless one exists.
    ///
    /// Delegated credentials log in as the actor and then switch the session
    /// to the target account.
    pub fn ensure_session(&self) -> Result<()> {
        if self.session.has_session(&self.client.base) {
            return Ok(());
        }
        let _establishing = self.session.establishing();
        if self.session.has_session(&self.client.base) {
            return Ok(());
        }

        let request = LoginRequest {
            username: self.credentials.acting_username(),
            password: self.credentials.passkey(),
        };
        let response: LoginResponse =
            self.call_modern(HttpMethod::Post, "login", Some(json_body(&request)?))?;
        if response.session_id.is_empty() {
            return Err(Error::LoginFailed("no session id was returned".to_string()));
        }
        self.session
            .set(&self.client.base, SESSION_COOKIE, &response.session_id, Some("/"));

        if self.credentials.is_delegated() {
            let switch = SwitchRequest {
                username: self.credentials.visible_username(),
            };
            self.call_modern_bytes(
                HttpMethod::Post,
                "session/login-as/switch",
                Some(json_body(&switch)?),
            )?;
        }

        debug!(username = self.credentials.username(), "session established");
        Ok(())
    }
}

/// A reseller. Dereferences to its own [`UserContext`].
#[derive(Debug, Clone)]
pub struct ResellerContext {
    user: UserContext,
}

impl ResellerContext {
    pub(crate) fn new(user: UserContext) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &UserContext {
        &self.user
    }

    /// Act as one of this reseller's accounts, reusing the reseller's
    /// passkey.
    pub fn login_as_user(&self, username: &str) -> Result<UserContext> {
        login(self.user.client.clone(), self.user.credentials.delegated(username), Role::User)
    }
}

impl Deref for ResellerContext {
    type Target = UserContext;

    fn deref(&self) -> &UserContext {
        &self.user
    }
}

/// An administrator. Dereferences to its own [`ResellerContext`].
#[derive(Debug, Clone)]
pub struct AdminContext {
    reseller: ResellerContext,
}

impl AdminContext {
    pub(crate) fn new(user: UserContext) -> Self {
        Self {
            reseller: ResellerContext::new(user),
        }
    }

    pub fn reseller(&self) -> &ResellerContext {
        &self.reseller
    }

    /// Act as one of the server's resellers, reusing the admin passkey.
    pub fn login_as_reseller(&self, username: &str) -> Result<ResellerContext> {
        let user = login(
            self.user().client.clone(),
            self.user().credentials.delegated(username),
            Role::Reseller,
        )?;
        Ok(ResellerContext::new(user))
    }
}

impl Deref for AdminContext {
    type Target = ResellerContext;

    fn deref(&self) -> &ResellerContext {
        &self.reseller
    }
}

/// Upper bound on concurrent sub-calls of one fan-out.
pub(crate) const FAN_OUT_WORKERS: usize = 8;

/// Run `f` once per item on a bounded pool of scoped threads and join.
///
/// Workers pull item indices from a shared counter, and the calling thread
/// works the queue too, so a failed thread spawn only reduces parallelism.
/// Results come back in completion order. Any failure discards the partial
/// results and returns every error as [`Error::Aggregate`].
pub(crate) fn fan_out<I, T, F>(items: &[I], f: F) -> Result<Vec<T>>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> Result<T> + Sync,
{
    let results = Mutex::new(Vec::with_capacity(items.len()));
    let errors = Mutex::new(Vec::new());
    let next = AtomicUsize::new(0);

    let work = || {
        while let Some(item) = items.get(next.fetch_add(1, Ordering::Relaxed)) {
            match f(item) {
                Ok(value) => results.lock().unwrap_or_else(PoisonError::into_inner).push(value),
                Err(error) => errors.lock().unwrap_or_else(PoisonError::into_inner).push(error),
            }
        }
    };

    std::thread::scope(|scope| {
        let helpers = items.len().min(FAN_OUT_WORKERS).saturating_sub(1);
        for _ in 0..helpers {
            if let Err(error) = std::thread::Builder::new().spawn_scoped(scope, &work) {
                debug!(%error, "fan-out worker could not be spawned");
                break;
            }
        }
        work();
    });

    let errors = errors.into_inner().unwrap_or_else(PoisonError::into_inner);
    if !errors.is_empty() {
        return Err(Error::Aggregate(errors));
    }
    Ok(results.into_inner().unwrap_or_else(PoisonError::into_inner))
}
