//! Typed, synchronous client for the DirectAdmin control panel.
//!
//! # Overview
//! DirectAdmin speaks two protocols: the legacy form-encoded `CMD_*` commands
//! and the JSON `/api/*` endpoints. Both are driven through one role-scoped
//! context obtained from [`DirectAdmin`]:
//!
//! ```no_run
//! use directadmin_core::{ClientConfig, DirectAdmin};
//!
//! let client = DirectAdmin::new(ClientConfig::new("https://panel.example.com:2222"))?;
//! let reseller = client.login_as_reseller("reseller", "login-key")?;
//! for user in reseller.get_my_users()? {
//!     println!("{user}");
//! }
//! # Ok::<(), directadmin_core::Error>(())
//! ```
//!
//! # Design
//! - Requests are built and responses classified by pure functions in
//!   [`transport`]; the network round-trip happens behind the
//!   [`HttpBackend`] trait, so tests swap in a scripted backend.
//! - Legacy payloads decode into `Raw*` structs that mirror the wire and are
//!   translated into the public model in [`model`]. Modern payloads decode
//!   into the public model directly.
//! - [`AdminContext`] dereferences to [`ResellerContext`], which dereferences
//!   to [`UserContext`], so a higher role can call every lower-role
//!   operation.
//! - Calls are blocking. Bulk reads fan out on scoped threads and report
//!   every failure together.

mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod model;
pub mod sender;
pub mod session;
pub mod translate;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use api::{BackupItem, DatabaseFormat};
pub use client::DirectAdmin;
pub use config::ClientConfig;
pub use context::{AdminContext, ResellerContext, UserContext};
pub use error::{Error, Result, ResultExt};
pub use http::{HttpBackend, HttpMethod, HttpRequest, HttpResponse};
pub use model::*;
pub use sender::UreqBackend;
pub use session::{Credentials, SessionStore};
pub use transport::{Endpoint, Form, MultipartForm};
pub use translate::UNLIMITED;
