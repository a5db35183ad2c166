//! Operations, grouped by resource.
//!
//! Each submodule adds inherent methods to the lowest context allowed to
//! call them: account-holder operations on [`UserContext`], reseller
//! operations on [`ResellerContext`], and administrator operations on
//! [`AdminContext`]. They are thin: build a form or JSON body from typed
//! input, make one `call_*`, and check the literal success string the panel
//! answers with.
//!
//! [`UserContext`]: crate::UserContext
//! [`ResellerContext`]: crate::ResellerContext
//! [`AdminContext`]: crate::AdminContext

mod account;
mod admin;
mod backups;
mod databases;
mod dns;
mod domains;
mod email;
mod files;
mod packages;
mod reseller;
mod ssl;
mod wordpress;

pub use backups::BackupItem;
pub use databases::DatabaseFormat;

use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::transport::{Endpoint, Form, LegacyEnvelope};

/// Append `{prefix}0..N` fields, the way the legacy API selects several
/// objects in one call.
pub(crate) fn push_indexed<'a>(form: &mut Form, prefix: &str, values: impl IntoIterator<Item = &'a str>) {
    for (index, value) in values.into_iter().enumerate() {
        form.push(format!("{prefix}{index}"), value);
    }
}

impl UserContext {
    /// Post `form` to a legacy command and require `expected` in `success`.
    pub(crate) fn legacy_action(
        &self,
        endpoint: impl Into<Endpoint>,
        form: &Form,
        operation: &str,
        expected: &str,
    ) -> Result<()> {
        let envelope: LegacyEnvelope = self.call_legacy(HttpMethod::Post, endpoint, Some(form))?;
        envelope.expect_success(operation, expected)
    }

    /// `CMD_JSON_VALIDATE`: succeeds when no object matching `query` exists.
    pub(crate) fn check_object_exists(&self, query: &[(&str, &str)]) -> Result<()> {
        let endpoint = query
            .iter()
            .fold(Endpoint::new("JSON_VALIDATE"), |endpoint, (key, value)| endpoint.query(*key, *value));
        match self.call_legacy::<LegacyEnvelope>(HttpMethod::Get, endpoint, None) {
            Ok(_) => Ok(()),
            Err(error @ Error::Legacy { .. }) => Err(error.context("object already exists")),
            Err(other) => Err(other),
        }
    }
}
