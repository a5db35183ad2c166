use std::time::Duration;

use serde::Deserialize;

/// Settings for one [`DirectAdmin`](crate::DirectAdmin) client.
///
/// Deserializable so host applications can embed it in their own config
/// files; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Panel base URL, e.g. `https://panel.example.com:2222`.
    pub url: String,
    /// Whole-request timeout. There is no per-call override.
    pub timeout_secs: u64,
    /// Keep the last fetched domains, email accounts, packages and users.
    pub cache_enabled: bool,
    /// Emit a `debug` trace for every request.
    pub debug: bool,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_secs: 30,
            cache_enabled: false,
            debug: false,
        }
    }
}
