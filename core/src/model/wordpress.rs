//! WordPress toolkit payloads. All of them travel over the modern API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WordPress install into a database the caller names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordPressInstall {
    pub admin_email: String,
    pub admin_name: String,
    pub admin_pass: String,
    pub db_name: String,
    pub db_pass: String,
    /// Table prefix. A trailing `_` is added when missing.
    pub db_prefix: String,
    pub db_user: String,
    /// Relative to the account's home directory.
    pub file_path: String,
    pub title: String,
}

/// A WordPress install whose database the panel creates itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordPressInstallQuick {
    pub admin_email: String,
    pub admin_name: String,
    pub admin_pass: String,
    pub file_path: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordPressLocation {
    pub file_path: String,
    pub host: String,
    pub id: String,
    pub web_path: String,
    pub wordpress: WordPressSite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordPressSite {
    pub auto_update_major: bool,
    pub auto_update_minor: bool,
    /// Set when the toolkit could not inspect the install.
    pub error: String,
    #[serde(rename = "siteURL")]
    pub site_url: String,
    pub template: String,
    pub title: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WordPressUser {
    pub id: i64,
    pub display_name: String,
    pub email: String,
    pub login: String,
    pub registered: Option<DateTime<Utc>>,
    pub roles: Vec<String>,
}
