use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `stat`-like details of a path in the account's home directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileMetadata {
    pub access_time: Option<DateTime<Utc>>,
    pub birth_time: Option<DateTime<Utc>>,
    pub change_time: Option<DateTime<Utc>>,
    pub gid: i64,
    pub group: String,
    pub mode: String,
    pub modify_time: Option<DateTime<Utc>>,
    pub name: String,
    pub size_bytes: i64,
    pub symlink: Symlink,
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: i64,
    pub unix_mode: i64,
    pub user: String,
}

/// Empty unless the path is a symbolic link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Symlink {
    pub resolved: String,
    pub target: String,
}
