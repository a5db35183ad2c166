use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
    #[serde(rename = "database")]
    pub name: String,
    pub default_charset: String,
    pub default_collation: String,
    pub definer_issues: i64,
    pub event_count: i64,
    pub routine_count: i64,
    pub size_bytes: i64,
    pub table_count: i64,
    pub trigger_count: i64,
    pub user_count: i64,
    pub view_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseUser {
    pub host_patterns: Vec<String>,
    pub password: String,
    #[serde(rename = "dbuser")]
    pub user: String,
}

/// Request body for creating a database and its first user in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseWithUser {
    #[serde(flatten)]
    pub database: Database,
    pub password: String,
    #[serde(rename = "dbuser")]
    pub user: String,
}

/// A server-wide MySQL process, as listed to administrators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseProcess {
    pub command: String,
    pub database: String,
    pub host: String,
    pub id: i64,
    pub info: String,
    pub state: String,
    /// Seconds in the current state.
    pub time: i64,
    pub user: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_body_carries_user_fields_beside_database() {
        let body = serde_json::to_value(DatabaseWithUser {
            database: Database {
                name: "bob_app".to_string(),
                ..Database::default()
            },
            password: "hunter2".to_string(),
            user: "bob_app".to_string(),
        })
        .unwrap();
        assert_eq!(body["database"], "bob_app");
        assert_eq!(body["dbuser"], "bob_app");
        assert_eq!(body["password"], "hunter2");
        assert_eq!(body["tableCount"], 0);
    }
}
