use serde::Serialize;

use crate::context::{AdminContext, UserContext};
use crate::error::Result;
use crate::http::HttpMethod;
use crate::model::{Database, DatabaseProcess, DatabaseUser, DatabaseWithUser};
use crate::transport::{json_body, Endpoint, MultipartForm};

/// Export encoding for [`UserContext::export_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseFormat {
    Sql,
    Gzip,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPassword<'a> {
    new_password: &'a str,
}

fn database_path(action: &str, name: &str) -> String {
    format!("db-manage/databases/{name}{action}")
}

/// Every name passed in is prefixed with `{username}_` unless it already is.
impl UserContext {
    pub fn create_database(&self, database: &Database) -> Result<()> {
        let database = Database {
            name: self.add_username_prefix(&database.name),
            ..database.clone()
        };
        self.call_modern_bytes(HttpMethod::Post, "db-manage/create-db", Some(json_body(&database)?))?;
        Ok(())
    }

    pub fn create_database_with_user(&self, database: &DatabaseWithUser) -> Result<()> {
        let mut database = database.clone();
        database.database.name = self.add_username_prefix(&database.database.name);
        database.user = self.add_username_prefix(&database.user);
        self.call_modern_bytes(
            HttpMethod::Post,
            "db-manage/create-db-with-user",
            Some(json_body(&database)?),
        )?;
        Ok(())
    }

    pub fn create_database_user(&self, user: &DatabaseUser) -> Result<()> {
        let user = DatabaseUser {
            user: self.add_username_prefix(&user.user),
            ..user.clone()
        };
        self.call_modern_bytes(HttpMethod::Post, "db-manage/create-user", Some(json_body(&user)?))?;
        Ok(())
    }

    pub fn delete_database(&self, name: &str) -> Result<()> {
        let name = self.add_username_prefix(name);
        self.call_modern_bytes(HttpMethod::Delete, database_path("", &name), None)?;
        Ok(())
    }

    /// Raw dump bytes, gzip-compressed for [`DatabaseFormat::Gzip`].
    pub fn export_database(&self, name: &str, format: DatabaseFormat) -> Result<Vec<u8>> {
        let name = self.add_username_prefix(name);
        let gzip = matches!(format, DatabaseFormat::Gzip);
        let endpoint = Endpoint::new(database_path("/export", &name)).query("gzip", gzip.to_string());
        self.call_modern_bytes(HttpMethod::Get, endpoint, None)
    }

    pub fn get_database(&self, name: &str) -> Result<Database> {
        let name = self.add_username_prefix(name);
        self.call_modern(HttpMethod::Get, format!("db-show/databases/{name}"), None)
    }

    pub fn get_databases(&self) -> Result<Vec<Database>> {
        let databases: Option<Vec<Database>> = self.call_modern(HttpMethod::Get, "db-show/databases", None)?;
        Ok(databases.unwrap_or_default())
    }

    /// Load an SQL dump. With `empty_existing` the database is cleared first.
    pub fn import_database(&self, name: &str, empty_existing: bool, sql: &[u8]) -> Result<()> {
        let name = self.add_username_prefix(name);
        let (body, content_type) = MultipartForm::new().file("sqlfile", "filename", sql).finish();
        let endpoint = Endpoint::new(database_path("/import", &name)).query("clean", empty_existing.to_string());
        self.upload::<serde_json::Value>(HttpMethod::Post, endpoint, body, &content_type)?;
        Ok(())
    }

    pub fn update_database_user_hosts(&self, username: &str, hosts: &[String]) -> Result<()> {
        let username = self.add_username_prefix(username);
        self.call_modern_bytes(
            HttpMethod::Post,
            format!("db-manage/users/{username}/change-hosts"),
            Some(json_body(&hosts)?),
        )?;
        Ok(())
    }

    pub fn update_database_user_password(&self, username: &str, password: &str) -> Result<()> {
        let username = self.add_username_prefix(username);
        self.call_modern_bytes(
            HttpMethod::Post,
            format!("db-manage/users/{username}/change-password"),
            Some(json_body(&NewPassword { new_password: password })?),
        )?;
        Ok(())
    }
}

impl AdminContext {
    /// Running MySQL processes across all accounts.
    pub fn get_database_processes(&self) -> Result<Vec<DatabaseProcess>> {
        let processes: Option<Vec<DatabaseProcess>> =
            self.call_modern(HttpMethod::Get, "db-monitor/processes", None)?;
        Ok(processes.unwrap_or_default())
    }
}
