use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::context::UserContext;
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpMethod;
use crate::model::{
    Database, DatabaseWithUser, WordPressInstall, WordPressInstallQuick, WordPressLocation, WordPressUser,
};
use crate::transport::json_body;

#[derive(Serialize)]
struct NewPassword<'a> {
    password: &'a str,
}

#[derive(Deserialize)]
struct SsoLink {
    #[serde(default)]
    url: String,
}

fn user_path(location_id: &str, user_id: i64, action: &str) -> String {
    format!("wordpress/locations/{location_id}/users/{user_id}/{action}")
}

/// Install paths are relative to the home directory.
fn relative_path(path: &str) -> String {
    path.strip_prefix('/').unwrap_or(path).to_string()
}

impl UserContext {
    pub fn change_wordpress_user_password(&self, location_id: &str, user_id: i64, password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(Error::InvalidInput("password cannot be empty".to_string()));
        }
        self.call_modern_bytes(
            HttpMethod::Post,
            user_path(location_id, user_id, "change-password"),
            Some(json_body(&NewPassword { password })?),
        )
        .context("failed to change wordpress user password")?;
        Ok(())
    }

    /// Install WordPress into `install.db_name`, creating that database and
    /// its user first when `create_database` is set. A database created here
    /// is dropped again if the install fails.
    pub fn create_wordpress_install(&self, install: &WordPressInstall, create_database: bool) -> Result<()> {
        if create_database {
            self.create_database_with_user(&DatabaseWithUser {
                database: Database {
                    name: install.db_name.clone(),
                    ..Database::default()
                },
                password: install.db_pass.clone(),
                user: install.db_user.clone(),
            })
            .context("failed to create database")?;
        }

        let mut install = install.clone();
        install.db_name = self.add_username_prefix(&install.db_name);
        install.db_user = self.add_username_prefix(&install.db_user);
        if !install.db_prefix.contains('_') {
            install.db_prefix.push('_');
        }
        install.file_path = relative_path(&install.file_path);

        let installed = json_body(&install)
            .and_then(|body| self.call_modern_bytes(HttpMethod::Post, "wordpress/install", Some(body)));
        let Err(error) = installed else {
            return Ok(());
        };
        if !create_database {
            return Err(error);
        }
        match self.delete_database(&install.db_name) {
            Ok(()) => Err(error),
            Err(cleanup) => {
                warn!(database = %install.db_name, %cleanup, "could not drop database after failed install");
                Err(Error::Aggregate(vec![error, cleanup]))
            }
        }
    }

    /// Install WordPress with a database the panel creates and names.
    pub fn create_wordpress_install_quick(&self, install: &WordPressInstallQuick) -> Result<()> {
        let install = WordPressInstallQuick {
            file_path: relative_path(&install.file_path),
            ..install.clone()
        };
        self.call_modern_bytes(HttpMethod::Post, "wordpress/install-quick", Some(json_body(&install)?))?;
        Ok(())
    }

    pub fn delete_wordpress_install(&self, id: &str) -> Result<()> {
        self.call_modern_bytes(HttpMethod::Delete, format!("wordpress/locations/{id}"), None)?;
        Ok(())
    }

    pub fn get_wordpress_installs(&self) -> Result<Vec<WordPressLocation>> {
        let installs: Option<Vec<WordPressLocation>> = self
            .call_modern(HttpMethod::Get, "wordpress/locations", None)
            .context("failed to get wordpress installs")?;
        Ok(installs.unwrap_or_default())
    }

    /// A one-time URL that logs the browser in as `user_id`.
    pub fn get_wordpress_sso_link(&self, location_id: &str, user_id: i64) -> Result<String> {
        let link: SsoLink = self
            .call_modern(HttpMethod::Post, user_path(location_id, user_id, "sso-login"), None)
            .context("failed to get wordpress login link")?;
        Ok(link.url)
    }

    pub fn get_wordpress_users(&self, location_id: &str) -> Result<Vec<WordPressUser>> {
        let users: Option<Vec<WordPressUser>> = self
            .call_modern(HttpMethod::Get, format!("wordpress/locations/{location_id}/users"), None)
            .context("failed to get wordpress users")?;
        Ok(users.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::context::tests::{backend_for, user_context};
    use crate::error::Error;
    use crate::http::HttpMethod;
    use crate::model::{WordPressInstall, WordPressInstallQuick};

    fn sent_json(body: Option<Vec<u8>>) -> Value {
        serde_json::from_slice(&body.unwrap()).unwrap()
    }

    fn install() -> WordPressInstall {
        WordPressInstall {
            db_name: "wp".to_string(),
            db_pass: "dbpw".to_string(),
            db_prefix: "wp".to_string(),
            db_user: "wp".to_string(),
            file_path: "/domains/example.com/public_html".to_string(),
            title: "Blog".to_string(),
            ..WordPressInstall::default()
        }
    }

    #[test]
    fn install_prefixes_database_and_relativizes_path() {
        let backend = backend_for("user", "bob");
        backend.route("/api/wordpress/install", 200, "{}");
        user_context(&backend).create_wordpress_install(&install(), false).unwrap();

        let sent = sent_json(backend.last_request().body);
        assert_eq!(sent["dbName"], "bob_wp");
        assert_eq!(sent["dbUser"], "bob_wp");
        assert_eq!(sent["dbPrefix"], "wp_");
        assert_eq!(sent["filePath"], "domains/example.com/public_html");
        assert!(backend.requests_to("create-db-with-user").is_empty());
    }

    #[test]
    fn failed_install_drops_the_database_it_created() {
        let backend = backend_for("user", "bob");
        backend.route("/api/db-manage/create-db-with-user", 200, "{}");
        backend.route("/api/wordpress/install", 500, r#"{"type":"INSTALL_FAILED","message":"disk full"}"#);
        backend.route_method(HttpMethod::Delete, "/api/db-manage/databases/bob_wp", 204, "");

        let err = user_context(&backend).create_wordpress_install(&install(), true).unwrap_err();
        assert!(matches!(err.root(), Error::Modern { .. }));
        assert_eq!(backend.requests_to("/api/db-manage/databases/bob_wp").len(), 1);
    }

    #[test]
    fn quick_install_strips_leading_slash() {
        let backend = backend_for("user", "bob");
        backend.route("/api/wordpress/install-quick", 200, "{}");
        user_context(&backend)
            .create_wordpress_install_quick(&WordPressInstallQuick {
                file_path: "/public_html/blog".to_string(),
                ..WordPressInstallQuick::default()
            })
            .unwrap();
        assert_eq!(sent_json(backend.last_request().body)["filePath"], "public_html/blog");
    }

    #[test]
    fn empty_password_is_rejected_locally() {
        let backend = backend_for("user", "bob");
        let err = user_context(&backend)
            .change_wordpress_user_password("loc1", 1, "")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(backend.requests_to("change-password").is_empty());
    }

    #[test]
    fn sso_link_is_posted_per_user() {
        let backend = backend_for("user", "bob");
        backend.route(
            "/api/wordpress/locations/loc1/users/7/sso-login",
            200,
            r#"{"url":"https://example.com/wp-login.php?token=x"}"#,
        );
        let url = user_context(&backend).get_wordpress_sso_link("loc1", 7).unwrap();
        assert_eq!(url, "https://example.com/wp-login.php?token=x");
        assert_eq!(backend.last_request().method, HttpMethod::Post);
    }
}
