use serde::Serialize;

use crate::context::AdminContext;
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpMethod;
use crate::model::{License, LoginHistory};
use crate::transport::json_body;

#[derive(Serialize)]
struct ConvertAccount<'a> {
    account: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    creator: Option<&'a str>,
}

impl AdminContext {
    pub fn get_all_users(&self) -> Result<Vec<String>> {
        let users: Option<Vec<String>> = self.call_legacy(HttpMethod::Get, "API_SHOW_ALL_USERS", None)?;
        Ok(users.unwrap_or_default())
    }

    pub fn get_resellers(&self) -> Result<Vec<String>> {
        let resellers: Option<Vec<String>> = self.call_legacy(HttpMethod::Get, "API_SHOW_RESELLERS", None)?;
        Ok(resellers.unwrap_or_default())
    }

    /// Hand `username` over to `reseller` after demoting it to a user.
    pub fn convert_reseller_to_user(&self, username: &str, reseller: &str) -> Result<()> {
        self.post_account("convert-reseller-to-user", username, Some(reseller))
    }

    pub fn convert_user_to_reseller(&self, username: &str) -> Result<()> {
        self.post_account("convert-user-to-reseller", username, None)
    }

    pub fn move_user_to_reseller(&self, username: &str, reseller: &str) -> Result<()> {
        self.post_account("change-user-creator", username, Some(reseller))
    }

    pub fn enable_redis(&self) -> Result<()> {
        self.post_empty("redis/enable")
    }

    pub fn disable_redis(&self) -> Result<()> {
        self.post_empty("redis/disable")
    }

    pub fn restart_directadmin(&self) -> Result<()> {
        self.post_empty("restart")
    }

    /// Ask the panel to update itself to the latest release.
    pub fn update_directadmin(&self) -> Result<()> {
        self.post_empty("version/update")
    }

    pub fn get_license(&self) -> Result<License> {
        self.call_modern(HttpMethod::Get, "license", None)
            .context("failed to get license")
    }

    pub fn get_login_history(&self) -> Result<Vec<LoginHistory>> {
        let history: Option<Vec<LoginHistory>> = self
            .call_modern(HttpMethod::Get, "login-history", None)
            .context("failed to get login history")?;
        match history {
            Some(history) if !history.is_empty() => Ok(history),
            _ => Err(Error::NotFound("login history")),
        }
    }

    fn post_account(&self, path: &str, account: &str, creator: Option<&str>) -> Result<()> {
        let body = json_body(&ConvertAccount { account, creator })?;
        self.call_modern_bytes(HttpMethod::Post, path, Some(body))?;
        Ok(())
    }

    fn post_empty(&self, path: &str) -> Result<()> {
        self.call_modern_bytes(HttpMethod::Post, path, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use crate::context::tests::{backend_for, client};
    use crate::context::AdminContext;
    use crate::error::Error;
    use crate::http::HttpMethod;
    use crate::test_support::ScriptedBackend;

    fn admin(backend: &std::sync::Arc<ScriptedBackend>) -> AdminContext {
        client(backend).login_as_admin("admin", "secret").unwrap()
    }

    #[test]
    fn convert_user_omits_creator() {
        let backend = backend_for("admin", "admin");
        backend.route("/api/convert-user-to-reseller", 204, "");
        admin(&backend).convert_user_to_reseller("carol").unwrap();

        let sent: Value = serde_json::from_slice(&backend.last_request().body.unwrap()).unwrap();
        assert_eq!(sent, json!({"account": "carol"}));
    }

    #[test]
    fn move_user_names_the_new_creator() {
        let backend = backend_for("admin", "admin");
        backend.route_method(HttpMethod::Post, "/api/change-user-creator", 200, "{}");
        admin(&backend).move_user_to_reseller("carol", "res2").unwrap();

        let sent: Value = serde_json::from_slice(&backend.last_request().body.unwrap()).unwrap();
        assert_eq!(sent, json!({"account": "carol", "creator": "res2"}));
    }

    #[test]
    fn redis_toggle_posts_without_body() {
        let backend = backend_for("admin", "admin");
        backend.route("/api/redis/disable", 200, "");
        admin(&backend).disable_redis().unwrap();

        let request = backend.last_request();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.body, None);
    }

    #[test]
    fn license_decodes_nested_limits() {
        let backend = backend_for("admin", "admin");
        backend.route(
            "/api/license",
            200,
            r#"{"lid":7,"name":"box","type":"pro","limits":{"maxUsers":50,"proPack":true},"usage":{"users":3}}"#,
        );
        let license = admin(&backend).get_license().unwrap();
        assert_eq!(license.lid, 7);
        assert_eq!(license.limits.max_users, 50);
        assert!(license.limits.pro_pack);
        assert_eq!(license.usage.users, 3);
    }

    #[test]
    fn empty_login_history_is_not_found() {
        let backend = backend_for("admin", "admin");
        backend.route("/api/login-history", 200, "[]");
        let err = admin(&backend).get_login_history().unwrap_err();
        assert!(matches!(err, Error::NotFound("login history")));
    }
}
