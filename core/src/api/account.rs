use crate::context::UserContext;
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpMethod;
use crate::model::{
    BasicSysInfo, LoginKeyUrl, Message, Plugin, RawSysInfo, RawUserUsage, Session, SysInfo, UserUsage,
};
use crate::transport::{json_body, Endpoint};

impl UserContext {
    /// Usage of the logged-in account, aggregated from `CMD_USER_STATS`.
    /// Requires the account to have a default domain.
    pub fn get_my_user_usage(&self) -> Result<UserUsage> {
        let domain = &self.config().domain;
        if domain.is_empty() {
            return Err(Error::InvalidInput("user does not have a domain".to_string()));
        }
        let endpoint = Endpoint::new("USER_STATS")
            .query("bytes", "yes")
            .query("domain", domain.as_str());
        let raw: RawUserUsage = self.call_legacy(HttpMethod::Get, endpoint, None)?;
        Ok(raw.into())
    }

    pub fn get_session_info(&self) -> Result<Session> {
        self.call_modern(HttpMethod::Get, Endpoint::new("session").session_required(), None)
    }

    pub fn get_basic_sys_info(&self) -> Result<BasicSysInfo> {
        self.call_modern(HttpMethod::Get, "info", None)
            .context("failed to get basic sys info")
    }

    /// Plugins visible to this account.
    pub fn get_plugins(&self) -> Result<Vec<Plugin>> {
        let plugins: Option<Vec<Plugin>> = self.call_modern(HttpMethod::Get, "plugins/list", None)?;
        Ok(plugins.unwrap_or_default())
    }

    /// Host hardware and service status.
    pub fn get_sys_info(&self) -> Result<SysInfo> {
        let raw: RawSysInfo = self
            .call_legacy(HttpMethod::Get, "API_SYSTEM_INFO", None)
            .context("failed to get sys info")?;
        Ok(SysInfo::from(raw))
    }

    pub fn get_messages(&self) -> Result<Vec<Message>> {
        let messages: Option<Vec<Message>> = self.call_modern(HttpMethod::Get, "messages", None)?;
        Ok(messages.unwrap_or_default())
    }

    /// Create a login key URL and return it as the panel filled it in.
    pub fn create_login_url(&self, login_key_url: &LoginKeyUrl) -> Result<LoginKeyUrl> {
        self.call_modern(
            HttpMethod::Post,
            Endpoint::new("login-keys/urls").session_required(),
            Some(json_body(login_key_url)?),
        )
        .context("failed to create login URL")
    }

    pub fn get_login_urls(&self) -> Result<Vec<LoginKeyUrl>> {
        let urls: Option<Vec<LoginKeyUrl>> = self
            .call_modern(
                HttpMethod::Get,
                Endpoint::new("login-keys/urls").session_required(),
                None,
            )
            .context("failed to get login URLs")?;
        Ok(urls.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use crate::context::tests::{backend_for, user_context};
    use crate::error::Error;
    use crate::http::HttpMethod;
    use crate::model::LoginKeyUrl;

    #[test]
    fn usage_is_requested_for_the_config_domain() {
        let backend = backend_for("user", "bob");
        backend.route(
            "CMD_USER_STATS",
            200,
            r#"{"stats":{"0":{"setting":"nemails","max_usage":"10","usage":"3"}},"domains":{}}"#,
        );
        let usage = user_context(&backend).get_my_user_usage().unwrap();
        assert_eq!((usage.email_quota, usage.email_usage), (10, 3));

        let request = backend.last_request();
        assert!(request.url.ends_with("/CMD_USER_STATS?bytes=yes&domain=example.com&json=yes"));
    }

    #[test]
    fn login_url_creation_establishes_a_session_first() {
        let backend = backend_for("user", "bob");
        backend.route("/api/login", 200, r#"{"sessionID":"sid"}"#);
        backend.route_method(
            HttpMethod::Post,
            "/api/login-keys/urls",
            200,
            r#"{"id":"k1","url":"https://panel.example.com:2222/api/login/url?key=abc"}"#,
        );

        let created = user_context(&backend)
            .create_login_url(&LoginKeyUrl::default())
            .unwrap();
        assert_eq!(created.id, "k1");

        let request = backend.last_request();
        assert_eq!(request.header("authorization"), None);
        assert_eq!(request.header("cookie"), Some("session=sid"));
    }

    #[test]
    fn modern_failure_is_wrapped_with_operation() {
        let backend = backend_for("user", "bob");
        backend.route("/api/info", 500, r#"{"type":"INTERNAL","message":"boom"}"#);
        let err = user_context(&backend).get_basic_sys_info().unwrap_err();
        assert_eq!(err.to_string(), "failed to get basic sys info: INTERNAL: boom");
        assert!(matches!(err.root(), Error::Modern { .. }));
    }

    #[test]
    fn sys_info_is_translated_from_legacy_body() {
        let backend = backend_for("admin", "admin");
        backend.route(
            "CMD_API_SYSTEM_INFO",
            200,
            r#"{"numcpus":"1","cpus":{"0":{"mhz":"2399.998","model_name":"Xeon","vendor_id":"GenuineIntel"}},"load":{"load_1":"0.15"}}"#,
        );
        let info = user_context(&backend).get_sys_info().unwrap();
        assert_eq!(info.cpu_count, 1);
        assert_eq!(info.cpus[0].vendor, "GenuineIntel");
        assert_eq!(info.system_load.last_1_minute, "0.15");
        assert_eq!(backend.last_request().method, HttpMethod::Get);
    }

    #[test]
    fn plugins_decode_menu_entries() {
        let backend = backend_for("user", "bob");
        backend.route(
            "/api/plugins/list",
            200,
            r#"[{"id":"softaculous","role":"user","menuEntry":{"title":"Softaculous","url":"/CMD_PLUGINS/softaculous","icon":"s.svg"}}]"#,
        );
        let plugins = user_context(&backend).get_plugins().unwrap();
        assert_eq!(plugins[0].id, "softaculous");
        assert_eq!(plugins[0].menu_entry.url, "/CMD_PLUGINS/softaculous");
    }
}
