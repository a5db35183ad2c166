use std::collections::BTreeMap;

use super::push_indexed;
use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::model::{EmailAccount, RawEmailAccounts};
use crate::translate::format_yes_no;
use crate::transport::{Endpoint, Form, LegacyEnvelope};

fn forwarders() -> Endpoint {
    Endpoint::new("API_EMAIL_FORWARDERS")
}

fn forwarder_form(domain: &str, user: &str, destinations: &[&str]) -> Form {
    Form::new()
        .with("domain", domain)
        .with("email", destinations.join(","))
        .with("user", user)
}

fn account_form(account: &EmailAccount) -> Form {
    Form::new()
        .with("domain", account.domain.as_str())
        .with("user", account.username.as_str())
        .with("passwd", account.password.as_str())
        .with("passwd2", account.password.as_str())
        .with("quota", account.disk_quota.to_string())
        .with("limit", account.send_quota.to_string())
}

impl UserContext {
    pub fn create_email_account(&self, account: &EmailAccount) -> Result<()> {
        self.legacy_action(
            Endpoint::new("API_POP").query("action", "create"),
            &account_form(account),
            "create email account",
            "Email account created",
        )?;
        if let Some(cache) = self.cache() {
            let mut accounts = cache.email_accounts(&account.domain).unwrap_or_default();
            accounts.retain(|existing| existing.username != account.username);
            accounts.push(EmailAccount {
                password: String::new(),
                ..account.clone()
            });
            cache.store_email_accounts(&account.domain, &accounts);
        }
        Ok(())
    }

    pub fn delete_email_account(&self, domain: &str, name: &str) -> Result<()> {
        let form = Form::new().with("domain", domain).with("user", name);
        self.legacy_action(
            Endpoint::new("API_POP").query("action", "delete"),
            &form,
            "delete email account",
            "E-Mail Accounts Deleted",
        )?;
        if let Some(cache) = self.cache() {
            if let Some(mut accounts) = cache.email_accounts(domain) {
                accounts.retain(|account| account.username != name);
                cache.store_email_accounts(domain, &accounts);
            }
        }
        Ok(())
    }

    /// Mailboxes of `domain`. An empty list is an error.
    pub fn get_email_accounts(&self, domain: &str) -> Result<Vec<EmailAccount>> {
        let raw: RawEmailAccounts = self.call_legacy(
            HttpMethod::Get,
            Endpoint::new("EMAIL_POP").query("bytes", "yes").query("domain", domain),
            None,
        )?;
        let accounts = raw.into_accounts(domain);
        if accounts.is_empty() {
            return Err(Error::NotFound("email accounts"));
        }
        if let Some(cache) = self.cache() {
            cache.store_email_accounts(domain, &accounts);
        }
        Ok(accounts)
    }

    pub fn update_email_account(&self, account: &EmailAccount) -> Result<()> {
        self.legacy_action(
            Endpoint::new("API_POP").query("action", "modify"),
            &account_form(account),
            "update email account",
            "Account password changed",
        )
    }

    pub fn toggle_dkim(&self, domain: &str, enable: bool) -> Result<()> {
        let form = Form::new()
            .with("action", "set_dkim")
            .with("domain", domain)
            .with(if enable { "enable" } else { "disable" }, "yes");
        self.legacy_action("API_EMAIL_POP", &form, "toggle DKIM state", "Success")
    }

    /// Deliver mail for `domain` locally instead of following its MX
    /// records. Only correct when the mail is hosted on this server.
    pub fn use_internal_mail_handler(&self, domain: &str, enable: bool) -> Result<()> {
        let form = Form::new()
            .with("domain", domain)
            .with("internal", format_yes_no(enable));
        self.legacy_action(
            Endpoint::new("API_DNS_MX").query("action", "internal"),
            &form,
            "set internal mail handler",
            "Option Saved",
        )
    }

    /// Succeeds only if `password` is correct for the full `address`.
    pub fn verify_email_account(&self, address: &str, password: &str) -> Result<()> {
        let form = Form::new().with("email", address).with("passwd", password);
        let envelope: LegacyEnvelope = self.call_legacy(HttpMethod::Post, "API_EMAIL_AUTH", Some(&form))?;
        if envelope.success != "Password Correct" {
            return Err(Error::unexpected("verify email account", "credentials incorrect"));
        }
        Ok(())
    }

    /// Forward `user@domain` to every address in `destinations`.
    pub fn create_email_forwarder(&self, domain: &str, user: &str, destinations: &[&str]) -> Result<()> {
        self.legacy_action(
            forwarders().query("action", "create"),
            &forwarder_form(domain, user, destinations),
            "create email forwarder",
            "Forwarder created",
        )
    }

    pub fn delete_email_forwarders(&self, domain: &str, users: &[&str]) -> Result<()> {
        let mut form = Form::new().with("domain", domain);
        push_indexed(&mut form, "select", users.iter().copied());
        self.legacy_action(
            forwarders().query("action", "delete"),
            &form,
            "delete email forwarder(s)",
            "Forwarders deleted",
        )
    }

    /// Forwarders of `domain`, keyed by local part.
    pub fn get_email_forwarders(&self, domain: &str) -> Result<BTreeMap<String, Vec<String>>> {
        let forwarders: Option<BTreeMap<String, Vec<String>>> =
            self.call_legacy(HttpMethod::Get, forwarders().query("domain", domain), None)?;
        Ok(forwarders.unwrap_or_default())
    }

    /// Replace the destinations of an existing forwarder.
    pub fn update_email_forwarder(&self, domain: &str, user: &str, destinations: &[&str]) -> Result<()> {
        self.legacy_action(
            forwarders().query("action", "modify"),
            &forwarder_form(domain, user, destinations),
            "update email forwarder",
            "Forwarder updated",
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::client::DirectAdmin;
    use crate::config::ClientConfig;
    use crate::context::tests::{backend_for, user_context, BASE};
    use crate::error::Error;
    use crate::model::EmailAccount;

    const ACCOUNTS: &str = r#"{"emails":{
        "info":{"count":"1"},
        "alice":{"account":"alice","suspended":"no","sent":{"send_limit":"100","sent":"1"},"usage":{"quota":"50","usage":"5"}}
    }}"#;

    #[test]
    fn create_sends_password_twice() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_POP", 200, r#"{"success":"Email account created"}"#);
        user_context(&backend)
            .create_email_account(&EmailAccount {
                domain: "example.com".to_string(),
                username: "alice".to_string(),
                password: "pw".to_string(),
                disk_quota: 50,
                send_quota: 100,
                ..EmailAccount::default()
            })
            .unwrap();
        let request = backend.last_request();
        assert!(request.url.contains("CMD_API_POP?action=create&json=yes"));
        assert_eq!(
            request.body.as_deref(),
            Some(&b"domain=example.com&user=alice&passwd=pw&passwd2=pw&quota=50&limit=100"[..])
        );
    }

    #[test]
    fn accounts_are_listed_and_cached() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_EMAIL_POP", 200, ACCOUNTS);
        let config = ClientConfig {
            cache_enabled: true,
            ..ClientConfig::new(BASE)
        };
        let context = DirectAdmin::with_backend(config, backend.clone())
            .unwrap()
            .login_as_user("bob", "secret")
            .unwrap();

        let accounts = context.get_email_accounts("example.com").unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].send_quota, 100);
        assert_eq!(
            context.cache().and_then(|cache| cache.email_accounts("example.com")),
            Some(accounts)
        );
    }

    #[test]
    fn no_accounts_is_not_found() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_EMAIL_POP", 200, r#"{"emails":{"info":{}}}"#);
        let err = user_context(&backend).get_email_accounts("example.com").unwrap_err();
        assert!(matches!(err, Error::NotFound("email accounts")));
    }

    #[test]
    fn dkim_toggle_uses_enable_or_disable_field() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_EMAIL_POP", 200, r#"{"success":"Success"}"#);
        let context = user_context(&backend);
        context.toggle_dkim("example.com", false).unwrap();
        assert_eq!(
            backend.last_request().body.as_deref(),
            Some(&b"action=set_dkim&domain=example.com&disable=yes"[..])
        );
    }

    #[test]
    fn wrong_password_is_reported() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_EMAIL_AUTH", 200, r#"{"success":"","result":"Password Incorrect"}"#);
        let err = user_context(&backend)
            .verify_email_account("alice@example.com", "nope")
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to verify email account: credentials incorrect");
    }

    #[test]
    fn forwarder_destinations_are_comma_joined() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_EMAIL_FORWARDERS", 200, r#"{"success":"Forwarder created"}"#);
        user_context(&backend)
            .create_email_forwarder("example.com", "sales", &["a@x.com", "b@y.com"])
            .unwrap();
        let request = backend.last_request();
        assert!(request.url.contains("CMD_API_EMAIL_FORWARDERS?action=create&json=yes"));
        assert_eq!(
            request.body.as_deref(),
            Some(&b"domain=example.com&email=a%40x.com%2Cb%40y.com&user=sales"[..])
        );
    }

    #[test]
    fn forwarders_are_keyed_by_local_part() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_EMAIL_FORWARDERS", 200, r#"{"sales":["a@x.com","b@y.com"]}"#);
        let forwarders = user_context(&backend).get_email_forwarders("example.com").unwrap();
        assert_eq!(forwarders["sales"], vec!["a@x.com", "b@y.com"]);
        assert!(backend.last_request().url.contains("domain=example.com"));
    }

    #[test]
    fn forwarder_deletion_requires_panel_confirmation() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_EMAIL_FORWARDERS", 200, r#"{"success":"","result":"no such forwarder"}"#);
        let err = user_context(&backend)
            .delete_email_forwarders("example.com", &["sales"])
            .unwrap_err();
        assert_eq!(err.to_string(), "failed to delete email forwarder(s): no such forwarder");
    }
}
