use crate::context::{fan_out, ResellerContext};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpMethod;
use crate::model::{Package, RawPackage, User, UserConfig, UserUsage};
use crate::translate::format_yes_no;
use crate::transport::{Endpoint, Form};

use super::push_indexed;

impl ResellerContext {
    pub fn check_user_exists(&self, username: &str) -> Result<()> {
        self.check_object_exists(&[("type", "username"), ("value", username)])
    }

    /// Add `ip` to the account's extra addresses.
    pub fn add_user_ip(&self, username: &str, ip: &str) -> Result<()> {
        let form = Form::new()
            .with("action", "multi_ip")
            .with("extra_ip", ip)
            .with("user", username);
        self.legacy_action("MODIFY_USER", &form, "add IP to user account", "IP Added")
    }

    /// Create an account from `config`.
    ///
    /// `domain`, `email`, `package` and `username` must be set. The account
    /// gets the first entry of `ip_addresses`.
    pub fn create_user(&self, config: &UserConfig, password: &str, email_user: bool) -> Result<()> {
        let package = Form::new().with("package", config.package.as_str());
        self.create_account(config, password, email_user, package)
    }

    /// Like [`create_user`](Self::create_user), but the account gets the
    /// limits of `package` directly instead of a named package.
    /// `config.package` is ignored.
    pub fn create_user_with_package(
        &self,
        config: &UserConfig,
        password: &str,
        email_user: bool,
        package: &Package,
    ) -> Result<()> {
        let limits = Form::from_serializable(&RawPackage::from(package))?
            .into_iter()
            .filter(|(key, _)| key != "packagename")
            .collect();
        self.create_account(config, password, email_user, limits)
    }

    fn create_account(&self, config: &UserConfig, password: &str, email_user: bool, package: Form) -> Result<()> {
        let ip = config.ip_addresses.first().map(String::as_str).unwrap_or_default();
        let mut form = Form::new()
            .with("action", "create")
            .with("add", "Submit")
            .with("domain", config.domain.as_str())
            .with("email", config.email.as_str())
            .with("ip", ip);
        form.extend(package);
        form.extend([
            ("passwd", password),
            ("passwd2", password),
            ("username", config.username.as_str()),
        ]);
        form.push("notify", format_yes_no(email_user));
        self.legacy_action(
            Endpoint::new("API_ACCOUNT_USER").query("action", "create"),
            &form,
            "create user account",
            &format!("User {} created", config.username),
        )
    }

    pub fn delete_users(&self, usernames: &[&str]) -> Result<()> {
        let mut form = Form::new().with("confirmed", "Confirm").with("delete", "yes");
        push_indexed(&mut form, "select", usernames.iter().copied());
        self.legacy_action("API_SELECT_USERS", &form, "delete user(s)", "User deleted")?;
        if let Some(cache) = self.cache() {
            for username in usernames {
                cache.remove_user(username);
            }
        }
        Ok(())
    }

    /// Usernames created by this reseller.
    pub fn get_my_users(&self) -> Result<Vec<String>> {
        let users: Option<Vec<String>> = self.call_legacy(HttpMethod::Get, "API_SHOW_USERS", None)?;
        match users {
            Some(users) if !users.is_empty() => Ok(users),
            _ => Err(Error::NotFound("users")),
        }
    }

    /// Every owned account with its config and/or usage, fetched
    /// concurrently. One failed account fails the whole call.
    pub fn get_my_users_with_data(&self, with_config: bool, with_usage: bool) -> Result<Vec<User>> {
        let usernames = self.get_my_users().context("failed to get users")?;

        let users = fan_out(&usernames, |username| {
            let mut user = User::default();
            if with_config {
                user.config = self
                    .get_user_config(username)
                    .with_context(|| format!("failed to get user config for {username}"))?;
            }
            if with_usage {
                user.usage = self
                    .get_user_usage(username)
                    .with_context(|| format!("failed to get user usage for {username}"))?;
            }
            user.config.username.clone_from(username);
            Ok(user)
        })?;

        if let Some(cache) = self.cache() {
            for user in &users {
                cache.store_user(user);
            }
        }
        Ok(users)
    }

    pub fn get_user_config(&self, username: &str) -> Result<UserConfig> {
        self.call_modern(HttpMethod::Get, format!("users/{username}/config"), None)
    }

    pub fn get_user_usage(&self, username: &str) -> Result<UserUsage> {
        self.call_modern(HttpMethod::Get, format!("users/{username}/usage"), None)
    }

    pub fn suspend_users(&self, usernames: &[&str]) -> Result<()> {
        self.toggle_user_suspension(true, usernames)
    }

    pub fn unsuspend_users(&self, usernames: &[&str]) -> Result<()> {
        self.toggle_user_suspension(false, usernames)
    }

    fn toggle_user_suspension(&self, suspend: bool, usernames: &[&str]) -> Result<()> {
        let (action, expected, operation) = if suspend {
            ("Suspend", "User suspended", "suspend user(s)")
        } else {
            ("Unsuspend", "User unsuspended", "unsuspend user(s)")
        };
        let mut form = Form::new().with("suspend", action);
        push_indexed(&mut form, "select", usernames.iter().copied());
        self.legacy_action("API_SELECT_USERS", &form, operation, expected)?;
        if let Some(cache) = self.cache() {
            for username in usernames {
                cache.remove_user(username);
            }
        }
        Ok(())
    }
}
