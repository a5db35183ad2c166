use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::translate::{
    format_on_off, format_yes_no, lenient_string, number_from_value, parse_flag, parse_number,
    usage_from_value,
};

pub const ROLE_ADMIN: &str = "Admin";
pub const ROLE_RESELLER: &str = "Reseller";
pub const ROLE_USER: &str = "User";

/// `date_created` as the legacy API writes it, e.g. `Mon Dec  2 03:18:43 2019`.
const LEGACY_DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

/// Account role, as declared in the account's configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Reseller,
    User,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Reseller => ROLE_RESELLER,
            Role::User => ROLE_USER,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An account's configuration and usage, as gathered by reseller bulk calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub config: UserConfig,
    pub usage: UserUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserConfig {
    pub aftp_enabled: bool,
    pub api_access_with_password_enabled: bool,
    pub catch_all_enabled: bool,
    pub cgi_enabled: bool,
    pub clam_av_enabled: bool,
    pub created: Option<DateTime<Utc>>,
    pub creator: String,
    pub cron_enabled: bool,
    pub domain: String,
    pub dns_enabled: bool,
    pub email: String,
    pub git_enabled: bool,
    pub ip_addresses: Vec<String>,
    pub jail_enabled: bool,
    pub language: String,
    pub login_keys_enabled: bool,
    pub nginx_enabled: bool,
    pub notify_on_question_failures: bool,
    pub notify_on_two_factor_failures: bool,
    pub ns1: String,
    pub ns2: String,
    pub package: String,
    pub php_enabled: bool,
    pub redis_enabled: bool,
    pub security_questions_enabled: bool,
    pub skin: String,
    pub spam_enabled: bool,
    pub ssh_enabled: bool,
    pub ssl_enabled: bool,
    pub suspended: bool,
    pub suspend_at_limit_enabled: bool,
    pub sys_info_enabled: bool,
    pub two_factor_authentication_enabled: bool,
    pub username: String,
    /// Title-cased role name: `Admin`, `Reseller` or `User`.
    pub user_type: String,
    pub word_press_toolkit_enabled: bool,
}

impl UserConfig {
    pub fn role(&self) -> Option<Role> {
        match self.user_type.as_str() {
            ROLE_ADMIN => Some(Role::Admin),
            ROLE_RESELLER => Some(Role::Reseller),
            ROLE_USER => Some(Role::User),
            _ => None,
        }
    }
}

/// `CMD_API_SHOW_USER_CONFIG` body, restricted to the fields the public
/// config carries.
///
/// Feature switches use `ON`/`OFF`; account-state and notification fields
/// (`suspended`, `api_with_password`, `security_questions`, `twostep_auth`,
/// `notify_on_all_*`) use `yes`/`no`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUserConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub aftp: String,
    #[serde(deserialize_with = "lenient_string")]
    pub api_with_password: String,
    #[serde(deserialize_with = "lenient_string")]
    pub catchall: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cgi: String,
    #[serde(deserialize_with = "lenient_string")]
    pub clamav: String,
    #[serde(deserialize_with = "lenient_string")]
    pub creator: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cron: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date_created: String,
    #[serde(deserialize_with = "lenient_string")]
    pub dnscontrol: String,
    #[serde(deserialize_with = "lenient_string")]
    pub domain: String,
    #[serde(deserialize_with = "lenient_string")]
    pub email: String,
    #[serde(deserialize_with = "lenient_string")]
    pub git: String,
    /// Comma-separated. The panel writes `", "` between addresses, and that
    /// is the separator written back; a bare `","` is accepted on input.
    #[serde(deserialize_with = "lenient_string")]
    pub ips: String,
    #[serde(deserialize_with = "lenient_string")]
    pub jail: String,
    #[serde(deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(deserialize_with = "lenient_string")]
    pub login_keys: String,
    #[serde(deserialize_with = "lenient_string")]
    pub nginx_unit: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notify_on_all_question_failures: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notify_on_all_twostep_auth_failures: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ns1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ns2: String,
    #[serde(deserialize_with = "lenient_string")]
    pub package: String,
    #[serde(deserialize_with = "lenient_string")]
    pub php: String,
    #[serde(deserialize_with = "lenient_string")]
    pub redis: String,
    #[serde(deserialize_with = "lenient_string")]
    pub security_questions: String,
    #[serde(deserialize_with = "lenient_string")]
    pub skin: String,
    #[serde(deserialize_with = "lenient_string")]
    pub spam: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ssh: String,
    #[serde(deserialize_with = "lenient_string")]
    pub ssl: String,
    #[serde(deserialize_with = "lenient_string")]
    pub suspend_at_limit: String,
    #[serde(deserialize_with = "lenient_string")]
    pub suspended: String,
    #[serde(deserialize_with = "lenient_string")]
    pub sysinfo: String,
    #[serde(deserialize_with = "lenient_string")]
    pub twostep_auth: String,
    #[serde(deserialize_with = "lenient_string")]
    pub username: String,
    #[serde(deserialize_with = "lenient_string")]
    pub usertype: String,
    #[serde(deserialize_with = "lenient_string")]
    pub wordpress: String,
}

impl From<RawUserConfig> for UserConfig {
    fn from(raw: RawUserConfig) -> Self {
        UserConfig {
            aftp_enabled: parse_flag(&raw.aftp),
            api_access_with_password_enabled: parse_flag(&raw.api_with_password),
            catch_all_enabled: parse_flag(&raw.catchall),
            cgi_enabled: parse_flag(&raw.cgi),
            clam_av_enabled: parse_flag(&raw.clamav),
            created: parse_legacy_date(&raw.date_created),
            creator: raw.creator,
            cron_enabled: parse_flag(&raw.cron),
            domain: raw.domain,
            dns_enabled: parse_flag(&raw.dnscontrol),
            email: raw.email,
            git_enabled: parse_flag(&raw.git),
            ip_addresses: split_ips(&raw.ips),
            jail_enabled: parse_flag(&raw.jail),
            language: raw.language,
            login_keys_enabled: parse_flag(&raw.login_keys),
            nginx_enabled: parse_flag(&raw.nginx_unit),
            notify_on_question_failures: parse_flag(&raw.notify_on_all_question_failures),
            notify_on_two_factor_failures: parse_flag(&raw.notify_on_all_twostep_auth_failures),
            ns1: raw.ns1,
            ns2: raw.ns2,
            package: raw.package,
            php_enabled: parse_flag(&raw.php),
            redis_enabled: parse_flag(&raw.redis),
            security_questions_enabled: parse_flag(&raw.security_questions),
            skin: raw.skin,
            spam_enabled: parse_flag(&raw.spam),
            ssh_enabled: parse_flag(&raw.ssh),
            ssl_enabled: parse_flag(&raw.ssl),
            suspended: parse_flag(&raw.suspended),
            suspend_at_limit_enabled: parse_flag(&raw.suspend_at_limit),
            sys_info_enabled: parse_flag(&raw.sysinfo),
            two_factor_authentication_enabled: parse_flag(&raw.twostep_auth),
            username: raw.username,
            user_type: title_case(&raw.usertype),
            word_press_toolkit_enabled: parse_flag(&raw.wordpress),
        }
    }
}

impl From<&UserConfig> for RawUserConfig {
    fn from(config: &UserConfig) -> Self {
        RawUserConfig {
            aftp: format_on_off(config.aftp_enabled),
            api_with_password: format_yes_no(config.api_access_with_password_enabled),
            catchall: format_on_off(config.catch_all_enabled),
            cgi: format_on_off(config.cgi_enabled),
            clamav: format_on_off(config.clam_av_enabled),
            creator: config.creator.clone(),
            cron: format_on_off(config.cron_enabled),
            date_created: config
                .created
                .map(|created| created.format(LEGACY_DATE_FORMAT).to_string())
                .unwrap_or_default(),
            dnscontrol: format_on_off(config.dns_enabled),
            domain: config.domain.clone(),
            email: config.email.clone(),
            git: format_on_off(config.git_enabled),
            ips: config.ip_addresses.join(IP_SEPARATOR),
            jail: format_on_off(config.jail_enabled),
            language: config.language.clone(),
            login_keys: format_on_off(config.login_keys_enabled),
            nginx_unit: format_on_off(config.nginx_enabled),
            notify_on_all_question_failures: format_yes_no(config.notify_on_question_failures),
            notify_on_all_twostep_auth_failures: format_yes_no(config.notify_on_two_factor_failures),
            ns1: config.ns1.clone(),
            ns2: config.ns2.clone(),
            package: config.package.clone(),
            php: format_on_off(config.php_enabled),
            redis: format_on_off(config.redis_enabled),
            security_questions: format_yes_no(config.security_questions_enabled),
            skin: config.skin.clone(),
            spam: format_on_off(config.spam_enabled),
            ssh: format_on_off(config.ssh_enabled),
            ssl: format_on_off(config.ssl_enabled),
            suspend_at_limit: format_on_off(config.suspend_at_limit_enabled),
            suspended: format_yes_no(config.suspended),
            sysinfo: format_on_off(config.sys_info_enabled),
            twostep_auth: format_yes_no(config.two_factor_authentication_enabled),
            username: config.username.clone(),
            usertype: config.user_type.to_ascii_lowercase(),
            wordpress: format_on_off(config.word_press_toolkit_enabled),
        }
    }
}

/// Unparseable dates become `None` rather than failing the whole config;
/// some installations emit formats other than the usual one.
fn parse_legacy_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    // `%e` expects a space-padded day; collapse runs of spaces so both
    // "Dec  2" and "Dec 2" parse.
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match NaiveDateTime::parse_from_str(&normalized, LEGACY_DATE_FORMAT) {
        Ok(naive) => Some(naive.and_utc()),
        Err(error) => {
            warn!(date = raw, %error, "could not parse account creation date");
            None
        }
    }
}

const IP_SEPARATOR: &str = ", ";

fn split_ips(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .collect()
}

fn title_case(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserUsage {
    pub bandwidth_quota: i64,
    pub bandwidth_usage: i64,
    pub db_quota: i64,
    pub db_usage: i64,
    pub disk_quota: i64,
    pub disk_usage: i64,
    pub domains: Vec<DomainUsage>,
    pub domain_pointers_quota: i64,
    pub domain_pointers_usage: i64,
    pub domain_quota: i64,
    pub domain_usage: i64,
    pub email_quota: i64,
    pub email_usage: i64,
    pub email_forwarders_quota: i64,
    pub email_forwarders_usage: i64,
    pub email_mailing_list_quota: i64,
    pub email_mailing_list_usage: i64,
    pub ftp_quota: i64,
    pub ftp_usage: i64,
    pub inode_quota: i64,
    pub inode_usage: i64,
    pub subdomain_quota: i64,
    pub subdomain_usage: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainUsage {
    pub bandwidth_usage: i64,
    pub cgi_enabled: bool,
    pub disk_usage: i64,
    pub domain: String,
    pub log_usage: i64,
    pub php_enabled: bool,
    pub ssl_enabled: bool,
    pub subdomains: Vec<String>,
    pub subdomain_usage: i64,
    pub suspended: bool,
}

/// `USER_STATS` body. Both maps are kept as loose JSON because the `info`
/// entry and several stats differ in shape from their siblings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawUserUsage {
    pub domains: BTreeMap<String, Value>,
    pub stats: BTreeMap<String, Value>,
}

struct Stat<'a> {
    max_usage: &'a str,
    usage: &'a Value,
}

impl RawUserUsage {
    /// Stats keyed by their `setting` name rather than their position.
    fn stats_by_setting(&self) -> BTreeMap<&str, Stat<'_>> {
        self.stats
            .values()
            .filter_map(|stat| {
                let setting = stat.get("setting")?.as_str()?;
                match setting {
                    "" | "language" | "send_usage_message" => None,
                    _ => Some((
                        setting,
                        Stat {
                            max_usage: stat.get("max_usage").and_then(Value::as_str).unwrap_or_default(),
                            usage: stat.get("usage").unwrap_or(&Value::Null),
                        },
                    )),
                }
            })
            .collect()
    }
}

fn domain_usage(entry: &Value) -> DomainUsage {
    let field = |name: &str| entry.get(name).unwrap_or(&Value::Null);
    let setting = |name: &str| {
        field("settings")
            .get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let subdomains = match field("settings").get("subdomains") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    };

    DomainUsage {
        bandwidth_usage: usage_from_value(field("bandwidth")),
        cgi_enabled: parse_flag(&setting("cgi")),
        disk_usage: usage_from_value(field("quota")),
        domain: field("domain").as_str().unwrap_or_default().to_string(),
        log_usage: number_from_value(field("log_usage")),
        php_enabled: parse_flag(&setting("php")),
        ssl_enabled: parse_flag(&setting("ssl")),
        subdomains,
        subdomain_usage: number_from_value(field("nsubdomains")),
        suspended: parse_flag(field("suspended").as_str().unwrap_or_default()),
    }
}

impl From<RawUserUsage> for UserUsage {
    fn from(raw: RawUserUsage) -> Self {
        let stats = raw.stats_by_setting();
        let quota = |setting: &str| stats.get(setting).map(|s| parse_number(s.max_usage)).unwrap_or(0);
        let usage = |setting: &str| stats.get(setting).map(|s| number_from_value(s.usage)).unwrap_or(0);

        let domains = raw
            .domains
            .iter()
            .filter(|(id, _)| id.as_str() != "info")
            .map(|(_, entry)| domain_usage(entry))
            .collect();

        UserUsage {
            bandwidth_quota: quota("bandwidth"),
            bandwidth_usage: usage("bandwidth"),
            db_quota: quota("mysql"),
            db_usage: usage("mysql"),
            disk_quota: quota("quota"),
            disk_usage: usage("quota"),
            domains,
            domain_pointers_quota: quota("domainptr"),
            domain_pointers_usage: usage("domainptr"),
            domain_quota: quota("vdomains"),
            domain_usage: usage("vdomains"),
            email_quota: quota("nemails"),
            email_usage: usage("nemails"),
            email_forwarders_quota: quota("nemailf"),
            email_forwarders_usage: usage("nemailf"),
            email_mailing_list_quota: quota("nemailml"),
            email_mailing_list_usage: usage("nemailml"),
            ftp_quota: quota("ftp"),
            ftp_usage: usage("ftp"),
            inode_quota: quota("inode"),
            inode_usage: usage("inode"),
            subdomain_quota: quota("nsubdomains"),
            subdomain_usage: usage("nsubdomains"),
        }
    }
}
