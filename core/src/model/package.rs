use serde::{Deserialize, Serialize};

use crate::translate::{
    format_number, format_on_off, lenient_string, parse_flag, parse_number, UNLIMITED,
};

/// A user package: the quota and feature template accounts are created from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Package {
    pub anonymous_ftp_enabled: bool,
    pub bandwidth_quota: i64,
    pub cpu_quota: i64,
    pub catchall_enabled: bool,
    pub cgi_enabled: bool,
    pub cron_enabled: bool,
    pub dns_control_enabled: bool,
    pub domain_pointer_quota: i64,
    pub domain_quota: i64,
    pub email_autoresponder_quota: i64,
    pub email_forwarder_quota: i64,
    pub email_mailing_list_quota: i64,
    pub email_quota: i64,
    pub ftp_quota: i64,
    pub git_enabled: bool,
    pub io_read_bandwidth_max: i64,
    pub io_read_iops_max: i64,
    pub io_write_bandwidth_max: i64,
    pub io_write_iops_max: i64,
    pub inode_quota: i64,
    pub jail_enabled: bool,
    pub language: String,
    pub login_keys_enabled: bool,
    pub memory_high: i64,
    pub memory_max: i64,
    pub mysql_quota: i64,
    pub name: String,
    pub nginx_enabled: bool,
    pub php_enabled: bool,
    pub quota: i64,
    pub redis_enabled: bool,
    pub ssh_enabled: bool,
    pub skin: String,
    pub spam_assassin_enabled: bool,
    pub ssl_enabled: bool,
    pub subdomain_quota: i64,
    pub suspend_at_limit_enabled: bool,
    pub sys_info_enabled: bool,
    pub tasks_max: i64,
    pub wordpress_enabled: bool,
}

/// Package as returned by `CMD_API_PACKAGES_USER?package=…` and as posted to
/// `CMD_MANAGE_USER_PACKAGES`.
///
/// The cgroup limits (`CPUQuota`, `IO*`, `Memory*`, `TasksMax`) spell
/// "unlimited" as an empty string; every other quota uses `"unlimited"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPackage {
    #[serde(rename = "aftp", default, deserialize_with = "lenient_string")]
    pub anonymous_ftp_enabled: String,
    #[serde(rename = "bandwidth", default, deserialize_with = "lenient_string")]
    pub bandwidth_quota: String,
    #[serde(rename = "CPUQuota", default, deserialize_with = "lenient_string")]
    pub cpu_quota: String,
    #[serde(rename = "catchall", default, deserialize_with = "lenient_string")]
    pub catchall_enabled: String,
    #[serde(rename = "cgi", default, deserialize_with = "lenient_string")]
    pub cgi_enabled: String,
    #[serde(rename = "cron", default, deserialize_with = "lenient_string")]
    pub cron_enabled: String,
    #[serde(rename = "dnscontrol", default, deserialize_with = "lenient_string")]
    pub dns_control_enabled: String,
    #[serde(rename = "domainptr", default, deserialize_with = "lenient_string")]
    pub domain_pointer_quota: String,
    #[serde(rename = "vdomains", default, deserialize_with = "lenient_string")]
    pub domain_quota: String,
    #[serde(rename = "nemailr", default, deserialize_with = "lenient_string")]
    pub email_autoresponder_quota: String,
    #[serde(rename = "nemailf", default, deserialize_with = "lenient_string")]
    pub email_forwarder_quota: String,
    #[serde(rename = "nemailml", default, deserialize_with = "lenient_string")]
    pub email_mailing_list_quota: String,
    #[serde(rename = "nemails", default, deserialize_with = "lenient_string")]
    pub email_quota: String,
    #[serde(rename = "ftp", default, deserialize_with = "lenient_string")]
    pub ftp_quota: String,
    #[serde(rename = "git", default, deserialize_with = "lenient_string")]
    pub git_enabled: String,
    #[serde(rename = "IOReadBandwidthMax", default, deserialize_with = "lenient_string")]
    pub io_read_bandwidth_max: String,
    #[serde(rename = "IOReadIOPSMax", default, deserialize_with = "lenient_string")]
    pub io_read_iops_max: String,
    #[serde(rename = "IOWriteBandwidthMax", default, deserialize_with = "lenient_string")]
    pub io_write_bandwidth_max: String,
    #[serde(rename = "IOWriteIOPSMax", default, deserialize_with = "lenient_string")]
    pub io_write_iops_max: String,
    #[serde(rename = "inode", default, deserialize_with = "lenient_string")]
    pub inode_quota: String,
    #[serde(rename = "jail", default, deserialize_with = "lenient_string")]
    pub jail_enabled: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub language: String,
    #[serde(rename = "login_keys", default, deserialize_with = "lenient_string")]
    pub login_keys_enabled: String,
    #[serde(rename = "MemoryHigh", default, deserialize_with = "lenient_string")]
    pub memory_high: String,
    #[serde(rename = "MemoryMax", default, deserialize_with = "lenient_string")]
    pub memory_max: String,
    #[serde(rename = "mysql", default, deserialize_with = "lenient_string")]
    pub mysql_quota: String,
    #[serde(rename = "packagename", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "nginx_unit", default, deserialize_with = "lenient_string")]
    pub nginx_enabled: String,
    #[serde(rename = "php", default, deserialize_with = "lenient_string")]
    pub php_enabled: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quota: String,
    #[serde(rename = "redis", default, deserialize_with = "lenient_string")]
    pub redis_enabled: String,
    #[serde(rename = "ssh", default, deserialize_with = "lenient_string")]
    pub ssh_enabled: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub skin: String,
    #[serde(rename = "spam", default, deserialize_with = "lenient_string")]
    pub spam_assassin_enabled: String,
    #[serde(rename = "ssl", default, deserialize_with = "lenient_string")]
    pub ssl_enabled: String,
    #[serde(rename = "nsubdomains", default, deserialize_with = "lenient_string")]
    pub subdomain_quota: String,
    #[serde(rename = "suspend_at_limit", default, deserialize_with = "lenient_string")]
    pub suspend_at_limit_enabled: String,
    #[serde(rename = "sysinfo", default, deserialize_with = "lenient_string")]
    pub sys_info_enabled: String,
    #[serde(rename = "TasksMax", default, deserialize_with = "lenient_string")]
    pub tasks_max: String,
    #[serde(rename = "wordpress", default, deserialize_with = "lenient_string")]
    pub wordpress_enabled: String,
}

impl From<RawPackage> for Package {
    fn from(raw: RawPackage) -> Self {
        Package {
            anonymous_ftp_enabled: parse_flag(&raw.anonymous_ftp_enabled),
            bandwidth_quota: parse_number(&raw.bandwidth_quota),
            cpu_quota: parse_number(&raw.cpu_quota),
            catchall_enabled: parse_flag(&raw.catchall_enabled),
            cgi_enabled: parse_flag(&raw.cgi_enabled),
            cron_enabled: parse_flag(&raw.cron_enabled),
            dns_control_enabled: parse_flag(&raw.dns_control_enabled),
            domain_pointer_quota: parse_number(&raw.domain_pointer_quota),
            domain_quota: parse_number(&raw.domain_quota),
            email_autoresponder_quota: parse_number(&raw.email_autoresponder_quota),
            email_forwarder_quota: parse_number(&raw.email_forwarder_quota),
            email_mailing_list_quota: parse_number(&raw.email_mailing_list_quota),
            email_quota: parse_number(&raw.email_quota),
            ftp_quota: parse_number(&raw.ftp_quota),
            git_enabled: parse_flag(&raw.git_enabled),
            io_read_bandwidth_max: parse_number(&raw.io_read_bandwidth_max),
            io_read_iops_max: parse_number(&raw.io_read_iops_max),
            io_write_bandwidth_max: parse_number(&raw.io_write_bandwidth_max),
            io_write_iops_max: parse_number(&raw.io_write_iops_max),
            inode_quota: parse_number(&raw.inode_quota),
            jail_enabled: parse_flag(&raw.jail_enabled),
            language: raw.language,
            login_keys_enabled: parse_flag(&raw.login_keys_enabled),
            memory_high: parse_number(&raw.memory_high),
            memory_max: parse_number(&raw.memory_max),
            mysql_quota: parse_number(&raw.mysql_quota),
            name: raw.name,
            nginx_enabled: parse_flag(&raw.nginx_enabled),
            php_enabled: parse_flag(&raw.php_enabled),
            quota: parse_number(&raw.quota),
            redis_enabled: parse_flag(&raw.redis_enabled),
            ssh_enabled: parse_flag(&raw.ssh_enabled),
            skin: raw.skin,
            spam_assassin_enabled: parse_flag(&raw.spam_assassin_enabled),
            ssl_enabled: parse_flag(&raw.ssl_enabled),
            subdomain_quota: parse_number(&raw.subdomain_quota),
            suspend_at_limit_enabled: parse_flag(&raw.suspend_at_limit_enabled),
            sys_info_enabled: parse_flag(&raw.sys_info_enabled),
            tasks_max: parse_number(&raw.tasks_max),
            wordpress_enabled: parse_flag(&raw.wordpress_enabled),
        }
    }
}

impl From<&Package> for RawPackage {
    fn from(pack: &Package) -> Self {
        RawPackage {
            anonymous_ftp_enabled: format_on_off(pack.anonymous_ftp_enabled),
            bandwidth_quota: format_number(pack.bandwidth_quota, false),
            cpu_quota: format_number(pack.cpu_quota, true),
            catchall_enabled: format_on_off(pack.catchall_enabled),
            cgi_enabled: format_on_off(pack.cgi_enabled),
            cron_enabled: format_on_off(pack.cron_enabled),
            dns_control_enabled: format_on_off(pack.dns_control_enabled),
            domain_pointer_quota: format_number(pack.domain_pointer_quota, false),
            domain_quota: format_number(pack.domain_quota, false),
            email_autoresponder_quota: format_number(pack.email_autoresponder_quota, false),
            email_forwarder_quota: format_number(pack.email_forwarder_quota, false),
            email_mailing_list_quota: format_number(pack.email_mailing_list_quota, false),
            email_quota: format_number(pack.email_quota, false),
            ftp_quota: format_number(pack.ftp_quota, false),
            git_enabled: format_on_off(pack.git_enabled),
            io_read_bandwidth_max: format_number(pack.io_read_bandwidth_max, true),
            io_read_iops_max: format_number(pack.io_read_iops_max, true),
            io_write_bandwidth_max: format_number(pack.io_write_bandwidth_max, true),
            io_write_iops_max: format_number(pack.io_write_iops_max, true),
            inode_quota: format_number(pack.inode_quota, false),
            jail_enabled: format_on_off(pack.jail_enabled),
            language: pack.language.clone(),
            login_keys_enabled: format_on_off(pack.login_keys_enabled),
            memory_high: format_number(pack.memory_high, true),
            memory_max: format_number(pack.memory_max, true),
            mysql_quota: format_number(pack.mysql_quota, false),
            name: pack.name.clone(),
            nginx_enabled: format_on_off(pack.nginx_enabled),
            php_enabled: format_on_off(pack.php_enabled),
            quota: format_number(pack.quota, false),
            redis_enabled: format_on_off(pack.redis_enabled),
            ssh_enabled: format_on_off(pack.ssh_enabled),
            skin: pack.skin.clone(),
            spam_assassin_enabled: format_on_off(pack.spam_assassin_enabled),
            ssl_enabled: format_on_off(pack.ssl_enabled),
            subdomain_quota: format_number(pack.subdomain_quota, false),
            suspend_at_limit_enabled: format_on_off(pack.suspend_at_limit_enabled),
            sys_info_enabled: format_on_off(pack.sys_info_enabled),
            tasks_max: format_number(pack.tasks_max, true),
            wordpress_enabled: format_on_off(pack.wordpress_enabled),
        }
    }
}

/// A reseller package: a user package plus the reseller-only limits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResellerPackage {
    #[serde(flatten)]
    pub package: Package,
    pub oversell_enabled: bool,
    pub user_quota: i64,
}

/// Reseller package wire shape.
///
/// An unlimited user quota is not `nuser=unlimited` but an empty `nuser`
/// plus `unusers=yes`; both are omitted from the form when empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResellerPackage {
    #[serde(flatten)]
    pub package: RawPackage,
    #[serde(rename = "oversell", default, deserialize_with = "lenient_string")]
    pub oversell_enabled: String,
    #[serde(
        rename = "nuser",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub user_quota: String,
    #[serde(
        rename = "unusers",
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub user_quota_unlimited: String,
}

impl From<RawResellerPackage> for ResellerPackage {
    fn from(raw: RawResellerPackage) -> Self {
        let user_quota = if raw.user_quota_unlimited == "yes" {
            UNLIMITED
        } else if raw.user_quota.is_empty() {
            0
        } else {
            parse_number(&raw.user_quota)
        };

        ResellerPackage {
            package: raw.package.into(),
            oversell_enabled: parse_flag(&raw.oversell_enabled),
            user_quota,
        }
    }
}

impl From<&ResellerPackage> for RawResellerPackage {
    fn from(pack: &ResellerPackage) -> Self {
        let (user_quota, user_quota_unlimited) = if pack.user_quota == UNLIMITED {
            (String::new(), "yes".to_string())
        } else {
            (pack.user_quota.to_string(), String::new())
        };

        RawResellerPackage {
            package: RawPackage::from(&pack.package),
            oversell_enabled: format_on_off(pack.oversell_enabled),
            user_quota,
            user_quota_unlimited,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catchall_is_not_tied_to_anonymous_ftp() {
        let pack = Package {
            anonymous_ftp_enabled: false,
            catchall_enabled: true,
            ..Package::default()
        };
        let raw = RawPackage::from(&pack);
        assert_eq!(raw.anonymous_ftp_enabled, "OFF");
        assert_eq!(raw.catchall_enabled, "ON");
    }

    #[test]
    fn cgroup_limits_use_empty_string_for_unlimited() {
        let pack = Package {
            cpu_quota: UNLIMITED,
            memory_max: UNLIMITED,
            tasks_max: 512,
            quota: UNLIMITED,
            ..Package::default()
        };
        let raw = RawPackage::from(&pack);
        assert_eq!(raw.cpu_quota, "");
        assert_eq!(raw.memory_max, "");
        assert_eq!(raw.tasks_max, "512");
        assert_eq!(raw.quota, "unlimited");
    }

    #[test]
    fn reseller_user_quota_sentinel() {
        let unlimited = ResellerPackage {
            user_quota: UNLIMITED,
            ..ResellerPackage::default()
        };
        let raw = RawResellerPackage::from(&unlimited);
        assert_eq!(raw.user_quota, "");
        assert_eq!(raw.user_quota_unlimited, "yes");
        assert_eq!(ResellerPackage::from(raw).user_quota, UNLIMITED);

        let limited = ResellerPackage {
            user_quota: 25,
            oversell_enabled: true,
            ..ResellerPackage::default()
        };
        let raw = RawResellerPackage::from(&limited);
        assert_eq!(raw.user_quota, "25");
        assert_eq!(raw.user_quota_unlimited, "");
        assert_eq!(raw.oversell_enabled, "ON");
        assert_eq!(ResellerPackage::from(raw), limited);
    }

    #[test]
    fn reseller_form_omits_empty_user_quota_fields() {
        let raw = RawResellerPackage::from(&ResellerPackage {
            user_quota: UNLIMITED,
            ..ResellerPackage::default()
        });
        let value = serde_json::to_value(&raw).unwrap();
        assert!(value.get("nuser").is_none());
        assert_eq!(value["unusers"], "yes");
        assert_eq!(value["oversell"], "OFF");
        assert_eq!(value["CPUQuota"], "");
    }
}
