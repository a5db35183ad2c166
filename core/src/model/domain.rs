use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::translate::{
    format_number, format_on_off, format_yes_no, lenient_list, lenient_string, number_from_str,
    parse_flag, parse_number, UNLIMITED,
};

/// A hosted domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Domain {
    pub active: bool,
    pub bandwidth_quota: i64,
    pub bandwidth_usage: i64,
    pub cgi_enabled: bool,
    pub default_domain: bool,
    pub disk_quota: i64,
    pub disk_usage: i64,
    pub domain: String,
    pub ip_addresses: Vec<String>,
    pub mod_security_enabled: bool,
    pub open_base_dir_enabled: bool,
    pub php_enabled: bool,
    pub php_selector_enabled: bool,
    pub php_version: String,
    pub safe_mode: bool,
    pub ssl_enabled: bool,
    pub subdomains: Vec<String>,
    pub subdomain_usage: i64,
    pub suspended: bool,
    pub username: String,
}

/// One entry of `CMD_API_ADDITIONAL_DOMAINS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDomain {
    #[serde(default, deserialize_with = "lenient_string")]
    pub active: String,
    #[serde(rename = "bandwidth_limit", default, deserialize_with = "lenient_string")]
    pub bandwidth_quota: String,
    #[serde(rename = "bandwidth", default, deserialize_with = "lenient_string")]
    pub bandwidth_usage: String,
    #[serde(rename = "cgi", default, deserialize_with = "lenient_string")]
    pub cgi_enabled: String,
    #[serde(rename = "defaultdomain", default, deserialize_with = "lenient_string")]
    pub default_domain: String,
    #[serde(rename = "quota_limit", default, deserialize_with = "lenient_string")]
    pub disk_quota: String,
    #[serde(rename = "quota", default, deserialize_with = "lenient_string")]
    pub disk_usage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub domain: String,
    #[serde(rename = "ips", default, deserialize_with = "lenient_list")]
    pub ip_addresses: Vec<String>,
    #[serde(rename = "open_basedir", default, deserialize_with = "lenient_string")]
    pub open_base_dir_enabled: String,
    #[serde(rename = "php", default, deserialize_with = "lenient_string")]
    pub php_enabled: String,
    #[serde(rename = "safemode", default, deserialize_with = "lenient_string")]
    pub safe_mode: String,
    #[serde(rename = "ssl", default, deserialize_with = "lenient_string")]
    pub ssl_enabled: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub subdomains: Vec<String>,
    #[serde(rename = "subdomain", default, deserialize_with = "lenient_string")]
    pub subdomain_usage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub suspended: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub username: String,
    /// Filled from a second `action=view` call; never part of the list body.
    #[serde(skip)]
    pub extra: RawDomainExtra,
}

/// Per-domain detail only returned by the `action=view` variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDomainExtra {
    #[serde(rename = "modsecurity", default, deserialize_with = "lenient_string")]
    pub mod_security_enabled: String,
    #[serde(rename = "php1_select", default)]
    pub php_options: BTreeMap<String, RawPhpOption>,
    #[serde(rename = "has_php_selector", default, deserialize_with = "lenient_string")]
    pub php_selector_enabled: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhpOption {
    #[serde(rename = "value", default, deserialize_with = "lenient_string")]
    pub index: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub selected: String,
    #[serde(rename = "text", default, deserialize_with = "lenient_string")]
    pub version: String,
}

/// One PHP version slot a domain can be switched to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhpVersion {
    /// What [`set_php_version`](crate::UserContext::set_php_version) expects.
    pub id: String,
    pub selected: bool,
    /// Label shown in the panel.
    pub text: String,
    pub version: String,
}

/// The PHP part of the `action=view` body: selector options keyed by slot
/// index from `"0"`, and the version installed in each slot, numbered from 1.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhpVersions {
    #[serde(rename = "php1_select", default)]
    pub options: BTreeMap<String, RawPhpOption>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub php1_ver: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub php2_ver: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub php3_ver: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub php4_ver: String,
}

impl RawPhpVersions {
    /// Versions in slot order.
    pub fn into_versions(self) -> Vec<PhpVersion> {
        let installed = [self.php1_ver, self.php2_ver, self.php3_ver, self.php4_ver];
        let mut slots: Vec<(i64, RawPhpOption)> = self
            .options
            .into_iter()
            .map(|(slot, option)| (number_from_str(&slot), option))
            .collect();
        slots.sort_by_key(|(slot, _)| *slot);

        slots
            .into_iter()
            .map(|(slot, option)| {
                let id = if option.index.is_empty() {
                    (slot + 1).to_string()
                } else {
                    option.index
                };
                let version = usize::try_from(slot)
                    .ok()
                    .and_then(|slot| installed.get(slot))
                    .cloned()
                    .unwrap_or_default();
                PhpVersion {
                    id,
                    selected: parse_flag(&option.selected),
                    text: option.version,
                    version,
                }
            })
            .collect()
    }
}

impl From<RawDomain> for Domain {
    fn from(raw: RawDomain) -> Self {
        let php_version = raw
            .extra
            .php_options
            .values()
            .find(|option| option.selected == "yes")
            .map(|option| option.version.clone())
            .unwrap_or_default();

        Domain {
            active: parse_flag(&raw.active),
            bandwidth_quota: parse_number(&raw.bandwidth_quota),
            bandwidth_usage: parse_number(&raw.bandwidth_usage),
            cgi_enabled: parse_flag(&raw.cgi_enabled),
            default_domain: parse_flag(&raw.default_domain),
            disk_quota: parse_number(&raw.disk_quota),
            disk_usage: parse_number(&raw.disk_usage),
            domain: raw.domain,
            ip_addresses: raw.ip_addresses,
            mod_security_enabled: parse_flag(&raw.extra.mod_security_enabled),
            open_base_dir_enabled: parse_flag(&raw.open_base_dir_enabled),
            php_enabled: parse_flag(&raw.php_enabled),
            php_selector_enabled: parse_flag(&raw.extra.php_selector_enabled),
            php_version,
            safe_mode: parse_flag(&raw.safe_mode),
            ssl_enabled: parse_flag(&raw.ssl_enabled),
            subdomains: raw.subdomains,
            subdomain_usage: number_from_str(&raw.subdomain_usage),
            suspended: parse_flag(&raw.suspended),
            username: raw.username,
        }
    }
}

impl From<&Domain> for RawDomain {
    /// The PHP option map cannot be rebuilt from the selected version alone,
    /// so `extra.php_options` is always empty here.
    ///
    /// Unlimited bandwidth *usage* is written as `"0"`, the way the panel
    /// itself reports it. This is the one field where `UNLIMITED` does not
    /// map to a sentinel string.
    fn from(domain: &Domain) -> Self {
        let bandwidth_usage = if domain.bandwidth_usage == UNLIMITED {
            "0".to_string()
        } else {
            format_number(domain.bandwidth_usage, false)
        };

        RawDomain {
            active: format_yes_no(domain.active),
            bandwidth_quota: format_number(domain.bandwidth_quota, false),
            bandwidth_usage,
            cgi_enabled: format_on_off(domain.cgi_enabled),
            default_domain: format_yes_no(domain.default_domain),
            disk_quota: format_number(domain.disk_quota, false),
            disk_usage: format_number(domain.disk_usage, true),
            domain: domain.domain.clone(),
            ip_addresses: domain.ip_addresses.clone(),
            open_base_dir_enabled: format_on_off(domain.open_base_dir_enabled),
            php_enabled: format_on_off(domain.php_enabled),
            safe_mode: format_on_off(domain.safe_mode),
            ssl_enabled: format_on_off(domain.ssl_enabled),
            subdomains: domain.subdomains.clone(),
            subdomain_usage: domain.subdomain_usage.to_string(),
            suspended: format_yes_no(domain.suspended),
            username: domain.username.clone(),
            extra: RawDomainExtra {
                mod_security_enabled: format_yes_no(domain.mod_security_enabled),
                php_options: BTreeMap::new(),
                php_selector_enabled: format_yes_no(domain.php_selector_enabled),
            },
        }
    }
}

/// A subdomain of an existing domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Subdomain {
    pub domain: String,
    pub php_version: String,
    pub public_html: String,
    pub subdomain: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw() -> RawDomain {
        let mut raw: RawDomain = serde_json::from_value(json!({
            "active": "yes",
            "bandwidth_limit": "unlimited",
            "bandwidth": "1024",
            "cgi": "ON",
            "defaultdomain": "yes",
            "quota_limit": "2048",
            "quota": "12",
            "domain": "example.com",
            "ips": ["10.0.0.1"],
            "open_basedir": "ON",
            "php": "ON",
            "safemode": "OFF",
            "ssl": "ON",
            "subdomain": "1",
            "suspended": "no",
            "username": "bob"
        }))
        .unwrap();
        raw.subdomains = vec!["www".to_string()];
        raw.extra = serde_json::from_value(json!({
            "modsecurity": "yes",
            "has_php_selector": "no",
            "php1_select": {
                "0": {"value": "1", "selected": "no", "text": "8.1"},
                "1": {"value": "2", "selected": "yes", "text": "8.2"}
            }
        }))
        .unwrap();
        raw
    }

    #[test]
    fn from_raw_translates_each_vocabulary() {
        let domain = Domain::from(raw());
        assert!(domain.active);
        assert_eq!(domain.bandwidth_quota, UNLIMITED);
        assert_eq!(domain.bandwidth_usage, 1024);
        assert!(domain.cgi_enabled);
        assert!(domain.default_domain);
        assert!(!domain.safe_mode);
        assert!(domain.mod_security_enabled);
        assert!(!domain.php_selector_enabled);
        assert_eq!(domain.php_version, "8.2");
        assert_eq!(domain.subdomain_usage, 1);
        assert_eq!(domain.ip_addresses, vec!["10.0.0.1".to_string()]);
    }

    #[test]
    fn round_trip_preserves_flat_fields() {
        let mut original = raw();
        let back = RawDomain::from(&Domain::from(original.clone()));
        original.extra.php_options.clear();
        assert_eq!(back, original);
    }

    #[test]
    fn unlimited_bandwidth_usage_is_written_as_zero() {
        let domain = Domain {
            bandwidth_usage: UNLIMITED,
            bandwidth_quota: UNLIMITED,
            ..Domain::default()
        };
        let raw = RawDomain::from(&domain);
        assert_eq!(raw.bandwidth_usage, "0");
        assert_eq!(raw.bandwidth_quota, "unlimited");
        assert_eq!(Domain::from(raw).bandwidth_usage, 0);
    }

    #[test]
    fn disk_usage_uses_empty_string_for_unlimited() {
        let domain = Domain {
            disk_usage: UNLIMITED,
            disk_quota: UNLIMITED,
            ..Domain::default()
        };
        let raw = RawDomain::from(&domain);
        assert_eq!(raw.disk_usage, "");
        assert_eq!(raw.disk_quota, "unlimited");
    }

    #[test]
    fn php_versions_pair_options_with_installed_slots() {
        let raw: RawPhpVersions = serde_json::from_value(json!({
            "php1_select": {
                "1": {"value": "2", "selected": "yes", "text": "PHP 8.2 (php-fpm)"},
                "0": {"value": "", "selected": "no", "text": "PHP 8.1 (php-fpm)"}
            },
            "php1_ver": "8.1",
            "php2_ver": "8.2"
        }))
        .unwrap();
        let versions = raw.into_versions();
        assert_eq!(versions.len(), 2);
        assert_eq!((versions[0].id.as_str(), versions[0].version.as_str()), ("1", "8.1"));
        assert!(!versions[0].selected);
        assert_eq!((versions[1].id.as_str(), versions[1].version.as_str()), ("2", "8.2"));
        assert!(versions[1].selected);
        assert_eq!(versions[1].text, "PHP 8.2 (php-fpm)");
    }
}
