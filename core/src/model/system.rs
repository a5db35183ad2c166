//! System and account-session payloads. Most decode straight from the
//! modern API; [`SysInfo`] is translated from its legacy [`RawSysInfo`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translate::{lenient_string, number_from_str, number_from_value};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BasicSysInfo {
    pub allow_password_reset: bool,
    pub hostname: String,
    pub languages: Vec<String>,
    pub license_error: String,
    pub license_trial: bool,
    pub license_valid: bool,
    pub otp_trust_days: i64,
    pub time: Option<DateTime<Utc>>,
}

/// The subset of `GET /api/session` callers act on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Session {
    pub allowed_commands: Vec<String>,
    pub config_features: ConfigFeatures,
    pub demo: bool,
    pub effective_role: String,
    pub effective_username: String,
    pub home_dir: String,
    pub login_as_dns_control: bool,
    pub real_username: String,
    pub selected_domain: String,
    #[serde(rename = "sessionID")]
    pub session_id: String,
    pub tickets_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigFeatures {
    #[serde(rename = "auth2FA")]
    pub auth_2fa: bool,
    pub clamav: bool,
    pub git: bool,
    pub inode: bool,
    #[serde(rename = "IPv6")]
    pub ipv6: bool,
    pub nginx: bool,
    pub nginx_proxy: bool,
    pub phpmyadmin: bool,
    pub redis: bool,
    pub roundcube: bool,
    pub security_questions: bool,
    pub webmail: bool,
    pub wordpress: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct License {
    pub expires: Option<DateTime<Utc>>,
    pub lid: i64,
    pub limits: LicenseLimits,
    pub name: String,
    pub pid: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: i64,
    pub usage: LicenseUsage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseLimits {
    pub legacy: bool,
    pub max_admins_or_resellers: i64,
    pub max_domains: i64,
    pub max_users: i64,
    #[serde(rename = "onlyVPS")]
    pub only_vps: bool,
    pub pro_pack: bool,
    pub trial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LicenseUsage {
    pub admins_or_resellers: i64,
    pub domains: i64,
    pub users: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub from: String,
    pub from_name: String,
    pub id: i64,
    #[serde(rename = "legacyID")]
    pub legacy_id: String,
    pub message: String,
    pub subject: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub unread: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginHistory {
    pub attempts: i64,
    pub host: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// A one-click login URL. Sent on creation and filled in from the reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginKeyUrl {
    pub allow_networks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
    pub id: String,
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    pub url: String,
}

/// An installed panel plugin and where it hooks into the menu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plugin {
    pub id: String,
    pub role: String,
    pub menu_entry: PluginMenuEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginMenuEntry {
    pub title: String,
    pub url: String,
    pub icon: String,
}

/// Host health as reported by `CMD_API_SYSTEM_INFO`.
///
/// `memory` keeps the kernel's `/proc/meminfo` names (`MemTotal`,
/// `Active(anon)`, ...) as keys, with values in kB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SysInfo {
    pub cpu_count: i64,
    pub cpus: Vec<Cpu>,
    pub system_load: SystemLoad,
    pub memory: BTreeMap<String, i64>,
    pub services: BTreeMap<String, Service>,
    pub uptime: Uptime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cpu {
    pub mhz: f64,
    pub model: String,
    pub vendor: String,
}

/// Load averages, verbatim from the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemLoad {
    pub last_1_minute: String,
    pub last_5_minutes: String,
    pub last_15_minutes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Service {
    pub name: String,
    /// Human-readable state, e.g. "running".
    pub status: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Uptime {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub total_seconds: i64,
    /// Preformatted by the panel.
    pub uptime: String,
}

/// `CMD_API_SYSTEM_INFO` body. CPUs are keyed by their index as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawSysInfo {
    pub cpus: BTreeMap<String, RawCpu>,
    pub load: RawLoad,
    pub mem_info: BTreeMap<String, Value>,
    #[serde(deserialize_with = "lenient_string")]
    pub numcpus: String,
    pub services: BTreeMap<String, RawService>,
    pub uptime_info: RawUptime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawCpu {
    #[serde(deserialize_with = "lenient_string")]
    pub mhz: String,
    #[serde(deserialize_with = "lenient_string")]
    pub model_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub vendor_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawLoad {
    #[serde(deserialize_with = "lenient_string")]
    pub load_1: String,
    #[serde(deserialize_with = "lenient_string")]
    pub load_5: String,
    #[serde(deserialize_with = "lenient_string")]
    pub load_15: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawService {
    #[serde(deserialize_with = "lenient_string")]
    pub info_str: String,
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawUptime {
    #[serde(deserialize_with = "lenient_string")]
    pub days: String,
    #[serde(deserialize_with = "lenient_string")]
    pub hours: String,
    #[serde(deserialize_with = "lenient_string")]
    pub minutes: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total_seconds: String,
    #[serde(deserialize_with = "lenient_string")]
    pub uptime: String,
}

impl From<RawSysInfo> for SysInfo {
    fn from(raw: RawSysInfo) -> Self {
        // Order by numeric index so "10" follows "9".
        let mut cpus: Vec<(i64, RawCpu)> = raw
            .cpus
            .into_iter()
            .map(|(index, cpu)| (number_from_str(&index), cpu))
            .collect();
        cpus.sort_by_key(|(index, _)| *index);

        SysInfo {
            cpu_count: number_from_str(&raw.numcpus),
            cpus: cpus
                .into_iter()
                .map(|(_, cpu)| Cpu {
                    mhz: cpu.mhz.trim().parse().unwrap_or(0.0),
                    model: cpu.model_name,
                    vendor: cpu.vendor_id,
                })
                .collect(),
            system_load: SystemLoad {
                last_1_minute: raw.load.load_1,
                last_5_minutes: raw.load.load_5,
                last_15_minutes: raw.load.load_15,
            },
            memory: raw
                .mem_info
                .iter()
                .map(|(key, value)| (key.clone(), number_from_value(value)))
                .collect(),
            services: raw
                .services
                .into_iter()
                .map(|(id, service)| {
                    let service = Service {
                        name: service.name,
                        status: service.info_str,
                        version: service.version,
                    };
                    (id, service)
                })
                .collect(),
            uptime: Uptime {
                days: number_from_str(&raw.uptime_info.days),
                hours: number_from_str(&raw.uptime_info.hours),
                minutes: number_from_str(&raw.uptime_info.minutes),
                total_seconds: number_from_str(&raw.uptime_info.total_seconds),
                uptime: raw.uptime_info.uptime,
            },
        }
    }
}

impl From<&SysInfo> for RawSysInfo {
    fn from(info: &SysInfo) -> Self {
        RawSysInfo {
            cpus: info
                .cpus
                .iter()
                .enumerate()
                .map(|(index, cpu)| {
                    let raw = RawCpu {
                        mhz: cpu.mhz.to_string(),
                        model_name: cpu.model.clone(),
                        vendor_id: cpu.vendor.clone(),
                    };
                    (index.to_string(), raw)
                })
                .collect(),
            load: RawLoad {
                load_1: info.system_load.last_1_minute.clone(),
                load_5: info.system_load.last_5_minutes.clone(),
                load_15: info.system_load.last_15_minutes.clone(),
            },
            mem_info: info
                .memory
                .iter()
                .map(|(key, kb)| (key.clone(), Value::String(kb.to_string())))
                .collect(),
            numcpus: info.cpu_count.to_string(),
            services: info
                .services
                .iter()
                .map(|(id, service)| {
                    let raw = RawService {
                        info_str: service.status.clone(),
                        name: service.name.clone(),
                        version: service.version.clone(),
                    };
                    (id.clone(), raw)
                })
                .collect(),
            uptime_info: RawUptime {
                days: info.uptime.days.to_string(),
                hours: info.uptime.hours.to_string(),
                minutes: info.uptime.minutes.to_string(),
                total_seconds: info.uptime.total_seconds.to_string(),
                uptime: info.uptime.uptime.clone(),
            },
        }
    }
}
