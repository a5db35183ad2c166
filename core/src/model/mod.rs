//! Raw (wire-shaped) and public (typed) entities.
//!
//! # Design
//! Each entity that round-trips through the legacy protocol has a `Raw*`
//! struct whose field names and string types match the wire exactly, and a
//! public struct with `bool` flags and `i64` quotas where
//! [`UNLIMITED`](crate::translate::UNLIMITED) means no limit. Conversions are
//! `From` impls in both directions, and `from(into(raw)) == raw` holds for
//! canonical wire input except where a field's docs name a lossy quirk.
//!
//! Modern (`/api/*`) payloads are already typed JSON and decode straight into
//! the public structs, which is why those structs derive `Deserialize` with
//! camelCase names.

pub mod database;
pub mod dns;
pub mod domain;
pub mod email;
pub mod file;
pub mod package;
pub mod system;
pub mod user;
pub mod wordpress;

pub use database::{Database, DatabaseProcess, DatabaseUser, DatabaseWithUser};
pub use dns::{DnsRecord, RawDnsRecord};
pub use domain::{
    Domain, PhpVersion, RawDomain, RawDomainExtra, RawPhpOption, RawPhpVersions, Subdomain,
};
pub use email::{EmailAccount, RawEmailAccount, RawEmailAccounts};
pub use file::{FileMetadata, Symlink};
pub use package::{Package, RawPackage, RawResellerPackage, ResellerPackage};
pub use system::{
    BasicSysInfo, ConfigFeatures, Cpu, License, LicenseLimits, LicenseUsage, LoginHistory,
    LoginKeyUrl, Message, Plugin, PluginMenuEntry, RawCpu, RawLoad, RawService, RawSysInfo, RawUptime, Service, Session,
    SysInfo, SystemLoad, Uptime,
};
pub use user::{
    DomainUsage, RawUserConfig, RawUserUsage, Role, User, UserConfig, UserUsage, ROLE_ADMIN,
    ROLE_RESELLER, ROLE_USER,
};
pub use wordpress::{
    WordPressInstall, WordPressInstallQuick, WordPressLocation, WordPressSite, WordPressUser,
};
