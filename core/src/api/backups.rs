//! Site backups through `CMD_SITE_BACKUP`. Creation and restore are queued
//! by the panel; both return once the job is accepted.

use crate::context::UserContext;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::transport::{Endpoint, Form};

use super::push_indexed;

/// Backup sections the panel can include in or restore from an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupItem {
    Domain,
    Subdomain,
    Email,
    EmailData,
    EmailSettings,
    Forwarder,
    Autoresponder,
    Vacation,
    List,
    Ftp,
    FtpSettings,
    Database,
    DatabaseData,
    Trash,
}

impl BackupItem {
    pub const ALL: [BackupItem; 14] = [
        BackupItem::Domain,
        BackupItem::Subdomain,
        BackupItem::Email,
        BackupItem::EmailData,
        BackupItem::EmailSettings,
        BackupItem::Forwarder,
        BackupItem::Autoresponder,
        BackupItem::Vacation,
        BackupItem::List,
        BackupItem::Ftp,
        BackupItem::FtpSettings,
        BackupItem::Database,
        BackupItem::DatabaseData,
        BackupItem::Trash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BackupItem::Domain => "domain",
            BackupItem::Subdomain => "subdomain",
            BackupItem::Email => "email",
            BackupItem::EmailData => "email_data",
            BackupItem::EmailSettings => "emailsettings",
            BackupItem::Forwarder => "forwarder",
            BackupItem::Autoresponder => "autoresponder",
            BackupItem::Vacation => "vacation",
            BackupItem::List => "list",
            BackupItem::Ftp => "ftp",
            BackupItem::FtpSettings => "ftpsettings",
            BackupItem::Database => "database",
            BackupItem::DatabaseData => "database_data",
            BackupItem::Trash => "trash",
        }
    }
}

// The panel versions these two forms independently.
const CREATE_FORM_VERSION: &str = "4";
const RESTORE_FORM_VERSION: &str = "3";

fn backup_form(action: &str, domain: &str, form_version: &str, items: &[BackupItem]) -> Form {
    let mut form = Form::new()
        .with("action", action)
        .with("domain", domain)
        .with("form_version", form_version);
    push_indexed(&mut form, "select", items.iter().map(|item| item.as_str()));
    form
}

impl UserContext {
    /// Queue a backup of `items` for `domain`.
    pub fn create_backup(&self, domain: &str, items: &[BackupItem]) -> Result<()> {
        self.legacy_action(
            "SITE_BACKUP",
            &backup_form("backup", domain, CREATE_FORM_VERSION, items),
            "create backup",
            "Backup creation added to queue",
        )
    }

    pub fn create_backup_all_items(&self, domain: &str) -> Result<()> {
        self.create_backup(domain, &BackupItem::ALL)
    }

    /// Archive file names for `domain`. The panel pages the list; only the
    /// first 50 are returned.
    pub fn get_backups(&self, domain: &str) -> Result<Vec<String>> {
        let endpoint = Endpoint::new("SITE_BACKUP")
            .query("domain", domain)
            .query("ipp", "50");
        let backups: Option<Vec<String>> = self.call_legacy(HttpMethod::Get, endpoint, None)?;
        Ok(backups.unwrap_or_default())
    }

    /// Queue a restore of `items` from the archive `file`.
    pub fn restore_backup(&self, domain: &str, file: &str, items: &[BackupItem]) -> Result<()> {
        let mut form = backup_form("restore", domain, RESTORE_FORM_VERSION, items);
        form.push("file", file);
        self.legacy_action(
            "SITE_BACKUP",
            &form,
            "restore backup",
            "Restore will run in the background",
        )
    }

    pub fn restore_backup_all_items(&self, domain: &str, file: &str) -> Result<()> {
        self.restore_backup(domain, file, &BackupItem::ALL)
    }
}
