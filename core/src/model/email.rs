use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::translate::{lenient_string, number_from_value, parse_flag};

/// A mailbox on one of the account's domains.
///
/// `password` is only sent, never returned by the panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmailAccount {
    pub disk_quota: i64,
    pub disk_usage: i64,
    pub domain: String,
    pub password: String,
    pub send_quota: i64,
    pub send_usage: i64,
    pub suspended: bool,
    pub username: String,
}

/// `CMD_EMAIL_POP` body: one entry per mailbox plus an `info` summary entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawEmailAccounts {
    pub emails: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawEmailAccount {
    #[serde(deserialize_with = "lenient_string")]
    pub account: String,
    #[serde(deserialize_with = "lenient_string")]
    pub suspended: String,
    /// Either a bare counter or `{send_limit, sent}` depending on the
    /// endpoint that produced it.
    pub sent: Value,
    /// `{quota, usage}` on the listing endpoint.
    pub usage: Value,
}

impl RawEmailAccount {
    /// Translation needs the domain, which only the request carries.
    pub fn into_account(self, domain: &str) -> EmailAccount {
        let usage_field = |name: &str| self.usage.get(name).map(number_from_value).unwrap_or(0);
        let (send_quota, send_usage) = match &self.sent {
            Value::Object(sent) => (
                sent.get("send_limit").map(number_from_value).unwrap_or(0),
                sent.get("sent").map(number_from_value).unwrap_or(0),
            ),
            _ => (0, 0),
        };

        EmailAccount {
            disk_quota: usage_field("quota"),
            disk_usage: usage_field("usage"),
            domain: domain.to_string(),
            password: String::new(),
            send_quota,
            send_usage,
            suspended: parse_flag(&self.suspended),
            username: self.account,
        }
    }
}

impl RawEmailAccounts {
    /// Entries that fail to decode as an account are skipped along with the
    /// `info` summary.
    pub fn into_accounts(self, domain: &str) -> Vec<EmailAccount> {
        self.emails
            .into_iter()
            .filter(|(id, _)| id != "info")
            .filter_map(|(_, entry)| serde_json::from_value::<RawEmailAccount>(entry).ok())
            .map(|raw| raw.into_account(domain))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sent_object_and_string_shapes() {
        let raw: RawEmailAccounts = serde_json::from_value(json!({
            "emails": {
                "info": {"count": 2},
                "alice": {
                    "account": "alice",
                    "suspended": "no",
                    "sent": {"send_limit": "200", "sent": 7},
                    "usage": {"quota": "1048576", "usage": "2048"}
                },
                "bob": {
                    "account": "bob",
                    "suspended": "yes",
                    "sent": "3",
                    "usage": {"quota": "0", "usage": "0"}
                }
            }
        }))
        .unwrap();

        let accounts = raw.into_accounts("example.com");
        assert_eq!(accounts.len(), 2);

        let alice = &accounts[0];
        assert_eq!(alice.username, "alice");
        assert_eq!(alice.domain, "example.com");
        assert_eq!((alice.send_quota, alice.send_usage), (200, 7));
        assert_eq!((alice.disk_quota, alice.disk_usage), (1_048_576, 2048));
        assert!(!alice.suspended);

        let bob = &accounts[1];
        assert_eq!((bob.send_quota, bob.send_usage), (0, 0));
        assert!(bob.suspended);
    }
}
