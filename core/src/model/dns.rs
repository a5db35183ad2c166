use serde::{Deserialize, Serialize};

use crate::translate::{lenient_string, number_from_str};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsRecord {
    pub name: String,
    pub ttl: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDnsRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ttl: String,
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
}

impl From<RawDnsRecord> for DnsRecord {
    fn from(raw: RawDnsRecord) -> Self {
        DnsRecord {
            name: raw.name,
            ttl: number_from_str(&raw.ttl),
            kind: raw.kind,
            value: raw.value,
        }
    }
}

impl From<&DnsRecord> for RawDnsRecord {
    fn from(record: &DnsRecord) -> Self {
        RawDnsRecord {
            name: record.name.clone(),
            ttl: record.ttl.to_string(),
            kind: record.kind.clone(),
            value: record.value.clone(),
        }
    }
}

impl DnsRecord {
    /// The `{type}recs{n}` selector value the legacy DNS endpoint uses to
    /// identify an existing record.
    pub(crate) fn selector(&self) -> String {
        format!("name={}&value={}", self.name, self.value)
    }

    pub(crate) fn selector_prefix(&self) -> String {
        format!("{}recs", self.kind.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_lenient() {
        let raw: RawDnsRecord =
            serde_json::from_str(r#"{"name":"www","ttl":3600,"type":"A","value":"10.0.0.1"}"#).unwrap();
        let record = DnsRecord::from(raw.clone());
        assert_eq!(record.ttl, 3600);
        assert_eq!(RawDnsRecord::from(&record), RawDnsRecord { ttl: "3600".to_string(), ..raw });
    }

    #[test]
    fn selector_matches_legacy_format() {
        let record = DnsRecord {
            name: "mail".to_string(),
            ttl: 0,
            kind: "MX".to_string(),
            value: "10 mail.example.com.".to_string(),
        };
        assert_eq!(record.selector_prefix(), "mxrecs");
        assert_eq!(record.selector(), "name=mail&value=10 mail.example.com.");
    }
}
