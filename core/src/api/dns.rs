use std::collections::BTreeMap;

use serde::Deserialize;

use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::model::{DnsRecord, RawDnsRecord};
use crate::transport::{Endpoint, Form};

#[derive(Deserialize)]
struct RawDnsRecords {
    #[serde(default)]
    records: Vec<RawDnsRecord>,
}

fn record_form(domain: &str, record: &DnsRecord) -> Form {
    let raw = RawDnsRecord::from(record);
    Form::new()
        .with("domain", domain)
        .with("name", raw.name)
        .with("ttl", raw.ttl)
        .with("type", raw.kind)
        .with("value", raw.value)
}

impl UserContext {
    /// Fails if a record clashing on `check_field` (`name` or `value`)
    /// already exists.
    pub fn check_dns_record_exists(&self, check_field: &str, domain: &str, record: &DnsRecord) -> Result<()> {
        let mut query = vec![
            ("check", check_field),
            ("domain", domain),
            ("name", record.name.as_str()),
            ("record", record.kind.as_str()),
            ("type", "dns"),
            ("value", record.value.as_str()),
        ];
        if record.kind == "MX" {
            query.push(("mx_value", record.value.as_str()));
        }
        self.check_object_exists(&query)
    }

    pub fn create_dns_record(&self, domain: &str, record: &DnsRecord) -> Result<()> {
        self.legacy_action(
            Endpoint::new("API_DNS_CONTROL")
                .query("action", "add")
                .query("action_pointers", "yes"),
            &record_form(domain, record),
            "create dns record",
            "Record Added",
        )
    }

    /// Records are selected as `{type}recs{n}`, numbered per type.
    pub fn delete_dns_records(&self, domain: &str, records: &[DnsRecord]) -> Result<()> {
        let mut by_type: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for record in records {
            by_type.entry(record.selector_prefix()).or_default().push(record.selector());
        }

        let mut form = Form::new().with("domain", domain);
        for (prefix, selectors) in &by_type {
            super::push_indexed(&mut form, prefix, selectors.iter().map(String::as_str));
        }

        self.legacy_action(
            Endpoint::new("API_DNS_CONTROL")
                .query("action", "select")
                .query("delete", "yes"),
            &form,
            "delete dns records",
            "Records Deleted",
        )
    }

    pub fn get_dns_records(&self, domain: &str) -> Result<Vec<DnsRecord>> {
        let raw: RawDnsRecords = self.call_legacy(
            HttpMethod::Get,
            Endpoint::new("API_DNS_CONTROL").query("domain", domain),
            None,
        )?;
        if raw.records.is_empty() {
            return Err(Error::NotFound("dns records"));
        }
        Ok(raw.records.into_iter().map(DnsRecord::from).collect())
    }

    /// Replace `original` with `updated`.
    pub fn update_dns_record(&self, domain: &str, original: &DnsRecord, updated: &DnsRecord) -> Result<()> {
        let form = record_form(domain, updated)
            .with(format!("{}0", original.selector_prefix()), original.selector());
        self.legacy_action(
            Endpoint::new("API_DNS_CONTROL")
                .query("action", "edit")
                .query("action_pointers", "yes"),
            &form,
            "update dns record",
            "Record Edited",
        )
    }
}
