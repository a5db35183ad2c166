use std::collections::BTreeMap;

use tracing::debug;

use super::push_indexed;
use crate::context::{fan_out, UserContext};
use crate::error::{Error, Result, ResultExt};
use crate::http::HttpMethod;
use crate::model::{Domain, PhpVersion, RawDomain, RawDomainExtra, RawPhpVersions, Subdomain};
use crate::translate::{format_yes_no, number_from_str};
use crate::transport::{Endpoint, Form, LegacyEnvelope};

/// Fields `create` and `modify` both accept.
fn domain_form(domain: &Domain) -> Form {
    let raw = RawDomain::from(domain);
    Form::new()
        .with("domain", raw.domain)
        .with("ubandwidth", raw.bandwidth_quota)
        .with("uquota", raw.disk_quota)
        .with("cgi", raw.cgi_enabled)
        .with("php", raw.php_enabled)
        .with("ssl", raw.ssl_enabled)
}

fn additional_domains() -> Endpoint {
    Endpoint::new("API_ADDITIONAL_DOMAINS").query("bytes", "yes")
}

impl UserContext {
    pub fn add_domain_ip(&self, domain: &str, ip: &str, create_dns_records: bool) -> Result<()> {
        let form = Form::new()
            .with("action", "multi_ip")
            .with("add", "yes")
            .with("domain", domain)
            .with("ip", ip)
            .with("dns", format_yes_no(create_dns_records));
        self.legacy_action("DOMAIN", &form, "add IP to domain", "IP Added")
    }

    /// Fails if the domain is already hosted anywhere on the server.
    pub fn check_domain_exists(&self, domain: &str) -> Result<()> {
        self.check_object_exists(&[("type", "domain"), ("value", domain)])
    }

    /// Create `domain`, then each of its subdomains in order.
    pub fn create_domain(&self, domain: &Domain) -> Result<()> {
        self.legacy_action(
            Endpoint::new("API_DOMAIN").query("action", "create"),
            &domain_form(domain),
            "create domain",
            "Domain Created",
        )?;

        for subdomain in &domain.subdomains {
            self.create_subdomain(&Subdomain {
                domain: domain.domain.clone(),
                subdomain: subdomain.clone(),
                ..Subdomain::default()
            })
            .with_context(|| format!("created domain, but failed to create subdomain {subdomain}"))?;
        }

        if let Some(cache) = self.cache() {
            cache.store_domain(domain);
        }
        Ok(())
    }

    pub fn delete_domains(&self, delete_data: bool, domains: &[&str]) -> Result<()> {
        let mut form = Form::new()
            .with("delete", "yes")
            .with("confirmed", "yes")
            .with("delete_data_aware", "yes")
            .with("delete_data", format_yes_no(delete_data));
        push_indexed(&mut form, "select", domains.iter().copied());

        self.legacy_action(
            Endpoint::new("API_DOMAIN").query("action", "select"),
            &form,
            "delete domain",
            "Domain Deletion Results",
        )?;

        if let Some(cache) = self.cache() {
            for domain in domains {
                cache.remove_domain(domain);
            }
        }
        Ok(())
    }

    pub fn get_domain(&self, name: &str) -> Result<Domain> {
        if let Some(domain) = self.cache().and_then(|cache| cache.domain(name)) {
            return Ok(domain);
        }

        let mut raw_domains: BTreeMap<String, RawDomain> =
            self.call_legacy(HttpMethod::Get, additional_domains().query("domain", name), None)?;
        let raw = raw_domains.remove(name).ok_or(Error::NotFound("domain"))?;

        let domain = self.complete_domain(raw)?;
        if let Some(cache) = self.cache() {
            cache.store_domain(&domain);
        }
        Ok(domain)
    }

    /// Every domain with its detail. Uncached domains are fetched
    /// concurrently.
    pub fn get_domains(&self) -> Result<Vec<Domain>> {
        let raw_domains: BTreeMap<String, RawDomain> = self
            .call_legacy(HttpMethod::Get, additional_domains(), None)
            .context("failed to get domains")?;
        if raw_domains.is_empty() {
            return Err(Error::NotFound("domains"));
        }

        let mut domains = Vec::with_capacity(raw_domains.len());
        let mut pending = Vec::new();
        for raw in raw_domains.into_values() {
            match self.cache().and_then(|cache| cache.domain(&raw.domain)) {
                Some(cached) => domains.push(cached),
                None => pending.push(raw),
            }
        }
        debug!(cached = domains.len(), fetching = pending.len(), "loading domains");

        let fetched = fan_out(&pending, |raw| self.complete_domain(raw.clone()))?;
        if let Some(cache) = self.cache() {
            for domain in &fetched {
                cache.store_domain(domain);
            }
        }
        domains.extend(fetched);
        Ok(domains)
    }

    /// Fill in subdomains and the `action=view` detail.
    fn complete_domain(&self, mut raw: RawDomain) -> Result<Domain> {
        raw.subdomains = if number_from_str(&raw.subdomain_usage) != 0 {
            self.list_subdomains(&raw.domain)?
        } else {
            Vec::new()
        };

        let view = additional_domains()
            .query("action", "view")
            .query("domain", raw.domain.as_str());
        raw.extra = self.call_legacy::<RawDomainExtra>(HttpMethod::Get, view, None)?;
        Ok(raw.into())
    }

    pub fn list_domains(&self) -> Result<Vec<String>> {
        let domains: Option<Vec<String>> =
            self.call_legacy(HttpMethod::Get, "API_SHOW_DOMAINS?bytes=yes", None)?;
        Ok(domains.unwrap_or_default())
    }

    pub fn set_default_domain(&self, domain: &str) -> Result<()> {
        let form = Form::new().with("select0", domain).with("default", "yes");
        self.legacy_action(
            Endpoint::new("API_DOMAIN").query("action", "select"),
            &form,
            "set default domain",
            "Your default domain has been set",
        )
    }

    pub fn update_domain(&self, domain: &Domain) -> Result<()> {
        self.legacy_action(
            Endpoint::new("API_DOMAIN").query("action", "modify"),
            &domain_form(domain),
            "update domain",
            "The domain has been modified",
        )?;
        if let Some(cache) = self.cache() {
            cache.remove_domain(&domain.domain);
        }
        Ok(())
    }

    /// The panel reports this one in `result`, not `success`.
    pub fn create_subdomain(&self, subdomain: &Subdomain) -> Result<()> {
        let form = Form::new()
            .with("domain", subdomain.domain.as_str())
            .with("subdomain", subdomain.subdomain.as_str());
        let envelope: LegacyEnvelope = self.call_legacy(
            HttpMethod::Post,
            Endpoint::new("API_SUBDOMAINS").query("action", "create"),
            Some(&form),
        )?;
        envelope.expect_result("create subdomain", "Subdomain created")
    }

    pub fn delete_subdomains(&self, delete_data: bool, domain: &str, subdomains: &[&str]) -> Result<()> {
        let mut form = Form::new()
            .with("domain", domain)
            .with("contents", format_yes_no(delete_data));
        push_indexed(&mut form, "select", subdomains.iter().copied());
        self.legacy_action(
            Endpoint::new("API_SUBDOMAINS").query("action", "delete"),
            &form,
            "delete subdomain",
            "Domain Deletion Results",
        )
    }

    pub fn list_subdomains(&self, domain: &str) -> Result<Vec<String>> {
        let endpoint = Endpoint::new("API_SUBDOMAINS")
            .query("bytes", "yes")
            .query("domain", domain);
        let subdomains: Option<Vec<String>> = self.call_legacy(HttpMethod::Get, endpoint, None)?;
        Ok(subdomains.unwrap_or_default())
    }

    /// PHP versions `domain` can run, in slot order.
    pub fn get_php_versions(&self, domain: &str) -> Result<Vec<PhpVersion>> {
        let view = Endpoint::new("API_ADDITIONAL_DOMAINS")
            .query("domain", domain)
            .query("action", "view");
        let raw: RawPhpVersions = self
            .call_legacy(HttpMethod::Get, view, None)
            .context("failed to get PHP versions")?;
        Ok(raw.into_versions())
    }

    /// Switch `domain` to the slot `version_id` names (see [`PhpVersion::id`]).
    pub fn set_php_version(&self, domain: &str, version_id: &str) -> Result<()> {
        let form = Form::new()
            .with("action", "php_selector")
            .with("domain", domain)
            .with("php1_select", version_id)
            .with("save", "yes");
        self.legacy_action("API_DOMAIN", &form, "set PHP version", "PHP versions saved")
    }

    /// Point a subdomain's document root at `public_html`.
    pub fn update_subdomain_root(&self, subdomain: &Subdomain) -> Result<()> {
        let form = Form::new()
            .with("domain", subdomain.domain.as_str())
            .with("subdomain", subdomain.subdomain.as_str())
            .with("public_html", subdomain.public_html.as_str());
        self.legacy_action(
            Endpoint::new("SUBDOMAIN").query("action", "document_root_override"),
            &form,
            "update subdomain root",
            "Success",
        )
    }
}
