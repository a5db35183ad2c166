use crate::context::UserContext;
use crate::error::{Error, Result};
use crate::transport::Form;

use super::push_indexed;

impl UserContext {
    /// Request a Let's Encrypt certificate for `domain` covering every name
    /// in `hostnames`. The first hostname becomes the certificate's common
    /// name.
    pub fn issue_ssl(&self, domain: &str, hostnames: &[&str]) -> Result<()> {
        let Some(common_name) = hostnames.first() else {
            return Err(Error::InvalidInput(
                "at least one hostname is required for the certificate".to_string(),
            ));
        };
        let mut form = Form::new()
            .with("action", "save")
            .with("type", "create")
            .with("request", "letsencrypt")
            .with("acme_provider", "letsencrypt")
            .with("name", *common_name)
            .with("domain", domain)
            .with("keysize", "secp384r1")
            .with("encryption", "sha256")
            .with("wildcard", "no")
            .with("background", "auto");
        push_indexed(&mut form, "le_select", hostnames.iter().copied());
        self.legacy_action("API_SSL", &form, "issue SSL certificate", "Certificate and Key Saved.")
    }
}

#[cfg(test)]
mod tests {
    use url::form_urlencoded;

    use crate::context::tests::{backend_for, user_context};
    use crate::error::Error;

    #[test]
    fn certificate_covers_every_hostname() {
        let backend = backend_for("user", "bob");
        backend.route("CMD_API_SSL", 200, r#"{"success":"Certificate and Key Saved."}"#);
        user_context(&backend)
            .issue_ssl("example.com", &["example.com", "www.example.com"])
            .unwrap();

        let body = backend.last_request().body.unwrap();
        let pairs: Vec<(String, String)> = form_urlencoded::parse(&body).into_owned().collect();
        let value = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
        assert_eq!(value("name"), Some("example.com"));
        assert_eq!(value("le_select0"), Some("example.com"));
        assert_eq!(value("le_select1"), Some("www.example.com"));
        assert_eq!(value("request"), Some("letsencrypt"));
    }

    #[test]
    fn no_hostnames_is_rejected_locally() {
        let backend = backend_for("user", "bob");
        let context = user_context(&backend);
        let before = backend.requests().len();

        let err = context.issue_ssl("example.com", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(backend.requests().len(), before);
    }
}
