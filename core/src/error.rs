//! Error types for the DirectAdmin client.
//!
//! # Design
//! One enum covers every layer. Transport and status failures come from the
//! sender, `Legacy` and `Modern` come from the two envelope conventions, and
//! `Unexpected` is raised one layer up when an operation's literal success
//! string does not match. `Context` lets each hop prefix a message without
//! losing the underlying variant.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by every client operation.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured base URL could not be parsed at all.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The configured base URL parsed but carries no host.
    #[error("invalid host provided, ensure that the host is a full URL e.g. https://your-ip-address:2222")]
    InvalidHost,

    /// The configured base URL uses a scheme other than http or https.
    #[error("invalid url scheme: {0}")]
    InvalidScheme(String),

    /// Connection, DNS, timeout, or body-read failure. Never retried.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a non-2xx status whose body was not a
    /// recognizable error envelope.
    #[error("HTTP {status}: {}", String::from_utf8_lossy(.body))]
    Status { status: u16, body: Vec<u8> },

    /// A legacy (`CMD_*`) envelope carried a non-empty `error` field.
    #[error("{error}: {result}")]
    Legacy { error: String, result: String },

    /// A modern (`/api/*`) error envelope on a non-2xx response.
    #[error("{}", modern_message(.kind, .message))]
    Modern { kind: String, message: String },

    /// The request succeeded at the protocol level but the panel did not
    /// answer with the success string the operation expects.
    #[error("failed to {operation}: {returned}")]
    Unexpected { operation: String, returned: String },

    /// Login verification did not answer "Login OK".
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The account's declared role differs from the role requested at login.
    #[error("account is not a {expected}, it is a {actual}")]
    RoleMismatch { expected: String, actual: String },

    /// The panel returned nothing where at least one item was required.
    #[error("no {0} could be found")]
    NotFound(&'static str),

    /// Caller input rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// One or more sub-calls of a concurrent fan-out failed.
    #[error("{}", aggregate_message(.0))]
    Aggregate(Vec<Error>),

    /// The request payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// Another error with a message prefix added by the calling layer.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap `self` with a prefix describing the operation that failed.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Builds an [`Error::Unexpected`] for a business-string mismatch.
    pub(crate) fn unexpected(operation: &str, returned: impl Into<String>) -> Self {
        Error::Unexpected {
            operation: operation.to_string(),
            returned: returned.into(),
        }
    }

    /// Strip any `Context` layers and return the innermost error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for adding a context prefix to any `Result<T, Error>`.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}

fn modern_message(kind: &str, message: &str) -> String {
    if message.is_empty() {
        kind.to_string()
    } else {
        format!("{kind}: {message}")
    }
}

fn aggregate_message(errors: &[Error]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("error {}: {e}", i + 1))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_error_joins_error_and_result() {
        let err = Error::Legacy {
            error: "Cannot Execute Your Request".to_string(),
            result: "Domain already exists".to_string(),
        };
        assert_eq!(err.to_string(), "Cannot Execute Your Request: Domain already exists");
    }

    #[test]
    fn modern_error_without_message_shows_type_only() {
        let err = Error::Modern {
            kind: "UNAUTHORIZED".to_string(),
            message: String::new(),
        };
        assert_eq!(err.to_string(), "UNAUTHORIZED");
    }

    #[test]
    fn aggregate_numbers_each_failure() {
        let err = Error::Aggregate(vec![
            Error::NotFound("domains"),
            Error::InvalidInput("bad".to_string()),
        ]);
        assert_eq!(
            err.to_string(),
            "error 1: no domains could be found; error 2: invalid input: bad"
        );
    }

    #[test]
    fn context_prefixes_and_root_unwraps() {
        let err = Error::NotFound("users").context("failed to get users");
        assert_eq!(err.to_string(), "failed to get users: no users could be found");
        assert!(matches!(err.root(), Error::NotFound("users")));
    }

    #[test]
    fn status_error_renders_body_lossily() {
        let err = Error::Status {
            status: 502,
            body: b"bad gateway".to_vec(),
        };
        assert_eq!(err.to_string(), "HTTP 502: bad gateway");
    }
}
