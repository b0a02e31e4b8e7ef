//! Error types.
//!
//! Each concern gets its own enum so callers can tell a bad index from a bad
//! config file from a collaborator that failed mid-handshake:
//!
//! | Error | Raised by | When |
//! |-------|-----------|------|
//! | [`ContextError`] | positional context operations | index outside the valid bound |
//! | [`ConfigError`] | rule construction, registry loading | load time, never at resolution |
//! | [`ClientError`] | [`ConfigurationClient`](crate::ConfigurationClient) | permission check, address resolution, connect |
//! | [`SaslError`], [`CallbackError`], [`CredentialError`], [`SslError`] | collaborators | propagated unchanged |
//! | [`ActionError`] | [`AuthenticationContext::try_run_with`](crate::AuthenticationContext::try_run_with) | wraps the action's failure |
//!
//! A rule list with no matching rule is not an error: resolution falls back to
//! the empty configuration.

use std::error::Error as StdError;

/// Boxed error used when a collaborator's concrete failure type is erased.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors from positional [`AuthenticationContext`](crate::AuthenticationContext) operations.
///
/// Contexts are immutable, so a failed operation never leaves a partially
/// updated value behind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// The index is outside the bound accepted by the operation.
    #[error("index {index} is out of range for a context with {len} rules")]
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// Number of rules in the context the operation was applied to.
        len: usize,
    },
}

/// Errors from rule construction and config loading.
///
/// These are caught at load time. Fix the configuration and load again.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A host pattern failed to compile.
    #[error("invalid pattern \"{pattern}\": {message}")]
    InvalidPattern {
        /// The pattern that failed to compile.
        pattern: String,
        /// The underlying error message.
        message: String,
    },
    /// Configuration deserialization or construction failed.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// The underlying error message.
        message: String,
    },
    /// A URI could not be parsed.
    #[error("invalid URI \"{uri}\": {message}")]
    InvalidUri {
        /// The text that failed to parse.
        uri: String,
        /// The underlying error message.
        message: String,
    },
    /// A type URL was not found in the registry.
    #[error("unknown {registry} type URL \"{type_url}\"{}", available_suffix(.registry, .available))]
    UnknownTypeUrl {
        /// The unregistered type URL.
        type_url: String,
        /// Which registry was searched (`"credentials"` or `"ssl"`).
        registry: &'static str,
        /// Type URLs that ARE registered.
        available: Vec<String>,
    },
    /// Too many rules in a single context config.
    #[error("context has {count} rules, but maximum allowed is {max}")]
    TooManyRules {
        /// Actual count of rules.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },
    /// A match pattern exceeds the maximum allowed length.
    #[error("pattern length is {len}, but maximum allowed is {max}")]
    PatternTooLong {
        /// Actual length of the pattern.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },
}

fn available_suffix(registry: &str, available: &[String]) -> String {
    if available.is_empty() {
        format!(" — no {registry} types are registered")
    } else {
        let mut sorted = available.to_vec();
        sorted.sort_unstable();
        format!(" — registered: {}", sorted.join(", "))
    }
}

/// Errors from [`ConfigurationClient`](crate::ConfigurationClient).
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The installed security policy refused the permission.
    #[error("permission \"{permission}\" denied")]
    PermissionDenied {
        /// The permission that was checked.
        permission: &'static str,
    },
    /// Neither the configuration nor the URI names a destination host.
    #[error("no destination host for \"{uri}\"")]
    MissingHost {
        /// The URI being resolved.
        uri: String,
    },
    /// Host name resolution produced no address.
    #[error("could not resolve {host}:{port}")]
    UnresolvedAddress {
        /// The host that was looked up.
        host: String,
        /// The port that was requested.
        port: u16,
    },
    /// The configuration carries no SSL context factory.
    #[error("no SSL context is configured")]
    SslUnavailable,
    /// The SSL context factory failed.
    #[error(transparent)]
    Ssl(#[from] SslError),
    /// Socket-level failure (lookup or connect).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure reported by a SASL mechanism collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SaslError {
    /// The mechanism rejected the exchange.
    #[error("SASL mechanism {mechanism} failed: {message}")]
    Mechanism {
        /// Mechanism name.
        mechanism: String,
        /// What went wrong.
        message: String,
    },
    /// A callback needed by the mechanism could not be answered.
    #[error(transparent)]
    Callback(#[from] CallbackError),
    /// Any other collaborator failure.
    #[error("{0}")]
    Other(#[source] BoxError),
}

/// Failure answering an authentication callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The handler does not know how to answer this callback.
    #[error("unsupported callback: {kind}")]
    Unsupported {
        /// Kind of callback that was offered.
        kind: &'static str,
    },
    /// The credential source failed while answering.
    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Failure reported by a credential source.
#[derive(Debug, thiserror::Error)]
#[error("credential source failed: {message}")]
pub struct CredentialError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CredentialError {
    /// Create a credential error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a credential error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Failure reported by an SSL context factory.
#[derive(Debug, thiserror::Error)]
#[error("SSL context creation failed: {message}")]
pub struct SslError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SslError {
    /// Create an SSL error with a message only.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create an SSL error wrapping an underlying cause.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Wrapper for failures raised by an action run through
/// [`AuthenticationContext::try_run_with`](crate::AuthenticationContext::try_run_with).
///
/// The original failure is kept as [`source()`](std::error::Error::source).
#[derive(Debug, thiserror::Error)]
#[error("action failed: {source}")]
pub struct ActionError {
    #[source]
    source: BoxError,
}

impl ActionError {
    /// Wrap a failure.
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// Borrow the wrapped failure.
    #[must_use]
    pub fn cause(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.source
    }

    /// Unwrap into the original failure.
    #[must_use]
    pub fn into_cause(self) -> BoxError {
        self.source
    }
}
