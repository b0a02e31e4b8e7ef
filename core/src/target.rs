//! `MatchTarget` — the connection attributes a [`MatchRule`](crate::MatchRule) is evaluated against
//!
//! A target is a parsed URI plus the few attributes a URI cannot carry: an
//! explicit protocol tag and an abstract type (with optional authority) for
//! destinations that are named rather than addressed.
//!
//! Component accessors normalize once, here, so rules can compare without
//! re-parsing:
//!
//! | Component | Source |
//! |-----------|--------|
//! | scheme | `Url::scheme()` (always lower-case) |
//! | host | `Url::host_str()`, `None` when empty |
//! | port | explicit port, else the scheme's well-known default |
//! | user | user-name part of the user-info, `None` when empty |
//! | path | `Url::path()` |
//! | protocol | explicit tag, else the scheme |

use url::Url;

use crate::ConfigError;

/// Connection attributes to match rules against.
///
/// # Example
///
/// ```
/// use authctx::MatchTarget;
///
/// let target = MatchTarget::parse("ldap://alice@example.org:1389/ou=people").unwrap();
/// assert_eq!(target.scheme(), "ldap");
/// assert_eq!(target.host(), Some("example.org"));
/// assert_eq!(target.port(), Some(1389));
/// assert_eq!(target.user(), Some("alice"));
/// assert_eq!(target.protocol(), "ldap");
///
/// let tagged = target.with_protocol("remote+http");
/// assert_eq!(tagged.protocol(), "remote+http");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchTarget {
    uri: Url,
    protocol: Option<String>,
    abstract_type: Option<String>,
    abstract_type_authority: Option<String>,
}

impl MatchTarget {
    /// Create a target for the given URI.
    #[must_use]
    pub fn new(uri: Url) -> Self {
        Self {
            uri,
            protocol: None,
            abstract_type: None,
            abstract_type_authority: None,
        }
    }

    /// Parse a URI string into a target.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUri`] if the text is not an absolute URI.
    pub fn parse(uri: &str) -> Result<Self, ConfigError> {
        Url::parse(uri)
            .map(Self::new)
            .map_err(|e| ConfigError::InvalidUri {
                uri: uri.to_owned(),
                message: e.to_string(),
            })
    }

    /// Tag the target with an explicit protocol (builder pattern).
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = Some(protocol.into());
        self
    }

    /// Tag the target with an abstract type and optional authority (builder pattern).
    #[must_use]
    pub fn with_abstract_type(
        mut self,
        abstract_type: impl Into<String>,
        authority: Option<&str>,
    ) -> Self {
        self.abstract_type = Some(abstract_type.into());
        self.abstract_type_authority = authority.map(str::to_owned);
        self
    }

    /// The underlying URI.
    #[must_use]
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// URI scheme, lower-case.
    #[must_use]
    pub fn scheme(&self) -> &str {
        self.uri.scheme()
    }

    /// URI host, if any.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.uri.host_str().filter(|h| !h.is_empty())
    }

    /// Explicit port, or the well-known default for the scheme.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.uri.port_or_known_default()
    }

    /// User name from the URI's user-info, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        Some(self.uri.username()).filter(|u| !u.is_empty())
    }

    /// URI path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Protocol tag, falling back to the scheme.
    #[must_use]
    pub fn protocol(&self) -> &str {
        self.protocol.as_deref().unwrap_or_else(|| self.uri.scheme())
    }

    /// Abstract type, if tagged.
    #[must_use]
    pub fn abstract_type(&self) -> Option<&str> {
        self.abstract_type.as_deref()
    }

    /// Abstract type authority, if tagged.
    #[must_use]
    pub fn abstract_type_authority(&self) -> Option<&str> {
        self.abstract_type_authority.as_deref()
    }
}

impl From<Url> for MatchTarget {
    fn from(uri: Url) -> Self {
        Self::new(uri)
    }
}

impl From<&Url> for MatchTarget {
    fn from(uri: &Url) -> Self {
        Self::new(uri.clone())
    }
}

impl std::fmt::Display for MatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri.as_str())
    }
}
