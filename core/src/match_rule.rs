//! `MatchRule` — conjunctive predicate over connection attributes
//!
//! A rule is a set of optional constraints. It matches a [`MatchTarget`] iff
//! every constraint it sets holds; unset constraints impose nothing, so
//! [`MatchRule::ALL`] matches every target.
//!
//! Rules carry no priority of their own. Ordering comes from their position
//! in an [`AuthenticationContext`](crate::AuthenticationContext).

use std::fmt;

use crate::{ConfigError, HostMatch, MatchTarget, RuleAttribute, RuleTrace};

/// Predicate deciding whether a configuration applies to a target.
///
/// Every `match_*` method returns a new rule; the receiver is unchanged.
///
/// # Example
///
/// ```
/// use authctx::{MatchRule, MatchTarget};
///
/// let rule = MatchRule::ALL
///     .match_scheme("ldap")
///     .match_domain("example.org")
///     .match_path("/ou=people");
///
/// assert!(rule.matches(&MatchTarget::parse("ldap://ds.example.org/ou=people/uid=1").unwrap()));
/// assert!(!rule.matches(&MatchTarget::parse("ldaps://ds.example.org/ou=people").unwrap()));
/// assert!(!rule.matches(&MatchTarget::parse("ldap://ds.example.org/ou=peoplex").unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchRule {
    scheme: Option<String>,
    host: Option<HostMatch>,
    port: Option<u16>,
    user: Option<String>,
    path: Option<String>,
    protocol: Option<String>,
    abstract_type: Option<String>,
    abstract_type_authority: Option<String>,
}

impl MatchRule {
    /// The rule with no constraints; matches every target.
    pub const ALL: MatchRule = MatchRule {
        scheme: None,
        host: None,
        port: None,
        user: None,
        path: None,
        protocol: None,
        abstract_type: None,
        abstract_type_authority: None,
    };

    /// Require the URI scheme to equal `scheme` (ASCII case-insensitive).
    #[must_use]
    pub fn match_scheme(&self, scheme: impl Into<String>) -> Self {
        Self {
            scheme: Some(scheme.into().to_ascii_lowercase()),
            ..self.clone()
        }
    }

    /// Require the host to equal `host` (ASCII case-insensitive).
    #[must_use]
    pub fn match_host(&self, host: impl Into<String>) -> Self {
        self.with_host(HostMatch::exact(host))
    }

    /// Require the host to be `domain` or a sub-domain of it.
    #[must_use]
    pub fn match_domain(&self, domain: impl Into<String>) -> Self {
        self.with_host(HostMatch::domain(domain))
    }

    /// Require the host to match a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] or [`ConfigError::PatternTooLong`].
    pub fn match_host_pattern(&self, pattern: &str) -> Result<Self, ConfigError> {
        Ok(self.with_host(HostMatch::pattern(pattern)?))
    }

    /// Replace the host constraint.
    #[must_use]
    pub fn with_host(&self, host: HostMatch) -> Self {
        Self {
            host: Some(host),
            ..self.clone()
        }
    }

    /// Require the port (explicit, or the scheme's well-known default) to equal `port`.
    #[must_use]
    pub fn match_port(&self, port: u16) -> Self {
        Self {
            port: Some(port),
            ..self.clone()
        }
    }

    /// Require the user-info user name to equal `user`.
    #[must_use]
    pub fn match_user(&self, user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            ..self.clone()
        }
    }

    /// Require the path to be `path` or lie beneath it.
    ///
    /// Matching respects segment boundaries: `/app` matches `/app` and
    /// `/app/x` but not `/apple`.
    #[must_use]
    pub fn match_path(&self, path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..self.clone()
        }
    }

    /// Require the target protocol tag (or scheme, when untagged) to equal `protocol`.
    #[must_use]
    pub fn match_protocol(&self, protocol: impl Into<String>) -> Self {
        Self {
            protocol: Some(protocol.into()),
            ..self.clone()
        }
    }

    /// Require the target's abstract type, and optionally its authority.
    #[must_use]
    pub fn match_abstract_type(
        &self,
        abstract_type: impl Into<String>,
        authority: Option<&str>,
    ) -> Self {
        Self {
            abstract_type: Some(abstract_type.into()),
            abstract_type_authority: authority.map(str::to_owned),
            ..self.clone()
        }
    }

    /// Returns `true` if the rule sets no constraint.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self == &Self::ALL
    }

    /// Scheme constraint, if any.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    /// Host constraint, if any.
    #[must_use]
    pub fn host(&self) -> Option<&HostMatch> {
        self.host.as_ref()
    }

    /// Port constraint, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// User constraint, if any.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Path constraint, if any.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Protocol constraint, if any.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Abstract type constraint, if any.
    #[must_use]
    pub fn abstract_type(&self) -> Option<&str> {
        self.abstract_type.as_deref()
    }

    /// Abstract type authority constraint, if any.
    #[must_use]
    pub fn abstract_type_authority(&self) -> Option<&str> {
        self.abstract_type_authority.as_deref()
    }

    /// Evaluate the rule against a target.
    ///
    /// Short-circuits on the first failing constraint.
    #[must_use]
    pub fn matches(&self, target: &MatchTarget) -> bool {
        self.first_mismatch(target).is_none()
    }

    /// Evaluate with a trace naming the first failing constraint.
    #[must_use]
    pub fn matches_with_trace(&self, target: &MatchTarget) -> RuleTrace {
        let failed = self.first_mismatch(target);
        RuleTrace {
            matched: failed.is_none(),
            failed,
            rule: self.to_string(),
        }
    }

    fn first_mismatch(&self, target: &MatchTarget) -> Option<RuleAttribute> {
        if let Some(scheme) = &self.scheme {
            if !target.scheme().eq_ignore_ascii_case(scheme) {
                return Some(RuleAttribute::Scheme);
            }
        }
        if let Some(host) = &self.host {
            // INV: a constraint on a missing component fails
            if !target.host().is_some_and(|h| host.matches(h)) {
                return Some(RuleAttribute::Host);
            }
        }
        if let Some(port) = self.port {
            if target.port() != Some(port) {
                return Some(RuleAttribute::Port);
            }
        }
        if let Some(user) = &self.user {
            if target.user() != Some(user.as_str()) {
                return Some(RuleAttribute::User);
            }
        }
        if let Some(path) = &self.path {
            if !path_matches(path, target.path()) {
                return Some(RuleAttribute::Path);
            }
        }
        if let Some(protocol) = &self.protocol {
            if target.protocol() != protocol {
                return Some(RuleAttribute::Protocol);
            }
        }
        if let Some(abstract_type) = &self.abstract_type {
            let type_ok = target.abstract_type() == Some(abstract_type.as_str());
            let authority_ok = self
                .abstract_type_authority
                .as_deref()
                .map_or(true, |a| target.abstract_type_authority() == Some(a));
            if !(type_ok && authority_ok) {
                return Some(RuleAttribute::AbstractType);
            }
        }
        None
    }
}

fn path_matches(prefix: &str, path: &str) -> bool {
    if prefix.is_empty() || prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unconstrained() {
            return f.write_str("ALL");
        }
        let mut parts: Vec<String> = Vec::new();
        if let Some(v) = &self.scheme {
            parts.push(format!("scheme={v}"));
        }
        if let Some(v) = &self.host {
            parts.push(format!("host={v}"));
        }
        if let Some(v) = self.port {
            parts.push(format!("port={v}"));
        }
        if let Some(v) = &self.user {
            parts.push(format!("user={v}"));
        }
        if let Some(v) = &self.path {
            parts.push(format!("path={v}"));
        }
        if let Some(v) = &self.protocol {
            parts.push(format!("protocol={v}"));
        }
        if let Some(v) = &self.abstract_type {
            match &self.abstract_type_authority {
                Some(a) => parts.push(format!("abstract_type={v}@{a}")),
                None => parts.push(format!("abstract_type={v}")),
            }
        }
        f.write_str(&parts.join(" "))
    }
}
