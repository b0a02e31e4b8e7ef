//! `HostMatch` — how a rule constrains the target host
//!
//! Host names are case-insensitive, so every strategy compares without regard
//! to case. Patterns use the `regex` crate (RE2 semantics, linear time) and are
//! compiled case-insensitively.

use std::fmt;

use crate::{ConfigError, MAX_PATTERN_LENGTH, MAX_REGEX_PATTERN_LENGTH};

/// Host constraint of a [`MatchRule`](crate::MatchRule).
///
/// # Example
///
/// ```
/// use authctx::HostMatch;
///
/// let exact = HostMatch::exact("Example.org");
/// assert!(exact.matches("example.ORG"));
///
/// let domain = HostMatch::domain("example.org");
/// assert!(domain.matches("example.org"));
/// assert!(domain.matches("ldap.example.org"));
/// assert!(!domain.matches("badexample.org"));
///
/// let pattern = HostMatch::pattern(r"^node-\d+\.cluster$").unwrap();
/// assert!(pattern.matches("node-7.cluster"));
/// ```
#[derive(Debug, Clone)]
pub enum HostMatch {
    /// Host equals the value, ignoring ASCII case.
    Exact(String),
    /// Host equals the domain or is a sub-domain of it.
    Domain(String),
    /// Host matches a regular expression.
    Pattern(regex::Regex),
}

impl HostMatch {
    /// Exact host match.
    #[must_use]
    pub fn exact(host: impl Into<String>) -> Self {
        Self::Exact(host.into().to_ascii_lowercase())
    }

    /// Domain match: the domain itself or any host beneath it.
    ///
    /// Leading dots are ignored. A domain with no labels left matches nothing.
    #[must_use]
    pub fn domain(domain: impl Into<String>) -> Self {
        let domain = domain.into().to_ascii_lowercase();
        Self::Domain(domain.trim_start_matches('.').to_owned())
    }

    /// Regular expression match.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PatternTooLong`] if the pattern exceeds
    /// [`MAX_REGEX_PATTERN_LENGTH`], or [`ConfigError::InvalidPattern`] if it
    /// fails to compile.
    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        if pattern.len() > MAX_REGEX_PATTERN_LENGTH {
            return Err(ConfigError::PatternTooLong {
                len: pattern.len(),
                max: MAX_REGEX_PATTERN_LENGTH,
            });
        }
        regex::RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map(Self::Pattern)
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_owned(),
                message: e.to_string(),
            })
    }

    /// Check a literal value against [`MAX_PATTERN_LENGTH`].
    #[cfg_attr(not(feature = "registry"), allow(dead_code))]
    pub(crate) fn check_literal(value: &str) -> Result<(), ConfigError> {
        if value.len() > MAX_PATTERN_LENGTH {
            return Err(ConfigError::PatternTooLong {
                len: value.len(),
                max: MAX_PATTERN_LENGTH,
            });
        }
        Ok(())
    }

    /// Check if the given host satisfies this constraint.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(expected) => host.eq_ignore_ascii_case(expected),
            Self::Domain(domain) => {
                if domain.is_empty() {
                    return false;
                }
                if host.eq_ignore_ascii_case(domain) {
                    return true;
                }
                // "a.example.org" is beneath "example.org"; "aexample.org" is not
                host.len() > domain.len() + 1
                    && host.is_char_boundary(host.len() - domain.len() - 1)
                    && host[host.len() - domain.len() - 1..].starts_with('.')
                    && host[host.len() - domain.len()..].eq_ignore_ascii_case(domain)
            }
            Self::Pattern(re) => re.is_match(host),
        }
    }
}

impl PartialEq for HostMatch {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) | (Self::Domain(a), Self::Domain(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for HostMatch {}

impl fmt::Display for HostMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "Exact(\"{v}\")"),
            Self::Domain(v) => write!(f, "Domain(\"{v}\")"),
            Self::Pattern(re) => write!(f, "Pattern(\"{}\")", re.as_str()),
        }
    }
}
