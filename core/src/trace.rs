//! Evaluation trace types for debugging rule resolution.
//!
//! Trace types mirror the runtime types ([`MatchRule`](crate::MatchRule),
//! [`AuthenticationContext`](crate::AuthenticationContext)) but capture
//! evaluation results instead of inputs. Use
//! [`AuthenticationContext::rule_matching_with_trace`](crate::AuthenticationContext::rule_matching_with_trace)
//! to see which rules were tried and why each one failed.
//!
//! # Example
//!
//! ```
//! use authctx::{AuthenticationConfiguration, AuthenticationContext, MatchRule, MatchTarget};
//!
//! let ctx = AuthenticationContext::empty()
//!     .with(MatchRule::ALL.match_scheme("ldaps"), AuthenticationConfiguration::empty())
//!     .with(MatchRule::ALL.match_host("example.org"), AuthenticationConfiguration::empty());
//!
//! let trace = ctx.rule_matching_with_trace(&MatchTarget::parse("ldap://example.org/").unwrap());
//! assert_eq!(trace.result, Some(1));
//! assert_eq!(trace.steps.len(), 2);
//! ```

use std::fmt;

/// The attribute of a [`MatchRule`](crate::MatchRule) that rejected a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum RuleAttribute {
    /// URI scheme.
    Scheme,
    /// URI host.
    Host,
    /// URI port (explicit or default).
    Port,
    /// User-info user name.
    User,
    /// URI path.
    Path,
    /// Protocol tag.
    Protocol,
    /// Abstract type and authority.
    AbstractType,
}

impl fmt::Display for RuleAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scheme => "scheme",
            Self::Host => "host",
            Self::Port => "port",
            Self::User => "user",
            Self::Path => "path",
            Self::Protocol => "protocol",
            Self::AbstractType => "abstract_type",
        })
    }
}

/// Trace of a single rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RuleTrace {
    /// Whether the rule matched.
    pub matched: bool,
    /// First attribute that failed; `None` when the rule matched.
    pub failed: Option<RuleAttribute>,
    /// Display form of the rule.
    pub rule: String,
}

/// One rule's evaluation in a context trace.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RuleStep {
    /// Position of the rule in the context (0-based).
    pub index: usize,
    /// Evaluation of that rule.
    pub trace: RuleTrace,
}

/// Trace of a full rule-list resolution.
///
/// # INV: `result` == `rule_matching()` result
///
/// Steps stop after the first match (preserves first-match-wins).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MatchTrace {
    /// Index of the matching rule, if any.
    pub result: Option<usize>,
    /// Every rule evaluated, in order.
    pub steps: Vec<RuleStep>,
}

impl fmt::Display for MatchTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            match step.trace.failed {
                None => writeln!(f, "  [{}] {} -> match", step.index, step.trace.rule)?,
                Some(attr) => writeln!(
                    f,
                    "  [{}] {} -> no match ({attr})",
                    step.index, step.trace.rule
                )?,
            }
        }
        match self.result {
            Some(index) => write!(f, "result: rule {index}"),
            None => write!(f, "result: no match"),
        }
    }
}
