//! `AuthenticationContext` — persistent, ordered rule list
//!
//! A context is an ordered list of `(MatchRule, AuthenticationConfiguration)`
//! pairs plus a transform applied to whichever configuration is retrieved.
//! Contexts are values: every update returns a new context and the receiver
//! is never touched, so a context can be shared across threads freely.
//!
//! # Resolution
//!
//! [`rule_matching`](AuthenticationContext::rule_matching) scans the list in
//! order and returns the first rule that matches (first-match-wins). Rules
//! may overlap; position is the only priority.
//!
//! # Merging
//!
//! [`with_context`](AuthenticationContext::with_context) appends the other
//! context's rules and keeps **this** context's transform. The one exception
//! is [`with_context_at`](AuthenticationContext::with_context_at) at index 0,
//! which is `other.with_context(self)` and therefore keeps `other`'s.

use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::{
    propagation, ActionError, AuthenticationConfiguration, BoxError, ContextError, MatchRule,
    MatchTarget, MatchTrace, RuleStep,
};

type Transform =
    Arc<dyn Fn(AuthenticationConfiguration) -> AuthenticationConfiguration + Send + Sync>;

static EMPTY: LazyLock<AuthenticationContext> = LazyLock::new(|| AuthenticationContext {
    rules: Vec::new().into(),
    transform: None,
});

/// One rule and the configuration it selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleConfigurationPair {
    rule: MatchRule,
    configuration: AuthenticationConfiguration,
}

impl RuleConfigurationPair {
    /// Pair a rule with a configuration.
    #[must_use]
    pub fn new(rule: MatchRule, configuration: AuthenticationConfiguration) -> Self {
        Self {
            rule,
            configuration,
        }
    }

    /// The rule.
    #[must_use]
    pub fn rule(&self) -> &MatchRule {
        &self.rule
    }

    /// The configuration, before any context transform.
    #[must_use]
    pub fn configuration(&self) -> &AuthenticationConfiguration {
        &self.configuration
    }
}

/// Ordered rules selecting an [`AuthenticationConfiguration`] per destination.
///
/// # Example
///
/// ```
/// use authctx::{AuthenticationConfiguration, AuthenticationContext, MatchRule, MatchTarget};
///
/// let ctx = AuthenticationContext::empty()
///     .with(MatchRule::ALL.match_scheme("ldap"), AuthenticationConfiguration::empty().use_name("a"))
///     .with(MatchRule::ALL.match_host("example.org"), AuthenticationConfiguration::empty().use_name("b"));
///
/// // Both rules match; the first one wins.
/// let target = MatchTarget::parse("ldap://example.org/").unwrap();
/// assert_eq!(ctx.rule_matching(&target), Some(0));
/// ```
#[derive(Clone)]
pub struct AuthenticationContext {
    rules: Arc<[RuleConfigurationPair]>,
    transform: Option<Transform>,
}

impl AuthenticationContext {
    /// The empty context: no rules, identity transform.
    ///
    /// Every call returns a handle to the same shared value.
    #[must_use]
    pub fn empty() -> Self {
        EMPTY.clone()
    }

    /// The context associated with the calling thread, or the global default.
    ///
    /// See [`propagation::capture_current`].
    #[must_use]
    pub fn capture_current() -> Self {
        propagation::capture_current()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the context has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rules, in resolution order.
    #[must_use]
    pub fn rules(&self) -> &[RuleConfigurationPair] {
        &self.rules
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Updates
    // ═══════════════════════════════════════════════════════════════════════════

    /// Append a rule at the end of the list.
    #[must_use]
    pub fn with(&self, rule: MatchRule, configuration: AuthenticationConfiguration) -> Self {
        let mut rules = Vec::with_capacity(self.len() + 1);
        rules.extend_from_slice(&self.rules);
        rules.push(RuleConfigurationPair::new(rule, configuration));
        self.derive(rules)
    }

    /// Append every rule of `other`, keeping this context's transform.
    ///
    /// If either side has no rules, the other side is returned unchanged.
    #[must_use]
    pub fn with_context(&self, other: &AuthenticationContext) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut rules = Vec::with_capacity(self.len() + other.len());
        rules.extend_from_slice(&self.rules);
        rules.extend_from_slice(&other.rules);
        self.derive(rules)
    }

    /// Insert a rule at `idx`, shifting later rules right.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IndexOutOfRange`] unless `idx <= len()`.
    pub fn with_at(
        &self,
        idx: usize,
        rule: MatchRule,
        configuration: AuthenticationConfiguration,
    ) -> Result<Self, ContextError> {
        self.check_index(idx, self.len() + 1)?;
        let mut rules = Vec::with_capacity(self.len() + 1);
        rules.extend_from_slice(&self.rules[..idx]);
        rules.push(RuleConfigurationPair::new(rule, configuration));
        rules.extend_from_slice(&self.rules[idx..]);
        Ok(self.derive(rules))
    }

    /// Replace the rule at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IndexOutOfRange`] unless `idx < len()`.
    pub fn replacing(
        &self,
        idx: usize,
        rule: MatchRule,
        configuration: AuthenticationConfiguration,
    ) -> Result<Self, ContextError> {
        self.check_index(idx, self.len())?;
        let mut rules = self.rules.to_vec();
        rules[idx] = RuleConfigurationPair::new(rule, configuration);
        Ok(self.derive(rules))
    }

    /// Insert every rule of `other` starting at `idx`.
    ///
    /// `idx == len()` is [`with_context`](Self::with_context). `idx == 0` is
    /// `other.with_context(self)`, so the result carries `other`'s transform;
    /// every other position keeps this context's transform.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IndexOutOfRange`] unless `idx <= len()`.
    pub fn with_context_at(
        &self,
        idx: usize,
        other: &AuthenticationContext,
    ) -> Result<Self, ContextError> {
        if idx == self.len() {
            return Ok(self.with_context(other));
        }
        if idx == 0 {
            return Ok(other.with_context(self));
        }
        self.check_index(idx, self.len() + 1)?;
        if other.is_empty() {
            return Ok(self.clone());
        }
        let mut rules = Vec::with_capacity(self.len() + other.len());
        rules.extend_from_slice(&self.rules[..idx]);
        rules.extend_from_slice(&other.rules);
        rules.extend_from_slice(&self.rules[idx..]);
        Ok(self.derive(rules))
    }

    /// Remove the rule at `idx`.
    ///
    /// Removing the last remaining rule yields [`empty()`](Self::empty).
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IndexOutOfRange`] unless `idx < len()`.
    pub fn without(&self, idx: usize) -> Result<Self, ContextError> {
        self.check_index(idx, self.len())?;
        if self.len() == 1 {
            return Ok(Self::empty());
        }
        let mut rules = self.rules.to_vec();
        rules.remove(idx);
        Ok(self.derive(rules))
    }

    /// Add a transform, applied after the existing one.
    ///
    /// `ctx.with_transform(f).with_transform(g)` retrieves `g(f(x))`.
    #[must_use]
    pub fn with_transform<F>(&self, f: F) -> Self
    where
        F: Fn(AuthenticationConfiguration) -> AuthenticationConfiguration + Send + Sync + 'static,
    {
        let transform: Transform = match &self.transform {
            None => Arc::new(f),
            Some(existing) => {
                let existing = Arc::clone(existing);
                Arc::new(move |cfg: AuthenticationConfiguration| f(existing(cfg)))
            }
        };
        Self {
            rules: Arc::clone(&self.rules),
            transform: Some(transform),
        }
    }

    fn derive(&self, rules: Vec<RuleConfigurationPair>) -> Self {
        Self {
            rules: rules.into(),
            transform: self.transform.clone(),
        }
    }

    fn check_index(&self, idx: usize, bound: usize) -> Result<(), ContextError> {
        if idx < bound {
            Ok(())
        } else {
            Err(ContextError::IndexOutOfRange {
                index: idx,
                len: self.len(),
            })
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Queries
    // ═══════════════════════════════════════════════════════════════════════════

    /// Index of the first rule matching `target`, or `None`.
    #[must_use]
    pub fn rule_matching(&self, target: &MatchTarget) -> Option<usize> {
        let found = self.rules.iter().position(|p| p.rule.matches(target));
        match found {
            Some(index) => tracing::debug!(uri = %target, index, "rule matched"),
            None => tracing::debug!(uri = %target, rules = self.len(), "no rule matched"),
        }
        found
    }

    /// Same as [`rule_matching`](Self::rule_matching), recording every rule tried.
    #[must_use]
    pub fn rule_matching_with_trace(&self, target: &MatchTarget) -> MatchTrace {
        let mut trace = MatchTrace::default();
        for (index, pair) in self.rules.iter().enumerate() {
            let step = pair.rule.matches_with_trace(target);
            let matched = step.matched;
            trace.steps.push(RuleStep { index, trace: step });
            if matched {
                trace.result = Some(index);
                break;
            }
        }
        trace
    }

    /// The rule at `idx`.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IndexOutOfRange`] unless `idx < len()`.
    pub fn match_rule(&self, idx: usize) -> Result<&MatchRule, ContextError> {
        self.check_index(idx, self.len())?;
        Ok(&self.rules[idx].rule)
    }

    /// The configuration at `idx`, with the transform applied.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::IndexOutOfRange`] unless `idx < len()`.
    pub fn authentication_configuration(
        &self,
        idx: usize,
    ) -> Result<AuthenticationConfiguration, ContextError> {
        self.check_index(idx, self.len())?;
        let configuration = self.rules[idx].configuration.clone();
        Ok(match &self.transform {
            Some(transform) => transform(configuration),
            None => configuration,
        })
    }

    /// Configuration for `target`, or the empty configuration if no rule matches.
    #[must_use]
    pub fn resolve(&self, target: &MatchTarget) -> AuthenticationConfiguration {
        self.rule_matching(target)
            .and_then(|idx| self.authentication_configuration(idx).ok())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Scoped execution
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run `action` with this context associated with the calling thread.
    ///
    /// The previous association is restored when `action` returns or panics.
    pub fn run<T>(&self, action: impl FnOnce() -> T) -> T {
        let _scope = propagation::associate(self.clone());
        action()
    }

    /// Run a fallible `action` under this context; its error is returned unchanged.
    ///
    /// # Errors
    ///
    /// Whatever `action` returns.
    pub fn try_run<T, E>(&self, action: impl FnOnce() -> Result<T, E>) -> Result<T, E> {
        let _scope = propagation::associate(self.clone());
        action()
    }

    /// Run `action(parameter)` under this context.
    pub fn run_with<P, T>(&self, parameter: P, action: impl FnOnce(P) -> T) -> T {
        let _scope = propagation::associate(self.clone());
        action(parameter)
    }

    /// Run a fallible `action(parameter)` under this context, wrapping its
    /// failure in [`ActionError`].
    ///
    /// # Errors
    ///
    /// Returns [`ActionError`] holding the action's error as its source.
    pub fn try_run_with<P, T, E>(
        &self,
        parameter: P,
        action: impl FnOnce(P) -> Result<T, E>,
    ) -> Result<T, ActionError>
    where
        E: Into<BoxError>,
    {
        let _scope = propagation::associate(self.clone());
        action(parameter).map_err(ActionError::new)
    }
}

impl Default for AuthenticationContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl FromIterator<RuleConfigurationPair> for AuthenticationContext {
    fn from_iter<I: IntoIterator<Item = RuleConfigurationPair>>(iter: I) -> Self {
        let rules: Vec<_> = iter.into_iter().collect();
        if rules.is_empty() {
            return Self::empty();
        }
        Self {
            rules: rules.into(),
            transform: None,
        }
    }
}

impl PartialEq for AuthenticationContext {
    fn eq(&self, other: &Self) -> bool {
        let same_transform = match (&self.transform, &other.transform) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        };
        same_transform && self.rules == other.rules
    }
}

impl fmt::Debug for AuthenticationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationContext")
            .field("rules", &self.rules)
            .field(
                "transform",
                &if self.transform.is_some() {
                    "composed"
                } else {
                    "identity"
                },
            )
            .finish()
    }
}
