//! authctx - rule-matched authentication configuration with scoped propagation
//!
//! Decides *which* authentication configuration applies to *which* outbound
//! connection, and makes that decision visible to code running inside a scope.
//!
//! # Architecture
//!
//! - [`MatchRule`] — Conjunctive predicate over a [`MatchTarget`] (URI + protocol/abstract type)
//! - [`AuthenticationConfiguration`] — Immutable bundle of parameters and collaborators
//! - [`AuthenticationContext`] — Persistent, ordered rule list with first-match-wins resolution
//! - [`propagation`] — Thread-scoped "current context" with a write-once global default
//! - [`ConfigurationClient`] — Permission-gated resolution entry point
//!
//! # Key Design Insights
//!
//! 1. **Values, not objects**: every context and configuration update returns a
//!    new value, so contexts are shared across threads without locks.
//!
//! 2. **Position is priority**: rules may overlap; the lowest index wins.
//!
//! 3. **No match is not an error**: resolution falls back to the empty
//!    configuration.
//!
//! # Example
//!
//! ```
//! use authctx::prelude::*;
//!
//! let ctx = AuthenticationContext::empty()
//!     .with(
//!         MatchRule::ALL.match_scheme("ldap"),
//!         AuthenticationConfiguration::empty().use_name("cn=admin"),
//!     )
//!     .with(
//!         MatchRule::ALL.match_domain("example.org"),
//!         AuthenticationConfiguration::empty().use_name("alice"),
//!     );
//!
//! let resolved = ctx.run(|| {
//!     let current = AuthenticationContext::capture_current();
//!     current.resolve(&MatchTarget::parse("https://www.example.org/").unwrap())
//! });
//! assert_eq!(resolved.principal().map(|p| p.name()), Some("alice"));
//! ```

// ═══════════════════════════════════════════════════════════════════════════════
// Modules
// ═══════════════════════════════════════════════════════════════════════════════

mod client;
mod configuration;
mod context;
mod error;
mod host_match;
mod match_rule;
mod policy;
mod spi;
mod target;
mod trace;

pub mod propagation;

#[cfg(feature = "registry")]
mod config;
#[cfg(feature = "registry")]
mod registry;

// ═══════════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════════

// Core types
pub use client::ConfigurationClient;
pub use configuration::{AuthenticationConfiguration, ConfigurationCallbackHandler};
pub use context::{AuthenticationContext, RuleConfigurationPair};
pub use host_match::HostMatch;
pub use match_rule::MatchRule;
pub use target::MatchTarget;

// Collaborator seams
pub use spi::{
    Callback, CallbackHandler, Credential, CredentialKind, CredentialSource, Principal,
    SaslClient, SaslClientFactory, SaslClientRequest, SslContext, SslContextFactory,
};

// Security policy
pub use policy::{
    install_security_policy, security_policy, AllowAll, SecurityPolicy, CREATE_CLIENT_PERMISSION,
};

// Errors
pub use error::{
    ActionError, BoxError, CallbackError, ClientError, ConfigError, ContextError,
    CredentialError, SaslError, SslError,
};

// Registry (feature-gated)
#[cfg(feature = "registry")]
pub use config::{
    ConfigurationConfig, ContextConfig, MatchRuleConfig, RuleConfig, SaslConfig, TypedConfig,
};
#[cfg(feature = "registry")]
pub use registry::{IntoCredentialSource, IntoSslContextFactory, Registry, RegistryBuilder};

// Trace types
pub use trace::{MatchTrace, RuleAttribute, RuleStep, RuleTrace};

// ═══════════════════════════════════════════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════════════════════════════════════════

/// Prelude module for convenient imports.
///
/// ```
/// use authctx::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Core types
        AuthenticationConfiguration,
        AuthenticationContext,
        // Errors
        ClientError,
        ConfigurationClient,
        ContextError,
        // Collaborator seams
        CredentialSource,
        HostMatch,
        MatchRule,
        MatchTarget,
        // Trace types
        MatchTrace,
        Principal,
        RuleConfigurationPair,
    };
}

// ═══════════════════════════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of rules in a single loaded context.
///
/// Resolution is a linear scan. Validated at config load time.
pub const MAX_RULES: usize = 256;

/// Maximum length for literal match values (scheme, host, domain, path, ...).
pub const MAX_PATTERN_LENGTH: usize = 8192;

/// Maximum length for host regex patterns.
///
/// Shorter than [`MAX_PATTERN_LENGTH`] because regex compilation cost grows
/// faster than literal comparison.
pub const MAX_REGEX_PATTERN_LENGTH: usize = 4096;
