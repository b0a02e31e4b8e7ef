//! Config types for declarative context construction.
//!
//! These types mirror the runtime types but are serde-deserializable,
//! enabling config-driven context construction via
//! [`Registry::load_context()`](crate::Registry::load_context).
//!
//! # Relationship to runtime types
//!
//! | Config type | Runtime type | Loader method |
//! |-------------|-------------|---------------|
//! | [`ContextConfig`] | [`AuthenticationContext`](crate::AuthenticationContext) | `Registry::load_context()` |
//! | [`RuleConfig`] | [`RuleConfigurationPair`](crate::RuleConfigurationPair) | `Registry::load_rule()` |
//! | [`MatchRuleConfig`] | [`MatchRule`](crate::MatchRule) | `Registry::load_match_rule()` |
//! | [`ConfigurationConfig`] | [`AuthenticationConfiguration`](crate::AuthenticationConfiguration) | `Registry::load_configuration()` |
//! | [`TypedConfig`] | `Arc<dyn CredentialSource>` / `Arc<dyn SslContextFactory>` | via registry factory |
//!
//! # Example
//!
//! ```yaml
//! rules:
//!   - match: { scheme: ldap, domain: example.org }
//!     configuration:
//!       name: alice
//!       sasl: { allow: [PLAIN] }
//!       credentials: { type_url: authctx.test.v1.StaticPassword, config: { password: s3cret } }
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

/// Configuration for an [`AuthenticationContext`](crate::AuthenticationContext).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Rules in resolution order (first-match-wins).
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// One rule and the configuration it selects.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    /// Match constraints. Omitted means "match everything".
    #[serde(default, rename = "match")]
    pub match_rule: MatchRuleConfig,

    /// Configuration selected when the rule matches.
    #[serde(default)]
    pub configuration: ConfigurationConfig,
}

/// Configuration for a [`MatchRule`](crate::MatchRule).
///
/// At most one of `host`, `domain`, `host_pattern` may be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchRuleConfig {
    /// URI scheme.
    pub scheme: Option<String>,
    /// Exact host.
    pub host: Option<String>,
    /// Host or any sub-domain of it.
    pub domain: Option<String>,
    /// Host regular expression.
    pub host_pattern: Option<String>,
    /// Port (explicit or the scheme default).
    pub port: Option<u16>,
    /// User-info user name.
    pub user: Option<String>,
    /// Path prefix, segment-aware.
    pub path: Option<String>,
    /// Protocol tag.
    pub protocol: Option<String>,
    /// Abstract type.
    pub abstract_type: Option<String>,
    /// Abstract type authority; requires `abstract_type`.
    pub abstract_type_authority: Option<String>,
}

/// Configuration for an [`AuthenticationConfiguration`](crate::AuthenticationConfiguration).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationConfig {
    /// Principal name.
    pub name: Option<String>,
    /// Authorization identity.
    pub authorization_name: Option<String>,
    /// Realm.
    pub realm: Option<String>,
    /// Destination host rewrite.
    pub host: Option<String>,
    /// Destination port rewrite.
    pub port: Option<u16>,
    /// Protocol override.
    pub protocol: Option<String>,
    /// SASL mechanism selection.
    #[serde(default)]
    pub sasl: SaslConfig,
    /// Mechanism properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Credential source, resolved through the registry.
    pub credentials: Option<TypedConfig>,
    /// SSL context factory, resolved through the registry.
    pub ssl: Option<TypedConfig>,
}

/// SASL allow/forbid lists.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaslConfig {
    /// Only these mechanisms. Omitted means "any".
    pub allow: Option<Vec<String>>,
    /// Never these mechanisms.
    #[serde(default)]
    pub forbid: Vec<String>,
}

/// Reference to a registered type with its configuration.
///
/// - `type_url` identifies the registered type
/// - `config` carries the type-specific configuration payload
#[derive(Debug, Clone, Deserialize)]
pub struct TypedConfig {
    /// The type URL identifying the registered collaborator type.
    pub type_url: String,

    /// Type-specific configuration payload.
    #[serde(default = "default_config")]
    pub config: serde_json::Value,
}

fn default_config() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
