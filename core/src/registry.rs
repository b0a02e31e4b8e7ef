//! Type registry for config-driven context construction.
//!
//! The registry turns a [`ContextConfig`] (JSON/YAML) into an
//! [`AuthenticationContext`]. Collaborators that the configuration names by
//! type URL (credential sources, SSL context factories) are built by factories
//! registered up front.
//!
//! # Architecture
//!
//! Each collaborator type registers itself via [`IntoCredentialSource`] or
//! [`IntoSslContextFactory`]. At registration time the concrete type `T` is
//! monomorphized into a closure and erased behind `Box<dyn Fn>`; at load time
//! the registry looks up the `type_url`, deserializes `T::Config`, and calls
//! `T::from_config()`.
//!
//! | Seam | Trait | Builder method |
//! |------|-------|----------------|
//! | Credential sources | [`IntoCredentialSource`] | `builder.credentials::<T>(url)` |
//! | SSL context factories | [`IntoSslContextFactory`] | `builder.ssl::<T>(url)` |
//!
//! # Example
//!
//! ```ignore
//! let registry = RegistryBuilder::new()
//!     .credentials::<StaticCredentials>("authctx.test.v1.StaticPassword")
//!     .build();
//!
//! let config: ContextConfig = serde_yaml::from_str(yaml)?;
//! let ctx = registry.load_context(config)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{
    config::{ConfigurationConfig, ContextConfig, MatchRuleConfig, RuleConfig, TypedConfig},
    AuthenticationConfiguration, AuthenticationContext, ConfigError, CredentialSource, HostMatch,
    MatchRule, RuleConfigurationPair, SslContextFactory, MAX_RULES,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Traits
// ═══════════════════════════════════════════════════════════════════════════════

/// Trait for credential source types that can be constructed from configuration.
///
/// Each type knows its own config shape via the associated `Config` type.
pub trait IntoCredentialSource: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct a credential source from deserialized configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if the config is semantically invalid.
    fn from_config(config: Self::Config) -> Result<Arc<dyn CredentialSource>, ConfigError>;
}

/// Trait for SSL context factory types that can be constructed from configuration.
pub trait IntoSslContextFactory: Send + Sync + 'static {
    /// The configuration type deserialized from JSON/YAML.
    type Config: DeserializeOwned + Send + Sync;

    /// Construct an SSL context factory from deserialized configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if the config is semantically invalid.
    fn from_config(config: Self::Config) -> Result<Arc<dyn SslContextFactory>, ConfigError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Type-erased factories
// ═══════════════════════════════════════════════════════════════════════════════

type BoxedCredentialFactory = Box<
    dyn Fn(&serde_json::Value) -> Result<Arc<dyn CredentialSource>, ConfigError> + Send + Sync,
>;

type BoxedSslFactory = Box<
    dyn Fn(&serde_json::Value) -> Result<Arc<dyn SslContextFactory>, ConfigError> + Send + Sync,
>;

fn decode<C: DeserializeOwned>(value: &serde_json::Value) -> Result<C, ConfigError> {
    serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidConfig {
        message: e.to_string(),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// Builder
// ═══════════════════════════════════════════════════════════════════════════════

/// Builder for constructing a [`Registry`].
///
/// Register collaborator types with their type URLs, then call
/// [`build()`](Self::build) to produce an immutable `Registry`. No runtime
/// registration is possible afterwards.
pub struct RegistryBuilder {
    credential_factories: HashMap<String, BoxedCredentialFactory>,
    ssl_factories: HashMap<String, BoxedSslFactory>,
}

impl RegistryBuilder {
    /// Create a new empty registry builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            credential_factories: HashMap::new(),
            ssl_factories: HashMap::new(),
        }
    }

    /// Register a credential source type with a type URL.
    #[must_use]
    pub fn credentials<T: IntoCredentialSource>(mut self, type_url: &str) -> Self {
        self.credential_factories.insert(
            type_url.to_owned(),
            Box::new(|value: &serde_json::Value| T::from_config(decode(value)?)),
        );
        self
    }

    /// Register an SSL context factory type with a type URL.
    #[must_use]
    pub fn ssl<T: IntoSslContextFactory>(mut self, type_url: &str) -> Self {
        self.ssl_factories.insert(
            type_url.to_owned(),
            Box::new(|value: &serde_json::Value| T::from_config(decode(value)?)),
        );
        self
    }

    /// Freeze the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            credential_factories: self.credential_factories,
            ssl_factories: self.ssl_factories,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable registry of collaborator factories.
///
/// Constructed via [`RegistryBuilder`]. Use [`load_context()`](Self::load_context)
/// to compile config into a runtime [`AuthenticationContext`].
pub struct Registry {
    credential_factories: HashMap<String, BoxedCredentialFactory>,
    ssl_factories: HashMap<String, BoxedSslFactory>,
}

impl Registry {
    /// Load an [`AuthenticationContext`] from configuration.
    ///
    /// Every rule is built before the context is assembled, so a failure
    /// leaves nothing half-loaded.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::TooManyRules`] — more than [`MAX_RULES`](crate::MAX_RULES) rules
    /// - [`ConfigError::UnknownTypeUrl`] — credentials or ssl `type_url` not registered
    /// - [`ConfigError::InvalidConfig`] — config deserialization or construction failed
    /// - [`ConfigError::InvalidPattern`] / [`ConfigError::PatternTooLong`] — bad host pattern
    pub fn load_context(&self, config: ContextConfig) -> Result<AuthenticationContext, ConfigError> {
        if config.rules.len() > MAX_RULES {
            return Err(ConfigError::TooManyRules {
                count: config.rules.len(),
                max: MAX_RULES,
            });
        }
        let ctx = config
            .rules
            .into_iter()
            .map(|rule| self.load_rule(rule))
            .collect::<Result<AuthenticationContext, _>>()?;
        tracing::debug!(rules = ctx.len(), "context loaded");
        Ok(ctx)
    }

    /// Load one rule.
    ///
    /// # Errors
    ///
    /// See [`load_context`](Self::load_context).
    pub fn load_rule(&self, config: RuleConfig) -> Result<RuleConfigurationPair, ConfigError> {
        Ok(RuleConfigurationPair::new(
            self.load_match_rule(&config.match_rule)?,
            self.load_configuration(config.configuration)?,
        ))
    }

    /// Build a [`MatchRule`] from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] if more than one host constraint
    /// is given or an authority is given without a type, and pattern errors
    /// from [`HostMatch::pattern`].
    pub fn load_match_rule(&self, config: &MatchRuleConfig) -> Result<MatchRule, ConfigError> {
        let host_constraints = [&config.host, &config.domain, &config.host_pattern]
            .iter()
            .filter(|c| c.is_some())
            .count();
        if host_constraints > 1 {
            return Err(ConfigError::InvalidConfig {
                message: "at most one of host, domain, host_pattern may be set".into(),
            });
        }

        let mut rule = MatchRule::ALL;
        if let Some(scheme) = &config.scheme {
            HostMatch::check_literal(scheme)?;
            rule = rule.match_scheme(scheme);
        }
        if let Some(host) = &config.host {
            HostMatch::check_literal(host)?;
            rule = rule.match_host(host);
        }
        if let Some(domain) = &config.domain {
            HostMatch::check_literal(domain)?;
            if domain.trim_start_matches('.').is_empty() {
                return Err(ConfigError::InvalidConfig {
                    message: format!("domain \"{domain}\" names no labels"),
                });
            }
            rule = rule.match_domain(domain);
        }
        if let Some(pattern) = &config.host_pattern {
            rule = rule.match_host_pattern(pattern)?;
        }
        if let Some(port) = config.port {
            rule = rule.match_port(port);
        }
        if let Some(user) = &config.user {
            HostMatch::check_literal(user)?;
            rule = rule.match_user(user);
        }
        if let Some(path) = &config.path {
            HostMatch::check_literal(path)?;
            rule = rule.match_path(path);
        }
        if let Some(protocol) = &config.protocol {
            HostMatch::check_literal(protocol)?;
            rule = rule.match_protocol(protocol);
        }
        match (&config.abstract_type, &config.abstract_type_authority) {
            (Some(t), authority) => {
                HostMatch::check_literal(t)?;
                rule = rule.match_abstract_type(t, authority.as_deref());
            }
            (None, Some(_)) => {
                return Err(ConfigError::InvalidConfig {
                    message: "abstract_type_authority requires abstract_type".into(),
                });
            }
            (None, None) => {}
        }
        Ok(rule)
    }

    /// Build an [`AuthenticationConfiguration`] from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTypeUrl`] or the collaborator factory's error.
    pub fn load_configuration(
        &self,
        config: ConfigurationConfig,
    ) -> Result<AuthenticationConfiguration, ConfigError> {
        let mut cfg = AuthenticationConfiguration::empty();
        if let Some(name) = config.name {
            cfg = cfg.use_name(name);
        }
        if let Some(name) = config.authorization_name {
            cfg = cfg.use_authorization_name(name);
        }
        if let Some(realm) = config.realm {
            cfg = cfg.use_realm(realm);
        }
        if let Some(host) = config.host {
            cfg = cfg.use_host(host);
        }
        if let Some(port) = config.port {
            cfg = cfg.use_port(port);
        }
        if let Some(protocol) = config.protocol {
            cfg = cfg.use_protocol(protocol);
        }
        if let Some(allow) = &config.sasl.allow {
            cfg = cfg.allow_sasl_mechanisms(allow);
        }
        if !config.sasl.forbid.is_empty() {
            cfg = cfg.forbid_sasl_mechanisms(&config.sasl.forbid);
        }
        for (key, value) in config.properties {
            cfg = cfg.use_mechanism_property(key, value);
        }
        if let Some(typed) = &config.credentials {
            cfg = cfg.use_credentials(self.resolve_credentials(typed)?);
        }
        if let Some(typed) = &config.ssl {
            cfg = cfg.use_ssl_context_factory(self.resolve_ssl(typed)?);
        }
        Ok(cfg)
    }

    fn resolve_credentials(&self, config: &TypedConfig) -> Result<Arc<dyn CredentialSource>, ConfigError> {
        let factory = self
            .credential_factories
            .get(&config.type_url)
            .ok_or_else(|| ConfigError::UnknownTypeUrl {
                type_url: config.type_url.clone(),
                registry: "credentials",
                available: self.credential_factories.keys().cloned().collect(),
            })?;
        factory(&config.config)
    }

    fn resolve_ssl(&self, config: &TypedConfig) -> Result<Arc<dyn SslContextFactory>, ConfigError> {
        let factory = self
            .ssl_factories
            .get(&config.type_url)
            .ok_or_else(|| ConfigError::UnknownTypeUrl {
                type_url: config.type_url.clone(),
                registry: "ssl",
                available: self.ssl_factories.keys().cloned().collect(),
            })?;
        factory(&config.config)
    }

    /// Returns `true` if the given credential type URL is registered.
    #[must_use]
    pub fn contains_credentials(&self, type_url: &str) -> bool {
        self.credential_factories.contains_key(type_url)
    }

    /// Returns `true` if the given SSL type URL is registered.
    #[must_use]
    pub fn contains_ssl(&self, type_url: &str) -> bool {
        self.ssl_factories.contains_key(type_url)
    }

    /// Registered credential type URLs, sorted.
    #[must_use]
    pub fn credential_type_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.credential_factories.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }

    /// Registered SSL type URLs, sorted.
    #[must_use]
    pub fn ssl_type_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.ssl_factories.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("credentials", &self.credential_type_urls())
            .field("ssl", &self.ssl_type_urls())
            .finish()
    }
}
