//! authctx-test: in-memory collaborators for conformance testing
//!
//! Provides credential sources, a `PLAIN` SASL mechanism, and an SSL context
//! factory that need no network or key store. This is the reference extension
//! that demonstrates how to plug collaborators into authctx.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use authctx_test::prelude::*;
//!
//! let cfg = AuthenticationConfiguration::empty()
//!     .use_name("alice")
//!     .use_credentials(Arc::new(StaticCredentials::password("s3cret")));
//!
//! let uri = url::Url::parse("ldap://ds.example.org/").unwrap();
//! let mut client = cfg
//!     .create_sasl_client(&uri, &PlainSaslClientFactory, &["PLAIN"])
//!     .unwrap()
//!     .unwrap();
//!
//! assert_eq!(client.evaluate_challenge(&[]).unwrap(), b"\0alice\0s3cret");
//! ```

use std::fmt;
use std::sync::Arc;

use authctx::{
    Callback, CallbackHandler, Credential, CredentialError, CredentialKind, CredentialSource,
    Principal, SaslClient, SaslClientFactory, SaslClientRequest, SaslError, SslContext,
    SslContextFactory, SslError,
};
use zeroize::Zeroizing;

#[cfg(feature = "fixtures")]
pub mod fixture;

/// Type URL of [`StaticCredentials`] in the registry.
pub const STATIC_CREDENTIALS_TYPE_URL: &str = "authctx.test.v1.StaticPassword";

/// Type URL of [`FixedSslContextFactory`] in the registry.
pub const FIXED_SSL_TYPE_URL: &str = "authctx.test.v1.FixedSsl";

const PLAIN: &str = "PLAIN";

// ═══════════════════════════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════════════════════════

/// Credential source holding fixed secrets in memory.
///
/// Secrets are zeroed on drop and never printed.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    password: Option<Zeroizing<String>>,
    bearer_token: Option<Zeroizing<String>>,
}

impl StaticCredentials {
    /// Source answering password requests.
    #[must_use]
    pub fn password(secret: impl Into<String>) -> Self {
        Self {
            password: Some(Zeroizing::new(secret.into())),
            bearer_token: None,
        }
    }

    /// Source answering bearer token requests.
    #[must_use]
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self {
            password: None,
            bearer_token: Some(Zeroizing::new(token.into())),
        }
    }

    /// Add a bearer token (builder pattern).
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(Zeroizing::new(token.into()));
        self
    }
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("bearer_token", &self.bearer_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl CredentialSource for StaticCredentials {
    fn credential(
        &self,
        kind: CredentialKind,
        _principal: Option<&Principal>,
    ) -> Result<Option<Credential>, CredentialError> {
        let credential = match kind {
            CredentialKind::Password => self
                .password
                .as_ref()
                .map(|p| Credential::password(p.as_str())),
            CredentialKind::BearerToken => self
                .bearer_token
                .as_ref()
                .map(|t| Credential::bearer_token(t.as_str())),
        };
        Ok(credential)
    }
}

/// Credential source whose backing store is always down.
#[derive(Debug, Clone)]
pub struct UnavailableCredentials {
    reason: String,
}

impl UnavailableCredentials {
    /// Source failing with `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl CredentialSource for UnavailableCredentials {
    fn credential(
        &self,
        _kind: CredentialKind,
        _principal: Option<&Principal>,
    ) -> Result<Option<Credential>, CredentialError> {
        Err(CredentialError::new(self.reason.clone()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SASL PLAIN
// ═══════════════════════════════════════════════════════════════════════════════

/// Client side of the `PLAIN` mechanism.
///
/// Sends `authzid NUL authcid NUL password` as the initial response, gathering
/// the name and password through the configuration's callbacks.
pub struct PlainSaslClient {
    authorization_id: Option<String>,
    callbacks: Arc<dyn CallbackHandler>,
    complete: bool,
}

impl PlainSaslClient {
    /// Create a client answering through `callbacks`.
    pub fn new(authorization_id: Option<String>, callbacks: Arc<dyn CallbackHandler>) -> Self {
        Self {
            authorization_id,
            callbacks,
            complete: false,
        }
    }

    fn failure(message: &str) -> SaslError {
        SaslError::Mechanism {
            mechanism: PLAIN.into(),
            message: message.into(),
        }
    }

    fn initial_response(&self) -> Result<Vec<u8>, SaslError> {
        let mut callbacks = [Callback::name(), Callback::password()];
        self.callbacks.handle(&mut callbacks)?;

        let [Callback::Name { name: Some(name), .. }, Callback::Password { password: Some(password) }] =
            &callbacks
        else {
            return Err(Self::failure("name and password are required"));
        };

        let authzid = self.authorization_id.as_deref().unwrap_or_default();
        let mut response = Vec::with_capacity(authzid.len() + name.len() + password.len() + 2);
        response.extend_from_slice(authzid.as_bytes());
        response.push(0);
        response.extend_from_slice(name.as_bytes());
        response.push(0);
        response.extend_from_slice(password.as_bytes());
        Ok(response)
    }
}

impl fmt::Debug for PlainSaslClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlainSaslClient")
            .field("authorization_id", &self.authorization_id)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

impl SaslClient for PlainSaslClient {
    fn mechanism_name(&self) -> &str {
        PLAIN
    }

    fn has_initial_response(&self) -> bool {
        true
    }

    fn evaluate_challenge(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError> {
        if self.complete {
            return Err(Self::failure("exchange already complete"));
        }
        if !challenge.is_empty() {
            return Err(Self::failure("unexpected server challenge"));
        }
        let response = self.initial_response()?;
        self.complete = true;
        tracing::trace!(mechanism = PLAIN, "initial response sent");
        Ok(response)
    }

    fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Factory for [`PlainSaslClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainSaslClientFactory;

impl SaslClientFactory for PlainSaslClientFactory {
    fn mechanism_names(&self) -> Vec<String> {
        vec![PLAIN.to_owned()]
    }

    fn create_sasl_client(
        &self,
        request: &SaslClientRequest<'_>,
        callbacks: Arc<dyn CallbackHandler>,
    ) -> Result<Option<Box<dyn SaslClient>>, SaslError> {
        if !request.mechanisms.iter().any(|m| m.eq_ignore_ascii_case(PLAIN)) {
            return Ok(None);
        }
        Ok(Some(Box::new(PlainSaslClient::new(
            request.authorization_id.map(str::to_owned),
            callbacks,
        ))))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SSL
// ═══════════════════════════════════════════════════════════════════════════════

/// SSL context that only records its protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSslContext {
    protocol: String,
}

impl SslContext for FixedSslContext {
    fn protocol(&self) -> &str {
        &self.protocol
    }
}

/// Factory producing [`FixedSslContext`]s for one protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedSslContextFactory {
    protocol: String,
}

impl FixedSslContextFactory {
    /// Factory for `protocol` (e.g. `"TLSv1.3"`).
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
        }
    }
}

impl SslContextFactory for FixedSslContextFactory {
    fn create(&self) -> Result<Arc<dyn SslContext>, SslError> {
        if self.protocol.is_empty() {
            return Err(SslError::new("no protocol configured"));
        }
        Ok(Arc::new(FixedSslContext {
            protocol: self.protocol.clone(),
        }))
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        FixedSslContextFactory, PlainSaslClientFactory, StaticCredentials, UnavailableCredentials,
    };
    pub use authctx::prelude::*;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Registry support (feature = "registry")
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for [`StaticCredentials`].
#[cfg(feature = "registry")]
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticCredentialsConfig {
    /// Clear password.
    pub password: Option<String>,
    /// Bearer token.
    pub bearer_token: Option<String>,
}

#[cfg(feature = "registry")]
impl authctx::IntoCredentialSource for StaticCredentials {
    type Config = StaticCredentialsConfig;

    fn from_config(
        config: Self::Config,
    ) -> Result<Arc<dyn CredentialSource>, authctx::ConfigError> {
        if config.password.is_none() && config.bearer_token.is_none() {
            return Err(authctx::ConfigError::InvalidConfig {
                message: "static credentials need a password or bearer_token".into(),
            });
        }
        Ok(Arc::new(Self {
            password: config.password.map(Zeroizing::new),
            bearer_token: config.bearer_token.map(Zeroizing::new),
        }))
    }
}

/// Configuration for [`FixedSslContextFactory`].
#[cfg(feature = "registry")]
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixedSslConfig {
    /// Protocol name, `TLSv1.3` if omitted.
    #[serde(default = "default_ssl_protocol")]
    pub protocol: String,
}

#[cfg(feature = "registry")]
fn default_ssl_protocol() -> String {
    "TLSv1.3".into()
}

#[cfg(feature = "registry")]
impl authctx::IntoSslContextFactory for FixedSslContextFactory {
    type Config = FixedSslConfig;

    fn from_config(
        config: Self::Config,
    ) -> Result<Arc<dyn SslContextFactory>, authctx::ConfigError> {
        Ok(Arc::new(Self::new(config.protocol)))
    }
}

/// Register all test collaborator types with the given builder.
///
/// Registers:
/// - `authctx.test.v1.StaticPassword` → [`StaticCredentials`]
/// - `authctx.test.v1.FixedSsl` → [`FixedSslContextFactory`]
#[cfg(feature = "registry")]
#[must_use]
pub fn register(builder: authctx::RegistryBuilder) -> authctx::RegistryBuilder {
    builder
        .credentials::<StaticCredentials>(STATIC_CREDENTIALS_TYPE_URL)
        .ssl::<FixedSslContextFactory>(FIXED_SSL_TYPE_URL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use authctx::{AuthenticationConfiguration, ClientError};
    use url::Url;

    fn uri() -> Url {
        Url::parse("ldap://ds.example.org/").unwrap()
    }

    #[test]
    fn static_credentials_answer_by_kind() {
        let source = StaticCredentials::password("pw").with_bearer_token("tok");
        let pw = source.credential(CredentialKind::Password, None).unwrap().unwrap();
        assert_eq!(pw.secret(), "pw");
        let tok = source.credential(CredentialKind::BearerToken, None).unwrap().unwrap();
        assert_eq!(tok.kind(), CredentialKind::BearerToken);

        let only_token = StaticCredentials::bearer_token("tok");
        assert!(only_token.credential(CredentialKind::Password, None).unwrap().is_none());
    }

    #[test]
    fn static_credentials_debug_is_redacted() {
        let debug = format!("{:?}", StaticCredentials::password("hunter2"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn plain_initial_response() {
        let cfg = AuthenticationConfiguration::empty()
            .use_name("alice")
            .use_authorization_name("admin")
            .use_credentials(Arc::new(StaticCredentials::password("s3cret")));

        let mut client = cfg
            .create_sasl_client(&uri(), &PlainSaslClientFactory, &["SCRAM-SHA-256", "PLAIN"])
            .unwrap()
            .unwrap();
        assert_eq!(client.mechanism_name(), "PLAIN");
        assert!(client.has_initial_response());
        assert!(!client.is_complete());

        assert_eq!(client.evaluate_challenge(&[]).unwrap(), b"admin\0alice\0s3cret");
        assert!(client.is_complete());
        assert!(client.evaluate_challenge(&[]).is_err());
    }

    #[test]
    fn plain_without_password_fails() {
        let cfg = AuthenticationConfiguration::empty().use_name("alice");
        let mut client = cfg
            .create_sasl_client(&uri(), &PlainSaslClientFactory, &["PLAIN"])
            .unwrap()
            .unwrap();
        assert!(matches!(
            client.evaluate_challenge(&[]),
            Err(SaslError::Mechanism { .. })
        ));
        assert!(!client.is_complete());
    }

    #[test]
    fn plain_propagates_credential_failure() {
        let cfg = AuthenticationConfiguration::empty()
            .use_name("alice")
            .use_credentials(Arc::new(UnavailableCredentials::new("vault sealed")));
        let mut client = cfg
            .create_sasl_client(&uri(), &PlainSaslClientFactory, &["PLAIN"])
            .unwrap()
            .unwrap();
        let err = client.evaluate_challenge(&[]).unwrap_err();
        assert!(matches!(err, SaslError::Callback(_)));
    }

    #[test]
    fn forbidden_plain_creates_nothing() {
        let cfg = AuthenticationConfiguration::empty().forbid_sasl_mechanisms(["plain"]);
        let client = cfg
            .create_sasl_client(&uri(), &PlainSaslClientFactory, &["PLAIN"])
            .unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn factory_ignores_other_mechanisms() {
        let cfg = AuthenticationConfiguration::empty();
        let client = cfg
            .create_sasl_client(&uri(), &PlainSaslClientFactory, &["GSSAPI"])
            .unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn fixed_ssl_context() {
        let cfg = AuthenticationConfiguration::empty()
            .use_ssl_context_factory(Arc::new(FixedSslContextFactory::new("TLSv1.2")));
        assert_eq!(cfg.create_ssl_context().unwrap().protocol(), "TLSv1.2");

        let broken = AuthenticationConfiguration::empty()
            .use_ssl_context_factory(Arc::new(FixedSslContextFactory::new("")));
        assert!(matches!(broken.create_ssl_context(), Err(ClientError::Ssl(_))));
    }

    #[cfg(feature = "registry")]
    #[test]
    fn register_adds_both_types() {
        let registry = register(authctx::RegistryBuilder::new()).build();
        assert!(registry.contains_credentials(STATIC_CREDENTIALS_TYPE_URL));
        assert!(registry.contains_ssl(FIXED_SSL_TYPE_URL));
    }
}
