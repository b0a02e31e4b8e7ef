//! `ConfigurationClient` — resolves the configuration for a destination
//!
//! The client is the consuming side of an [`AuthenticationContext`]: given a
//! URI it finds the matching configuration and hands it to the collaborators
//! that open connections and run mechanisms. It holds no state and caches
//! nothing; every call re-walks the rule list.
//!
//! Constructing a client requires [`CREATE_CLIENT_PERMISSION`] from the
//! installed [`SecurityPolicy`].

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;

use url::Url;

use crate::{
    policy, AuthenticationConfiguration, AuthenticationContext, ClientError,
    ConfigurationCallbackHandler, MatchTarget, Principal, SaslClient, SaslClientFactory,
    SaslError, SecurityPolicy, SslContext, CREATE_CLIENT_PERMISSION,
};

/// Client for consuming authentication context configurations.
///
/// # Example
///
/// ```
/// use authctx::{AuthenticationConfiguration, AuthenticationContext, ConfigurationClient, MatchRule};
/// use url::Url;
///
/// let ctx = AuthenticationContext::empty().with(
///     MatchRule::ALL.match_domain("example.org"),
///     AuthenticationConfiguration::empty().use_name("alice").use_port(1389),
/// );
///
/// let client = ConfigurationClient::new().unwrap();
/// let uri = Url::parse("ldap://ds.example.org/").unwrap();
/// let cfg = client.authentication_configuration(&uri, &ctx);
///
/// assert_eq!(client.principal(&cfg).map(|p| p.name()), Some("alice"));
/// assert_eq!(client.real_port(&uri, &cfg), Some(1389));
/// ```
#[derive(Debug)]
pub struct ConfigurationClient {
    _private: (),
}

impl ConfigurationClient {
    /// Create a client, checking the installed security policy.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PermissionDenied`] if the policy refuses
    /// [`CREATE_CLIENT_PERMISSION`].
    pub fn new() -> Result<Self, ClientError> {
        Self::with_policy(policy::security_policy())
    }

    /// Create a client, checking the given policy instead of the installed one.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PermissionDenied`] if the policy refuses
    /// [`CREATE_CLIENT_PERMISSION`].
    pub fn with_policy(policy: &dyn SecurityPolicy) -> Result<Self, ClientError> {
        if !policy.check_permission(CREATE_CLIENT_PERMISSION) {
            tracing::warn!(permission = CREATE_CLIENT_PERMISSION, "client construction denied");
            return Err(ClientError::PermissionDenied {
                permission: CREATE_CLIENT_PERMISSION,
            });
        }
        Ok(Self { _private: () })
    }

    /// The configuration matching `uri`, or the empty configuration.
    #[must_use]
    pub fn authentication_configuration(
        &self,
        uri: &Url,
        context: &AuthenticationContext,
    ) -> AuthenticationConfiguration {
        context.resolve(&MatchTarget::from(uri))
    }

    /// Same as [`authentication_configuration`](Self::authentication_configuration)
    /// for a target carrying a protocol or abstract type.
    #[must_use]
    pub fn authentication_configuration_for(
        &self,
        target: &MatchTarget,
        context: &AuthenticationContext,
    ) -> AuthenticationConfiguration {
        context.resolve(target)
    }

    /// Callback handler answering from `configuration`.
    #[must_use]
    pub fn callback_handler(
        &self,
        configuration: &AuthenticationConfiguration,
    ) -> ConfigurationCallbackHandler {
        configuration.callback_handler()
    }

    /// Principal to authenticate as.
    #[must_use]
    pub fn principal<'a>(&self, configuration: &'a AuthenticationConfiguration) -> Option<&'a Principal> {
        configuration.principal()
    }

    /// Host to connect to, after rewriting.
    #[must_use]
    pub fn real_host<'a>(
        &self,
        uri: &'a Url,
        configuration: &'a AuthenticationConfiguration,
    ) -> Option<&'a str> {
        configuration.host_for(uri)
    }

    /// Port to connect to, after rewriting.
    #[must_use]
    pub fn real_port(&self, uri: &Url, configuration: &AuthenticationConfiguration) -> Option<u16> {
        configuration.port_for(uri)
    }

    /// Create a SASL client for `uri`; `Ok(None)` if no mechanism is usable.
    ///
    /// # Errors
    ///
    /// Propagates the factory's [`SaslError`] unchanged.
    pub fn create_sasl_client<S: AsRef<str>>(
        &self,
        uri: &Url,
        configuration: &AuthenticationConfiguration,
        factory: &dyn SaslClientFactory,
        offered: &[S],
    ) -> Result<Option<Box<dyn SaslClient>>, SaslError> {
        configuration.create_sasl_client(uri, factory, offered)
    }

    /// Destination address after rewriting.
    ///
    /// # Errors
    ///
    /// See [`AuthenticationConfiguration::destination_address`].
    pub fn destination_address(
        &self,
        uri: &Url,
        configuration: &AuthenticationConfiguration,
        default_port: u16,
    ) -> Result<SocketAddr, ClientError> {
        configuration.destination_address(uri, default_port)
    }

    /// SSL context for `configuration`.
    ///
    /// # Errors
    ///
    /// See [`AuthenticationConfiguration::create_ssl_context`].
    pub fn ssl_context(
        &self,
        configuration: &AuthenticationConfiguration,
    ) -> Result<Arc<dyn SslContext>, ClientError> {
        configuration.create_ssl_context()
    }

    /// Connect a plain socket to the destination.
    ///
    /// # Errors
    ///
    /// See [`AuthenticationConfiguration::connect`].
    pub fn connect(
        &self,
        uri: &Url,
        configuration: &AuthenticationConfiguration,
        default_port: u16,
    ) -> Result<TcpStream, ClientError> {
        configuration.connect(uri, default_port)
    }
}
