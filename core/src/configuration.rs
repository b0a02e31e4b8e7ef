//! `AuthenticationConfiguration` — what to present once a rule has matched
//!
//! A configuration is an immutable value. Every `use_*`/`allow_*`/`forbid_*`
//! method returns a new configuration with one option changed; the receiver
//! is left as it was. The empty configuration (every option unset) is what a
//! resolution with no matching rule yields.
//!
//! Collaborators ([`CredentialSource`], [`SslContextFactory`]) are held
//! behind `Arc` and compared by identity.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;

use url::Url;

use crate::{
    Callback, CallbackError, CallbackHandler, ClientError, CredentialKind, CredentialSource,
    Principal, SaslClient, SaslClientFactory, SaslClientRequest, SaslError, SslContext,
    SslContextFactory,
};

/// Bundle of authentication parameters selected for a destination.
///
/// # Example
///
/// ```
/// use authctx::AuthenticationConfiguration;
/// use url::Url;
///
/// let cfg = AuthenticationConfiguration::empty()
///     .use_name("alice")
///     .use_host("ldap-1.internal")
///     .forbid_sasl_mechanisms(["ANONYMOUS"]);
///
/// let uri = Url::parse("ldap://example.org:1389/").unwrap();
/// assert_eq!(cfg.principal().map(|p| p.name()), Some("alice"));
/// assert_eq!(cfg.host_for(&uri), Some("ldap-1.internal"));
/// assert_eq!(cfg.port_for(&uri), Some(1389));
/// assert!(!cfg.is_sasl_mechanism_allowed("ANONYMOUS"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AuthenticationConfiguration {
    principal: Option<Principal>,
    authorization_name: Option<String>,
    realm: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    protocol: Option<String>,
    sasl_allowed: Option<BTreeSet<String>>,
    sasl_forbidden: BTreeSet<String>,
    properties: BTreeMap<String, String>,
    credentials: Option<Arc<dyn CredentialSource>>,
    ssl: Option<Arc<dyn SslContextFactory>>,
}

impl AuthenticationConfiguration {
    /// The empty configuration: every option unset.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` if no option is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Builders
    // ───────────────────────────────────────────────────────────────────────────

    /// Authenticate as the named principal.
    #[must_use]
    pub fn use_name(&self, name: impl Into<String>) -> Self {
        Self {
            principal: Some(Principal::new(name)),
            ..self.clone()
        }
    }

    /// Request authorization as a different identity.
    #[must_use]
    pub fn use_authorization_name(&self, name: impl Into<String>) -> Self {
        Self {
            authorization_name: Some(name.into()),
            ..self.clone()
        }
    }

    /// Use the given realm.
    #[must_use]
    pub fn use_realm(&self, realm: impl Into<String>) -> Self {
        Self {
            realm: Some(realm.into()),
            ..self.clone()
        }
    }

    /// Rewrite the destination host.
    #[must_use]
    pub fn use_host(&self, host: impl Into<String>) -> Self {
        Self {
            host: Some(host.into()),
            ..self.clone()
        }
    }

    /// Rewrite the destination port.
    #[must_use]
    pub fn use_port(&self, port: u16) -> Self {
        Self {
            port: Some(port),
            ..self.clone()
        }
    }

    /// Override the protocol name presented to mechanisms.
    #[must_use]
    pub fn use_protocol(&self, protocol: impl Into<String>) -> Self {
        Self {
            protocol: Some(protocol.into()),
            ..self.clone()
        }
    }

    /// Restrict SASL to the given mechanisms.
    ///
    /// Names are compared ASCII case-insensitively. Calling this again
    /// replaces the previous allow-list.
    #[must_use]
    pub fn allow_sasl_mechanisms<I, S>(&self, mechanisms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            sasl_allowed: Some(normalize_mechanisms(mechanisms)),
            ..self.clone()
        }
    }

    /// Never use the given SASL mechanisms. Accumulates across calls.
    #[must_use]
    pub fn forbid_sasl_mechanisms<I, S>(&self, mechanisms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut forbidden = self.sasl_forbidden.clone();
        forbidden.extend(normalize_mechanisms(mechanisms));
        Self {
            sasl_forbidden: forbidden,
            ..self.clone()
        }
    }

    /// Set a mechanism property.
    #[must_use]
    pub fn use_mechanism_property(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut properties = self.properties.clone();
        properties.insert(key.into(), value.into());
        Self {
            properties,
            ..self.clone()
        }
    }

    /// Draw secret material from the given source.
    #[must_use]
    pub fn use_credentials(&self, source: Arc<dyn CredentialSource>) -> Self {
        Self {
            credentials: Some(source),
            ..self.clone()
        }
    }

    /// Build SSL contexts with the given factory.
    #[must_use]
    pub fn use_ssl_context_factory(&self, factory: Arc<dyn SslContextFactory>) -> Self {
        Self {
            ssl: Some(factory),
            ..self.clone()
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Accessors
    // ───────────────────────────────────────────────────────────────────────────

    /// Principal to authenticate as, if set.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Authorization identity, if set.
    #[must_use]
    pub fn authorization_name(&self) -> Option<&str> {
        self.authorization_name.as_deref()
    }

    /// Realm, if set.
    #[must_use]
    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    /// Mechanism properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Credential source, if set.
    #[must_use]
    pub fn credentials(&self) -> Option<&Arc<dyn CredentialSource>> {
        self.credentials.as_ref()
    }

    /// SSL context factory, if set.
    #[must_use]
    pub fn ssl_context_factory(&self) -> Option<&Arc<dyn SslContextFactory>> {
        self.ssl.as_ref()
    }

    /// Host to connect to: the rewrite if set, else the URI's host.
    #[must_use]
    pub fn host_for<'a>(&'a self, uri: &'a Url) -> Option<&'a str> {
        self.host
            .as_deref()
            .or_else(|| uri.host_str().filter(|h| !h.is_empty()))
    }

    /// Port to connect to: the rewrite if set, else the URI's port or the
    /// scheme's well-known default.
    #[must_use]
    pub fn port_for(&self, uri: &Url) -> Option<u16> {
        self.port.or_else(|| uri.port_or_known_default())
    }

    /// Protocol presented to mechanisms: the override if set, else the scheme.
    #[must_use]
    pub fn protocol_for<'a>(&'a self, uri: &'a Url) -> &'a str {
        self.protocol.as_deref().unwrap_or_else(|| uri.scheme())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Collaborator delegation
    // ───────────────────────────────────────────────────────────────────────────

    /// Callback handler answering from this configuration.
    #[must_use]
    pub fn callback_handler(&self) -> ConfigurationCallbackHandler {
        ConfigurationCallbackHandler {
            principal: self.principal.clone(),
            realm: self.realm.clone(),
            credentials: self.credentials.clone(),
        }
    }

    /// Whether a SASL mechanism passes the allow and forbid lists.
    #[must_use]
    pub fn is_sasl_mechanism_allowed(&self, mechanism: &str) -> bool {
        let name = mechanism.to_ascii_uppercase();
        !self.sasl_forbidden.contains(&name)
            && self.sasl_allowed.as_ref().map_or(true, |a| a.contains(&name))
    }

    /// Filter the server's offered mechanisms, keeping the server's order.
    #[must_use]
    pub fn select_sasl_mechanisms<S: AsRef<str>>(&self, offered: &[S]) -> Vec<String> {
        offered
            .iter()
            .map(|m| m.as_ref())
            .filter(|m| self.is_sasl_mechanism_allowed(m))
            .map(str::to_owned)
            .collect()
    }

    /// Create a SASL client for `uri` from the given factory.
    ///
    /// Returns `Ok(None)` when no offered mechanism is acceptable, or the
    /// factory has none of them.
    ///
    /// # Errors
    ///
    /// Propagates the factory's [`SaslError`] unchanged.
    pub fn create_sasl_client<S: AsRef<str>>(
        &self,
        uri: &Url,
        factory: &dyn SaslClientFactory,
        offered: &[S],
    ) -> Result<Option<Box<dyn SaslClient>>, SaslError> {
        let mechanisms = self.select_sasl_mechanisms(offered);
        if mechanisms.is_empty() {
            tracing::debug!(uri = %uri, offered = offered.len(), "no acceptable SASL mechanism");
            return Ok(None);
        }
        tracing::debug!(uri = %uri, mechanisms = ?mechanisms, "creating SASL client");
        let request = SaslClientRequest {
            mechanisms: &mechanisms,
            authorization_id: self.authorization_name.as_deref(),
            protocol: self.protocol_for(uri),
            server_name: self.host_for(uri).unwrap_or_default(),
            properties: &self.properties,
        };
        factory.create_sasl_client(&request, Arc::new(self.callback_handler()))
    }

    /// Create an SSL context.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SslUnavailable`] if no factory is configured,
    /// or the factory's failure as [`ClientError::Ssl`].
    pub fn create_ssl_context(&self) -> Result<Arc<dyn SslContext>, ClientError> {
        let factory = self.ssl.as_ref().ok_or(ClientError::SslUnavailable)?;
        Ok(factory.create()?)
    }

    /// Resolve the destination socket address, applying host/port rewrites.
    ///
    /// The port is the rewrite, else the URI's explicit port, else `default_port`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MissingHost`] if there is no host,
    /// [`ClientError::Io`] if lookup fails, or
    /// [`ClientError::UnresolvedAddress`] if lookup yields nothing.
    pub fn destination_address(&self, uri: &Url, default_port: u16) -> Result<SocketAddr, ClientError> {
        let host = self.host_for(uri).ok_or_else(|| ClientError::MissingHost {
            uri: uri.to_string(),
        })?;
        let port = self.port.or_else(|| uri.port()).unwrap_or(default_port);
        // url keeps IPv6 literals bracketed
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        (bare, port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| ClientError::UnresolvedAddress {
                host: host.to_owned(),
                port,
            })
    }

    /// Open a plain TCP connection to the destination.
    ///
    /// # Errors
    ///
    /// See [`destination_address`](Self::destination_address); connect
    /// failures surface as [`ClientError::Io`].
    pub fn connect(&self, uri: &Url, default_port: u16) -> Result<TcpStream, ClientError> {
        let address = self.destination_address(uri, default_port)?;
        tracing::debug!(uri = %uri, %address, "connecting");
        Ok(TcpStream::connect(address)?)
    }
}

fn normalize_mechanisms<I, S>(mechanisms: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    mechanisms
        .into_iter()
        .map(|m| m.as_ref().to_ascii_uppercase())
        .collect()
}

fn same_collaborator<T: ?Sized>(a: Option<&Arc<T>>, b: Option<&Arc<T>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
        _ => false,
    }
}

impl PartialEq for AuthenticationConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.principal == other.principal
            && self.authorization_name == other.authorization_name
            && self.realm == other.realm
            && self.host == other.host
            && self.port == other.port
            && self.protocol == other.protocol
            && self.sasl_allowed == other.sasl_allowed
            && self.sasl_forbidden == other.sasl_forbidden
            && self.properties == other.properties
            && same_collaborator(self.credentials.as_ref(), other.credentials.as_ref())
            && same_collaborator(self.ssl.as_ref(), other.ssl.as_ref())
    }
}

impl Eq for AuthenticationConfiguration {}

// ═══════════════════════════════════════════════════════════════════════════════
// Callback handler
// ═══════════════════════════════════════════════════════════════════════════════

/// [`CallbackHandler`] that answers from a configuration.
///
/// | Callback | Answer |
/// |----------|--------|
/// | `Name` | configured principal, else the callback's default |
/// | `Realm` | configured realm, else the callback's default |
/// | `RealmChoice` | position of the configured realm among the choices |
/// | `Password`, `Credential` | looked up in the credential source |
/// | `Custom` | [`CallbackError::Unsupported`] |
#[derive(Clone)]
pub struct ConfigurationCallbackHandler {
    principal: Option<Principal>,
    realm: Option<String>,
    credentials: Option<Arc<dyn CredentialSource>>,
}

impl fmt::Debug for ConfigurationCallbackHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationCallbackHandler")
            .field("principal", &self.principal)
            .field("realm", &self.realm)
            .field("credentials", &self.credentials.is_some())
            .finish()
    }
}

impl CallbackHandler for ConfigurationCallbackHandler {
    fn handle(&self, callbacks: &mut [Callback]) -> Result<(), CallbackError> {
        for callback in callbacks.iter_mut() {
            match callback {
                Callback::Name { default, name } => {
                    *name = self
                        .principal
                        .as_ref()
                        .map(|p| p.name().to_owned())
                        .or_else(|| default.clone());
                }
                Callback::Realm { default, realm } => {
                    *realm = self.realm.clone().or_else(|| default.clone());
                }
                Callback::RealmChoice { choices, selected } => {
                    if let Some(realm) = &self.realm {
                        *selected = choices.iter().position(|c| c == realm);
                    }
                }
                Callback::Password { password } => {
                    if let Some(source) = &self.credentials {
                        *password = source
                            .credential(CredentialKind::Password, self.principal.as_ref())?
                            .and_then(|c| match c {
                                crate::Credential::Password(secret) => Some(secret),
                                crate::Credential::BearerToken(_) => None,
                            });
                    }
                }
                Callback::Credential { kind, credential } => {
                    if let Some(source) = &self.credentials {
                        *credential = source.credential(*kind, self.principal.as_ref())?;
                    }
                }
                Callback::Custom { kind } => {
                    return Err(CallbackError::Unsupported { kind: *kind });
                }
            }
        }
        Ok(())
    }
}
