//! Collaborator traits: the narrow seams the core calls into.
//!
//! The core decides *which* configuration applies; everything that acts on
//! that decision lives behind one of these traits:
//!
//! | Seam | Trait | Called by |
//! |------|-------|-----------|
//! | Secret material | [`CredentialSource`] | [`ConfigurationCallbackHandler`](crate::ConfigurationCallbackHandler) |
//! | Mechanism prompts | [`CallbackHandler`] | SASL mechanism clients |
//! | SASL mechanisms | [`SaslClientFactory`] / [`SaslClient`] | [`AuthenticationConfiguration::create_sasl_client`](crate::AuthenticationConfiguration::create_sasl_client) |
//! | Secure transport | [`SslContextFactory`] / [`SslContext`] | [`AuthenticationConfiguration::create_ssl_context`](crate::AuthenticationConfiguration::create_ssl_context) |
//!
//! Failures raised behind these traits propagate to the caller unchanged.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::{CallbackError, CredentialError, SaslError, SslError};

// ═══════════════════════════════════════════════════════════════════════════════
// Identity and credentials
// ═══════════════════════════════════════════════════════════════════════════════

/// Name under which a client authenticates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Principal(String);

impl Principal {
    /// Create a principal from a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The principal's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of credential a mechanism asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKind {
    /// Clear password.
    Password,
    /// Opaque bearer token.
    BearerToken,
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Password => "password",
            Self::BearerToken => "bearer_token",
        })
    }
}

/// Secret material supplied by a [`CredentialSource`].
///
/// Secrets are zeroized on drop and never appear in `Debug` output.
///
/// ```
/// use authctx::Credential;
///
/// let cred = Credential::password("hunter2");
/// let debug = format!("{cred:?}");
/// assert!(!debug.contains("hunter2"));
/// assert!(debug.contains("[REDACTED]"));
/// ```
#[derive(Clone)]
pub enum Credential {
    /// Clear password.
    Password(Zeroizing<String>),
    /// Opaque bearer token.
    BearerToken(Zeroizing<String>),
}

impl Credential {
    /// Password credential.
    #[must_use]
    pub fn password(secret: impl Into<String>) -> Self {
        Self::Password(Zeroizing::new(secret.into()))
    }

    /// Bearer token credential.
    #[must_use]
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(Zeroizing::new(token.into()))
    }

    /// The kind of this credential.
    #[must_use]
    pub fn kind(&self) -> CredentialKind {
        match self {
            Self::Password(_) => CredentialKind::Password,
            Self::BearerToken(_) => CredentialKind::BearerToken,
        }
    }

    /// The secret itself.
    #[must_use]
    pub fn secret(&self) -> &str {
        match self {
            Self::Password(s) | Self::BearerToken(s) => s.as_str(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.debug_tuple("Password").field(&"[REDACTED]").finish(),
            Self::BearerToken(_) => f.debug_tuple("BearerToken").field(&"[REDACTED]").finish(),
        }
    }
}

/// Source of secret material for a resolved configuration.
///
/// Implementations are backed by key stores, vaults, directories, or memory.
/// The core never inspects the returned secret.
pub trait CredentialSource: Send + Sync + fmt::Debug {
    /// Look up a credential of the given kind.
    ///
    /// Returns `Ok(None)` if this source holds no credential of that kind.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] if the backing store fails.
    fn credential(
        &self,
        kind: CredentialKind,
        principal: Option<&Principal>,
    ) -> Result<Option<Credential>, CredentialError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// Callbacks
// ═══════════════════════════════════════════════════════════════════════════════

/// A prompt raised by a mechanism, answered in place by a [`CallbackHandler`].
#[derive(Clone)]
pub enum Callback {
    /// Authentication name.
    Name {
        /// Name to use if the handler has none.
        default: Option<String>,
        /// Answer.
        name: Option<String>,
    },
    /// Realm name.
    Realm {
        /// Realm to use if the handler has none.
        default: Option<String>,
        /// Answer.
        realm: Option<String>,
    },
    /// Choice among realms offered by the server.
    RealmChoice {
        /// Offered realms.
        choices: Vec<String>,
        /// Answer: index into `choices`.
        selected: Option<usize>,
    },
    /// Clear password.
    Password {
        /// Answer.
        password: Option<Zeroizing<String>>,
    },
    /// Credential of a specific kind.
    Credential {
        /// Requested kind.
        kind: CredentialKind,
        /// Answer.
        credential: Option<Credential>,
    },
    /// A callback this crate has no model for.
    Custom {
        /// Mechanism-defined callback kind.
        kind: &'static str,
    },
}

impl Callback {
    /// Name callback with no default.
    #[must_use]
    pub fn name() -> Self {
        Self::Name {
            default: None,
            name: None,
        }
    }

    /// Realm callback with no default.
    #[must_use]
    pub fn realm() -> Self {
        Self::Realm {
            default: None,
            realm: None,
        }
    }

    /// Password callback.
    #[must_use]
    pub fn password() -> Self {
        Self::Password { password: None }
    }

    /// Kind name, for error reporting.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Name { .. } => "name",
            Self::Realm { .. } => "realm",
            Self::RealmChoice { .. } => "realm_choice",
            Self::Password { .. } => "password",
            Self::Credential { .. } => "credential",
            Self::Custom { kind } => kind,
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name { default, name } => f
                .debug_struct("Name")
                .field("default", default)
                .field("name", name)
                .finish(),
            Self::Realm { default, realm } => f
                .debug_struct("Realm")
                .field("default", default)
                .field("realm", realm)
                .finish(),
            Self::RealmChoice { choices, selected } => f
                .debug_struct("RealmChoice")
                .field("choices", choices)
                .field("selected", selected)
                .finish(),
            Self::Password { password } => f
                .debug_struct("Password")
                .field("password", &password.as_ref().map(|_| "[REDACTED]"))
                .finish(),
            Self::Credential { kind, credential } => f
                .debug_struct("Credential")
                .field("kind", kind)
                .field("credential", credential)
                .finish(),
            Self::Custom { kind } => f.debug_struct("Custom").field("kind", kind).finish(),
        }
    }
}

/// Answers the prompts a mechanism raises during authentication.
pub trait CallbackHandler: Send + Sync {
    /// Fill in the answer of every callback.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::Unsupported`] for a callback the handler
    /// cannot answer, or the credential source's failure.
    fn handle(&self, callbacks: &mut [Callback]) -> Result<(), CallbackError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SASL
// ═══════════════════════════════════════════════════════════════════════════════

/// Client side of one SASL exchange.
pub trait SaslClient: Send + fmt::Debug {
    /// IANA mechanism name (e.g. `"PLAIN"`).
    fn mechanism_name(&self) -> &str;

    /// Whether the mechanism sends data before the first challenge.
    fn has_initial_response(&self) -> bool;

    /// Produce the response to a server challenge (empty for the initial response).
    ///
    /// # Errors
    ///
    /// Returns [`SaslError`] if the exchange cannot continue.
    fn evaluate_challenge(&mut self, challenge: &[u8]) -> Result<Vec<u8>, SaslError>;

    /// Whether the exchange has finished.
    fn is_complete(&self) -> bool;
}

/// Parameters handed to a [`SaslClientFactory`].
#[derive(Debug, Clone, Copy)]
pub struct SaslClientRequest<'a> {
    /// Acceptable mechanisms, in preference order.
    pub mechanisms: &'a [String],
    /// Identity to act as, if different from the authentication name.
    pub authorization_id: Option<&'a str>,
    /// Protocol name (e.g. `"ldap"`).
    pub protocol: &'a str,
    /// Fully qualified server name.
    pub server_name: &'a str,
    /// Mechanism properties.
    pub properties: &'a BTreeMap<String, String>,
}

/// Creates [`SaslClient`]s.
pub trait SaslClientFactory: Send + Sync {
    /// Mechanisms this factory implements.
    fn mechanism_names(&self) -> Vec<String>;

    /// Create a client for the first acceptable mechanism it supports.
    ///
    /// Returns `Ok(None)` if none of the requested mechanisms is available.
    ///
    /// # Errors
    ///
    /// Returns [`SaslError`] if client construction fails.
    fn create_sasl_client(
        &self,
        request: &SaslClientRequest<'_>,
        callbacks: Arc<dyn CallbackHandler>,
    ) -> Result<Option<Box<dyn SaslClient>>, SaslError>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SSL
// ═══════════════════════════════════════════════════════════════════════════════

/// Usable secure-transport context.
pub trait SslContext: Send + Sync + fmt::Debug {
    /// Protocol the context negotiates (e.g. `"TLSv1.3"`).
    fn protocol(&self) -> &str;
}

/// Builds [`SslContext`]s on demand.
pub trait SslContextFactory: Send + Sync + fmt::Debug {
    /// Create an SSL context.
    ///
    /// # Errors
    ///
    /// Returns [`SslError`] if key material or trust configuration is unusable.
    fn create(&self) -> Result<Arc<dyn SslContext>, SslError>;
}
