//! Process-wide security policy gating privileged entry points.
//!
//! The policy is installed at most once. Until then every permission is
//! granted.

use std::sync::OnceLock;

/// Permission required to construct a [`ConfigurationClient`](crate::ConfigurationClient).
pub const CREATE_CLIENT_PERMISSION: &str = "createAuthenticationContextConfigurationClient";

static POLICY: OnceLock<Box<dyn SecurityPolicy>> = OnceLock::new();

/// Decides whether a named permission is granted.
///
/// Any `Fn(&str) -> bool` closure is a policy:
///
/// ```
/// use authctx::SecurityPolicy;
///
/// let only_reads = |permission: &str| permission.starts_with("read");
/// assert!(only_reads.check_permission("readConfig"));
/// assert!(!only_reads.check_permission("createAuthenticationContextConfigurationClient"));
/// ```
pub trait SecurityPolicy: Send + Sync {
    /// Returns `true` if `permission` is granted.
    fn check_permission(&self, permission: &str) -> bool;
}

impl<F> SecurityPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn check_permission(&self, permission: &str) -> bool {
        self(permission)
    }
}

/// Grants every permission.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityPolicy for AllowAll {
    fn check_permission(&self, _permission: &str) -> bool {
        true
    }
}

/// Install the process-wide policy.
///
/// Returns `false`, leaving the existing policy in place, if one was already
/// installed.
pub fn install_security_policy(policy: impl SecurityPolicy + 'static) -> bool {
    let installed = POLICY.set(Box::new(policy)).is_ok();
    if !installed {
        tracing::warn!("security policy already installed; ignoring replacement");
    }
    installed
}

/// The installed policy, or [`AllowAll`] if none was installed.
pub fn security_policy() -> &'static dyn SecurityPolicy {
    match POLICY.get() {
        Some(policy) => policy.as_ref(),
        None => &AllowAll,
    }
}
