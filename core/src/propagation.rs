//! Context propagation: which [`AuthenticationContext`] is current.
//!
//! Each thread carries its own association. Code running under
//! [`AuthenticationContext::run`] sees that context from
//! [`capture_current`]; everywhere else, `capture_current` falls back to the
//! process-wide default, which is written at most once.
//!
//! Associations nest with strict LIFO discipline. [`associate`] returns a
//! [`ScopeGuard`] that restores the previous association when dropped, so
//! restoration happens on return, on `?`, and during panic unwinding.
//!
//! # Hand-off to other threads
//!
//! A worker thread does not see its spawner's association. Capture a
//! [`ContextSnapshot`] on the submitting thread and [`wrap`](ContextSnapshot::wrap)
//! the task, or use [`spawn`]:
//!
//! ```
//! use authctx::{propagation, AuthenticationConfiguration, AuthenticationContext, MatchRule};
//!
//! let ctx = AuthenticationContext::empty()
//!     .with(MatchRule::ALL, AuthenticationConfiguration::empty().use_name("alice"));
//!
//! let seen = ctx.run(|| propagation::spawn(AuthenticationContext::capture_current).join().unwrap());
//! assert_eq!(seen, ctx);
//! ```
//!
//! Executors that propagate several kinds of context at once use the
//! object-safe [`ThreadContextProvider`] seam instead.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::OnceLock;
use std::thread::JoinHandle;

use crate::AuthenticationContext;

thread_local! {
    static CURRENT: RefCell<Option<AuthenticationContext>> = const { RefCell::new(None) };
}

static GLOBAL_DEFAULT: OnceLock<AuthenticationContext> = OnceLock::new();

// ═══════════════════════════════════════════════════════════════════════════════
// Global default
// ═══════════════════════════════════════════════════════════════════════════════

/// Initialize the process-wide default context.
///
/// Only the first call runs `init`; later calls (from any thread) return the
/// value the first call stored.
pub fn initialize_global_default<F>(init: F) -> &'static AuthenticationContext
where
    F: FnOnce() -> AuthenticationContext,
{
    GLOBAL_DEFAULT.get_or_init(|| {
        let ctx = init();
        tracing::debug!(rules = ctx.len(), "global default context initialized");
        ctx
    })
}

/// The process-wide default context, or the empty context if none was set.
#[must_use]
pub fn global_default() -> AuthenticationContext {
    GLOBAL_DEFAULT
        .get()
        .cloned()
        .unwrap_or_else(AuthenticationContext::empty)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Thread association
// ═══════════════════════════════════════════════════════════════════════════════

/// The context associated with the calling thread, or [`global_default`].
#[must_use]
pub fn capture_current() -> AuthenticationContext {
    CURRENT
        .with(|current| current.borrow().clone())
        .unwrap_or_else(global_default)
}

/// Associate `ctx` with the calling thread until the guard is dropped.
#[must_use = "the association ends when the guard is dropped"]
pub fn associate(ctx: AuthenticationContext) -> ScopeGuard {
    install(Some(ctx))
}

fn install(next: Option<AuthenticationContext>) -> ScopeGuard {
    let rules = next.as_ref().map(AuthenticationContext::len);
    let previous = CURRENT.with(|current| current.replace(next));
    tracing::trace!(rules = ?rules, "scope entered");
    ScopeGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Restores the previous association on drop.
///
/// Tied to the thread that created it.
pub struct ScopeGuard {
    previous: Option<AuthenticationContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // Thread-local may already be gone during thread teardown.
        let _ = CURRENT.try_with(|current| *current.borrow_mut() = previous);
        tracing::trace!("scope exited");
    }
}

impl std::fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("restores", &self.previous.as_ref().map(AuthenticationContext::len))
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Snapshots
// ═══════════════════════════════════════════════════════════════════════════════

/// A captured association, ready to be re-established on another thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    context: Option<AuthenticationContext>,
}

impl ContextSnapshot {
    /// Capture the calling thread's association.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            context: CURRENT.with(|current| current.borrow().clone()),
        }
    }

    /// A snapshot of "nothing associated": tasks see the global default.
    #[must_use]
    pub fn cleared() -> Self {
        Self { context: None }
    }

    /// The context a task running under this snapshot will observe.
    #[must_use]
    pub fn context(&self) -> AuthenticationContext {
        self.context.clone().unwrap_or_else(global_default)
    }

    /// Establish the snapshot on the calling thread until the guard drops.
    #[must_use = "the association ends when the guard is dropped"]
    pub fn begin(&self) -> ScopeGuard {
        install(self.context.clone())
    }

    /// Wrap `task` so it runs under this snapshot wherever it is called.
    pub fn wrap<F, T>(self, task: F) -> impl FnOnce() -> T + Send
    where
        F: FnOnce() -> T + Send,
    {
        move || {
            let _scope = self.begin();
            task()
        }
    }
}

/// [`std::thread::spawn`] carrying the caller's association into the new thread.
pub fn spawn<F, T>(task: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::spawn(ContextSnapshot::capture().wrap(task))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Provider seam
// ═══════════════════════════════════════════════════════════════════════════════

/// A kind of thread context an executor can capture and re-establish.
pub trait ThreadContextProvider: Send + Sync {
    /// Name executors use to select this provider.
    fn thread_context_type(&self) -> &'static str;

    /// Capture the calling thread's context.
    fn current_context(&self, props: &BTreeMap<String, String>) -> Box<dyn ThreadContextSnapshot>;

    /// A snapshot that clears this kind of context.
    fn cleared_context(&self, props: &BTreeMap<String, String>) -> Box<dyn ThreadContextSnapshot>;
}

/// Captured context, movable to the thread that will run the task.
pub trait ThreadContextSnapshot: Send {
    /// Establish the context on the calling thread.
    fn begin(&self) -> Box<dyn ThreadContextController>;
}

/// Ends a context established by [`ThreadContextSnapshot::begin`].
pub trait ThreadContextController {
    /// Restore what was associated before `begin`.
    fn end(self: Box<Self>);
}

impl ThreadContextSnapshot for ContextSnapshot {
    fn begin(&self) -> Box<dyn ThreadContextController> {
        Box::new(ContextSnapshot::begin(self))
    }
}

impl ThreadContextController for ScopeGuard {
    fn end(self: Box<Self>) {
        drop(self);
    }
}

/// [`ThreadContextProvider`] for [`AuthenticationContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticationContextProvider;

impl AuthenticationContextProvider {
    /// Context type name.
    pub const TYPE: &'static str = "AuthenticationContext";
}

impl ThreadContextProvider for AuthenticationContextProvider {
    fn thread_context_type(&self) -> &'static str {
        Self::TYPE
    }

    fn current_context(&self, _props: &BTreeMap<String, String>) -> Box<dyn ThreadContextSnapshot> {
        Box::new(ContextSnapshot::capture())
    }

    fn cleared_context(&self, _props: &BTreeMap<String, String>) -> Box<dyn ThreadContextSnapshot> {
        Box::new(ContextSnapshot::cleared())
    }
}
