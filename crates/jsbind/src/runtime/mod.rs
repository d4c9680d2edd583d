pub mod context;

pub(crate) mod bindings;
pub(crate) mod conversions;
pub(crate) mod roots;


pub use context::Context;

use crate::config::RuntimeConfig;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Owner of the lock that serializes every engine call.
///
/// A `Runtime` is cheap to clone; clones share the same lock and
/// configuration. Contexts created from it keep it alive.
///
/// The runtime itself is `Send + Sync` and may be shared between threads.
/// Each thread creates its own contexts; those stay on that thread, and their
/// engine calls are serialized through the shared lock.
///
/// The lock is reentrant: a host callback invoked by the engine may call back
/// into any wrapper of the same runtime on the same thread.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    lock: ReentrantMutex<()>,
    config: RuntimeConfig,
    next_context_id: AtomicU64,
}

impl Runtime {
    /// Create a runtime that keeps the engine's default limits
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime whose contexts all use `config`
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                lock: ReentrantMutex::new(()),
                config,
                next_context_id: AtomicU64::new(1),
            }),
        }
    }

    /// Limits applied to every context of this runtime.
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Create a fresh execution context with its own global object.
    ///
    /// The returned handle is a host handle: see [`Context`] for how its
    /// drop releases host callbacks.
    pub fn new_context(&self) -> Context {
        let id = self.inner.next_context_id.fetch_add(1, Ordering::Relaxed);
        Context::create(self.clone(), id)
    }

    /// Run `f` while holding the runtime lock.
    ///
    /// Every wrapper method takes the lock on its own; this groups several of
    /// them into one step that no other context of this runtime can
    /// interleave with.
    ///
    /// ```
    /// use jsbind::Runtime;
    ///
    /// let rt = Runtime::new();
    /// let cx = rt.new_context();
    /// let counter = cx.new_object();
    /// counter.set_int("n", 1).unwrap();
    ///
    /// rt.with_lock(|| {
    ///     let n = counter.get_int("n").unwrap_or(0);
    ///     counter.set_int("n", n + 1).unwrap();
    /// });
    /// assert_eq!(counter.get_int("n"), Some(2));
    /// ```
    pub fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock();
        f()
    }

    pub(crate) fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.lock.lock()
    }

    pub(crate) fn same_runtime(&self, other: &Runtime) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
