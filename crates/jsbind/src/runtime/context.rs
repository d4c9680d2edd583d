use boa_engine::{js_string, object::builtins::JsArray, Context as BoaContext, JsObject, JsString, JsValue, Source};
use std::cell::{Cell, RefCell};
use std::mem::ManuallyDrop;
use std::path::Path;
use std::ptr::NonNull;
use std::rc::{Rc, Weak};

use crate::array::Array;
use crate::error::{JsbindError, Result};
use crate::object::Object;
use crate::runtime::roots::{self, RootTable};
use crate::runtime::{conversions, Runtime};
use crate::value::Value;
use serde_json::Value as JsonValue;

/// Receives script errors raised by [`Context::eval`] and [`Context::exec`].
pub type ErrorReporter = Rc<dyn Fn(&str)>;

/// One engine execution context.
///
/// A `Context` is a handle; clones refer to the same engine context. All
/// engine state behind it is only touched while the owning runtime's lock is
/// held.
///
/// A context is confined to the thread that created it. The engine's
/// collector allocates from a per-thread heap that is torn down when the
/// thread exits, so neither `Context` nor the wrappers built from it are
/// `Send`.
///
/// ```compile_fail
/// use jsbind::Runtime;
///
/// let cx = Runtime::new().new_context();
/// std::thread::spawn(move || cx.new_object());
/// ```
///
/// # Host handles
///
/// The handle returned by [`Runtime::new_context`], and its clones, keep the
/// host callbacks of this context registered. When the last of them is
/// dropped every callback table is cleared, which also drops any wrappers
/// the closures captured. Handles reached through a wrapper
/// ([`Object::context`], [`Value::context`], a callback argument) do not
/// count, so a closure may hold them without keeping the context alive. A
/// closure that captures a host handle keeps its own callbacks registered
/// for good; use the callback's `&Context` argument instead.
#[derive(Clone)]
pub struct Context {
    handle: Option<Rc<HostHandle>>,
    inner: Rc<ContextInner>,
}

pub(crate) struct ContextInner {
    runtime: Runtime,
    id: u64,
    /// False once the last host handle is gone.
    live: Cell<bool>,
    reporter: RefCell<Option<ErrorReporter>>,
    engine: ManuallyDrop<Engine>,
}

/// Shared by the host handles of one context.
struct HostHandle {
    cx: Weak<ContextInner>,
}

impl Drop for HostHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.cx.upgrade() {
            Context::from_inner(inner).release_callbacks();
        }
    }
}

/// Engine state of a context.
///
/// Field order matters: roots (and the callbacks they own) are dropped before
/// the engine context itself.
pub(crate) struct Engine {
    roots: RefCell<RootTable>,
    /// Engine context published by a running trampoline. While set, nested
    /// wrapper calls on this thread must use it instead of `boa`, which is
    /// already mutably borrowed further up the stack.
    active: Cell<Option<NonNull<BoaContext>>>,
    boa: RefCell<BoaContext>,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        let runtime = self.runtime.clone();
        let _guard = runtime.lock();
        tracing::debug!(context = self.id, "dropping context");
        // SAFETY: `engine` is never used again; this is the only place that
        // drops it.
        unsafe { ManuallyDrop::drop(&mut self.engine) };
    }
}

/// Withdraws a published engine context when dropped.
pub(crate) struct ReentryGuard<'a> {
    engine: &'a Engine,
    previous: Option<NonNull<BoaContext>>,
    _boa: std::marker::PhantomData<&'a mut BoaContext>,
}

impl Drop for ReentryGuard<'_> {
    fn drop(&mut self) {
        self.engine.active.set(self.previous);
    }
}

impl Context {
    pub(crate) fn create(runtime: Runtime, id: u64) -> Self {
        let mut boa = BoaContext::default();
        runtime.config().apply(&mut boa);
        let global = boa.global_object();

        let inner = Rc::new(ContextInner {
            runtime,
            id,
            live: Cell::new(true),
            reporter: RefCell::new(None),
            engine: ManuallyDrop::new(Engine {
                roots: RefCell::new(RootTable::with_global(global)),
                active: Cell::new(None),
                boa: RefCell::new(boa),
            }),
        });

        tracing::debug!(context = id, "created context");
        let handle = Rc::new(HostHandle {
            cx: Rc::downgrade(&inner),
        });
        Self {
            handle: Some(handle),
            inner,
        }
    }

    /// A handle that does not keep host callbacks registered.
    pub(crate) fn from_inner(inner: Rc<ContextInner>) -> Self {
        Self { handle: None, inner }
    }

    /// This context without its host handle, for storing inside wrappers.
    pub(crate) fn detached(&self) -> Self {
        Self::from_inner(self.inner.clone())
    }

    pub(crate) fn downgrade(&self) -> Weak<ContextInner> {
        Rc::downgrade(&self.inner)
    }

    /// The runtime whose lock guards this context.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Identifier unique within the runtime, used in log records.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// True when both handles refer to the same engine context.
    pub fn same_context(&self, other: &Context) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// False once every host handle has been dropped. New callbacks are
    /// refused from then on.
    pub fn is_live(&self) -> bool {
        self.inner.live.get()
    }

    pub(crate) fn ensure_live(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(JsbindError::ContextReleased)
        }
    }

    /// Clear every callback table. Closures are dropped after the table
    /// borrow ends since they may own wrappers of this context.
    fn release_callbacks(&self) {
        let _guard = self.lock();
        self.inner.live.set(false);
        let tables = self.with_roots(|table| table.take_callbacks());
        tracing::debug!(context = self.id(), tables = tables.len(), "released host callbacks");
        drop(tables);
    }

    // ------------------------------------------------------------------
    // Engine access
    // ------------------------------------------------------------------

    /// Run `f` against the engine context under the runtime lock.
    ///
    /// Must not be nested directly; nested engine access is only legal from
    /// inside a trampoline, which publishes the running context first.
    pub(crate) fn with_boa<R>(&self, f: impl FnOnce(&mut BoaContext) -> R) -> R {
        let _guard = self.inner.runtime.lock();
        let engine = &*self.inner.engine;

        if let Some(mut active) = engine.active.get() {
            // SAFETY: `active` was published by a trampoline on this thread
            // (only the lock owner can see it) from the `&mut BoaContext` the
            // engine handed it. The trampoline does not touch that reference
            // until its `ReentryGuard` withdraws the pointer, so this is the
            // only live mutable path to the context.
            return f(unsafe { active.as_mut() });
        }

        let mut boa = engine.boa.borrow_mut();
        f(&mut boa)
    }

    /// Run `f` against the root table under the runtime lock.
    pub(crate) fn with_roots<R>(&self, f: impl FnOnce(&mut RootTable) -> R) -> R {
        let _guard = self.inner.runtime.lock();
        let mut roots = self.inner.engine.roots.borrow_mut();
        f(&mut roots)
    }

    /// Publish the engine context a trampoline was invoked with.
    ///
    /// Fails when the engine context is not this context's own, which happens
    /// when a function defined here is called from another context.
    pub(crate) fn publish<'a>(&'a self, boa: &'a mut BoaContext) -> Result<ReentryGuard<'a>> {
        let engine = &*self.inner.engine;
        let published = NonNull::from(boa);

        let own = match engine.active.get() {
            Some(active) => active == published,
            None => std::ptr::eq(engine.boa.as_ptr(), published.as_ptr()),
        };
        if !own {
            return Err(JsbindError::ForeignContext);
        }

        let previous = engine.active.replace(Some(published));
        Ok(ReentryGuard {
            engine,
            previous,
            _boa: std::marker::PhantomData,
        })
    }

    pub(crate) fn lock(&self) -> parking_lot::ReentrantMutexGuard<'_, ()> {
        self.inner.runtime.lock()
    }

    // ------------------------------------------------------------------
    // Value factories
    // ------------------------------------------------------------------

    /// The `undefined` value.
    pub fn undefined(&self) -> Value {
        Value::from_raw(self, JsValue::undefined())
    }

    /// The `null` value.
    pub fn null(&self) -> Value {
        Value::from_raw(self, JsValue::null())
    }

    /// A number holding `v`.
    pub fn int(&self, v: i32) -> Value {
        Value::from_raw(self, JsValue::new(v))
    }

    /// A number holding `v`.
    pub fn number(&self, v: f64) -> Value {
        Value::from_raw(self, JsValue::new(v))
    }

    /// A boolean holding `v`.
    pub fn boolean(&self, v: bool) -> Value {
        Value::from_raw(self, JsValue::new(v))
    }

    /// Copy `v` into an engine string.
    pub fn string(&self, v: &str) -> Value {
        let _guard = self.lock();
        Value::from_raw(self, JsValue::new(JsString::from(v)))
    }

    /// Build an engine value from JSON.
    pub fn value_from_json(&self, json: &JsonValue) -> Result<Value> {
        let _guard = self.lock();
        let raw = self.with_boa(|boa| conversions::json_to_js_value(json, boa))?;
        Ok(Value::from_raw(self, raw))
    }

    /// A new plain object with the standard prototype.
    pub fn new_object(&self) -> Object {
        let _guard = self.lock();
        let object = self.with_boa(|boa| JsObject::with_object_proto(boa.intrinsics()));
        Object::wrap(self, object)
    }

    /// A new empty array.
    pub fn new_array(&self) -> Array {
        let _guard = self.lock();
        let array = self.with_boa(|boa| JsArray::new(boa));
        Array::wrap(self, JsObject::clone(&array))
    }

    /// The global object.
    ///
    /// Its root is pinned for the life of the context, so host functions and
    /// accessors defined on it keep working after the returned wrapper is
    /// dropped.
    pub fn global(&self) -> Object {
        Object::from_root(roots::global(self))
    }

    /// Define a host function on the global object.
    pub fn define_function<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: Fn(&Context, &[Value]) -> Option<Value> + 'static,
    {
        self.global().define_function(name, callback)
    }

    // ------------------------------------------------------------------
    // Script execution
    // ------------------------------------------------------------------

    /// Evaluate `source` and return its completion value.
    pub fn eval(&self, source: &str) -> Result<Value> {
        tracing::debug!(context = self.id(), bytes = source.len(), "eval");
        let _guard = self.lock();

        match self.with_boa(|boa| boa.eval(Source::from_bytes(source))) {
            Ok(raw) => Ok(Value::from_raw(self, raw)),
            Err(e) => {
                let message = e.to_string();
                self.report(&message);
                Err(JsbindError::JavaScriptExecution(message))
            }
        }
    }

    /// Evaluate `source` for its side effects.
    pub fn exec(&self, source: &str) -> Result<()> {
        self.eval(source).map(|_| ())
    }

    /// Load and evaluate a script file.
    pub fn eval_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        tracing::debug!(context = self.id(), path = %path.display(), "loaded script");
        self.eval(&source)
    }

    /// Route script errors to `reporter` instead of the log.
    pub fn set_error_reporter<F>(&self, reporter: F)
    where
        F: Fn(&str) + 'static,
    {
        *self.inner.reporter.borrow_mut() = Some(Rc::new(reporter));
    }

    /// Go back to logging script errors.
    pub fn clear_error_reporter(&self) {
        *self.inner.reporter.borrow_mut() = None;
    }

    fn report(&self, message: &str) {
        let reporter = self.inner.reporter.borrow().clone();
        match reporter {
            Some(reporter) => reporter(message),
            None => tracing::warn!(context = self.id(), error = %message, "script error"),
        }
    }

    /// Throwable engine error used by trampolines.
    pub(crate) fn type_error(message: impl Into<String>) -> boa_engine::JsError {
        boa_engine::JsNativeError::typ()
            .with_message(message.into())
            .into()
    }

    pub(crate) fn length_key() -> JsString {
        js_string!("length")
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.inner.id)
            .field("host_handle", &self.handle.is_some())
            .finish()
    }
}
