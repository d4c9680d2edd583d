//! Trampolines: native functions the engine calls to reach host closures.
//!
//! A trampoline never holds a pointer to a host wrapper. It captures a weak
//! handle on its context, the root id of the object it was defined on, and a
//! property or function name. At call time it resolves the closure through
//! the context's root table, so a dropped wrapper (or context) makes the call
//! fail instead of dangling.
//!
//! # Reentry
//!
//! Trampolines run inside an engine call made by a wrapper method, with the
//! runtime lock held and the engine context mutably borrowed. Before running
//! host code a trampoline publishes the engine context it was given (see
//! [`Context::publish`]), so wrapper calls made by the host closure reuse it.

use boa_engine::{
    object::{builtins::JsFunction, FunctionObjectBuilder},
    property::PropertyDescriptor,
    Context as BoaContext, JsResult, JsString, JsValue, NativeFunction,
};
use std::rc::Weak;

use crate::accessors::{Accessors, CallbackTable, Read};
use crate::object::{Object, PropertyAttrs};
use crate::runtime::context::ContextInner;
use crate::runtime::roots::{Root, RootId};
use crate::runtime::Context;
use crate::value::Value;

/// What a trampoline needs to find its closure again.
#[derive(Clone)]
struct Binding {
    cx: Weak<ContextInner>,
    root: RootId,
    name: String,
}

impl Binding {
    fn new(cx: &Context, root: RootId, name: &str) -> Self {
        Self {
            cx: cx.downgrade(),
            root,
            name: name.to_owned(),
        }
    }

    fn context(&self) -> JsResult<Context> {
        self.cx
            .upgrade()
            .map(Context::from_inner)
            .ok_or_else(|| Context::type_error(format!("context for '{}' has been dropped", self.name)))
    }

    fn callbacks<R>(&self, cx: &Context, f: impl FnOnce(&CallbackTable) -> Option<R>) -> Option<R> {
        cx.with_roots(|table| {
            table
                .get(self.root)
                .and_then(|entry| entry.callbacks.as_ref())
                .and_then(f)
        })
    }

    fn owner(&self, cx: &Context) -> JsResult<Object> {
        cx.with_roots(|table| table.handle(cx, self.root))
            .map(Object::from_root)
            .ok_or_else(|| Context::type_error(format!("owner of '{}' has been released", self.name)))
    }

    fn read(&self, boa: &mut BoaContext) -> JsResult<JsValue> {
        let cx = self.context()?;
        let _reentry = cx
            .publish(boa)
            .map_err(|e| Context::type_error(e.to_string()))?;

        tracing::trace!(context = cx.id(), property = %self.name, "getter dispatch");
        match self.callbacks(&cx, |table| table.read(&self.name)) {
            Some(Read::Getter(getter)) => {
                let owner = self.owner(&cx)?;
                let value = getter(&owner)
                    .ok_or_else(|| Context::type_error(format!("getter for '{}' failed", self.name)))?;
                value
                    .raw_in(&cx)
                    .map_err(|e| Context::type_error(e.to_string()))
            }
            Some(Read::Stored(value)) => Ok(value),
            None => Err(Context::type_error(format!("no getter registered for '{}'", self.name))),
        }
    }

    fn write(&self, args: &[JsValue], boa: &mut BoaContext) -> JsResult<JsValue> {
        let cx = self.context()?;
        let _reentry = cx
            .publish(boa)
            .map_err(|e| Context::type_error(e.to_string()))?;

        tracing::trace!(context = cx.id(), property = %self.name, "setter dispatch");
        let setter = self
            .callbacks(&cx, |table| table.setter(&self.name))
            .ok_or_else(|| Context::type_error(format!("no setter registered for '{}'", self.name)))?;
        let owner = self.owner(&cx)?;

        let raw = args.first().cloned().unwrap_or_default();
        let value = Value::from_raw(&cx, raw.clone());
        setter(&owner, &value);

        let root = self.root;
        cx.with_roots(|table| {
            if let Some(callbacks) = table.get_mut(root).and_then(|entry| entry.callbacks.as_mut()) {
                callbacks.store(&self.name, raw);
            }
        });
        Ok(JsValue::undefined())
    }

    fn call(&self, args: &[JsValue], boa: &mut BoaContext) -> JsResult<JsValue> {
        let cx = self.context()?;
        let _reentry = cx
            .publish(boa)
            .map_err(|e| Context::type_error(e.to_string()))?;

        tracing::trace!(context = cx.id(), function = %self.name, argc = args.len(), "function dispatch");
        let function = self
            .callbacks(&cx, |table| table.function(&self.name))
            .ok_or_else(|| Context::type_error(format!("no host function registered for '{}'", self.name)))?;

        let argv: Vec<Value> = args
            .iter()
            .map(|arg| Value::from_raw(&cx, arg.clone()))
            .collect();

        let result = function(&cx, &argv)
            .ok_or_else(|| Context::type_error(format!("host function '{}' failed", self.name)))?;
        result
            .raw_in(&cx)
            .map_err(|e| Context::type_error(e.to_string()))
    }
}

fn build(boa: &mut BoaContext, label: String, length: usize, native: NativeFunction) -> JsFunction {
    FunctionObjectBuilder::new(boa.realm(), native)
        .name(JsString::from(label.as_str()))
        .length(length)
        .build()
}

fn getter_function(boa: &mut BoaContext, binding: Binding) -> JsFunction {
    let label = format!("get {}", binding.name);
    // SAFETY: the closure only captures a weak context handle, an id and a
    // `String`; nothing in it is managed by the engine's collector.
    let native = unsafe { NativeFunction::from_closure(move |_this, _args, boa| binding.read(boa)) };
    build(boa, label, 0, native)
}

fn setter_function(boa: &mut BoaContext, binding: Binding) -> JsFunction {
    let label = format!("set {}", binding.name);
    // SAFETY: as for `getter_function`.
    let native = unsafe { NativeFunction::from_closure(move |_this, args, boa| binding.write(args, boa)) };
    build(boa, label, 1, native)
}

fn host_function(boa: &mut BoaContext, binding: Binding) -> JsFunction {
    let label = binding.name.clone();
    // SAFETY: as for `getter_function`.
    let native = unsafe { NativeFunction::from_closure(move |_this, args, boa| binding.call(args, boa)) };
    build(boa, label, 0, native)
}

/// Descriptor for an accessor property whose reads and writes go through
/// trampolines bound to `root` and `name`.
///
/// The getter trampoline is always installed: for setter-only properties it
/// returns the last written value. A missing setter is stated explicitly so a
/// redefinition clears the previous one.
pub(crate) fn accessor_descriptor(
    boa: &mut BoaContext,
    root: &Root,
    name: &str,
    accessors: &Accessors,
    attrs: PropertyAttrs,
) -> PropertyDescriptor {
    let binding = Binding::new(root.context(), root.id(), name);

    let set: JsValue = if accessors.has_setter() {
        setter_function(boa, binding.clone()).into()
    } else {
        JsValue::undefined()
    };

    PropertyDescriptor::builder()
        .get(getter_function(boa, binding))
        .set(set)
        .enumerable(attrs.contains(PropertyAttrs::ENUMERATE))
        .configurable(!attrs.contains(PropertyAttrs::PERMANENT))
        .build()
}

/// Descriptor for a writable, configurable, non-enumerable host function.
pub(crate) fn function_descriptor(boa: &mut BoaContext, root: &Root, name: &str) -> PropertyDescriptor {
    let binding = Binding::new(root.context(), root.id(), name);
    PropertyDescriptor::builder()
        .value(host_function(boa, binding))
        .writable(true)
        .enumerable(false)
        .configurable(true)
        .build()
}

/// Descriptor for a plain data property.
pub(crate) fn value_descriptor(value: JsValue, attrs: PropertyAttrs) -> PropertyDescriptor {
    PropertyDescriptor::builder()
        .value(value)
        .writable(!attrs.contains(PropertyAttrs::READONLY))
        .enumerable(attrs.contains(PropertyAttrs::ENUMERATE))
        .configurable(!attrs.contains(PropertyAttrs::PERMANENT))
        .build()
}
