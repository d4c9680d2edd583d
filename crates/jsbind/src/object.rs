use bitflags::bitflags;
use boa_engine::{JsObject, JsString};
use std::rc::Rc;

use crate::accessors::{Accessors, CallbackTable, Displaced};
use crate::array::Array;
use crate::error::{JsbindError, Result};
use crate::runtime::roots::{self, Root};
use crate::runtime::{bindings, Context, Runtime};
use crate::value::{self, Value};

bitflags! {
    /// Property attributes, handed to the engine when a property is defined.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PropertyAttrs: u8 {
        /// The property is visible to `for...in` loops.
        const ENUMERATE = 0x01;
        /// The property's value cannot be set.
        const READONLY = 0x02;
        /// The property cannot be deleted.
        const PERMANENT = 0x04;
    }
}

/// A rooted JavaScript object.
///
/// The engine object stays alive while any clone of this wrapper exists.
/// Clones share one root: [`Object::dispose`] on any of them releases it for
/// all.
///
/// Host callbacks registered with [`Object::define_property`] and
/// [`Object::define_function`] belong to this wrapper's root. Once it is
/// released, engine calls to those properties fail. Callbacks registered on
/// [`Context::global`] live as long as the context's host handles.
#[derive(Clone)]
pub struct Object {
    root: Rc<Root>,
}

impl Object {
    pub(crate) fn wrap(cx: &Context, object: JsObject) -> Self {
        Self {
            root: roots::register(cx, object),
        }
    }

    pub(crate) fn from_root(root: Rc<Root>) -> Self {
        Self { root }
    }

    /// The context this object lives in.
    pub fn context(&self) -> &Context {
        self.root.context()
    }

    /// Shorthand for `self.context().runtime()`.
    pub fn runtime(&self) -> &Runtime {
        self.context().runtime()
    }

    /// This object as a [`Value`].
    pub fn to_value(&self) -> Result<Value> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;
        Ok(Value::from_raw(cx, object.into()))
    }

    /// Release the root now instead of on drop.
    ///
    /// Returns `false` if it was already released. Every later call on this
    /// wrapper or its clones fails with [`JsbindError::Disposed`].
    pub fn dispose(&self) -> bool {
        self.root.release()
    }

    /// True once [`Object::dispose`] ran on this wrapper or a clone.
    pub fn is_disposed(&self) -> bool {
        self.root.is_released()
    }

    /// Read a property. A missing property reads as undefined; `Err` means
    /// the engine call itself failed (a throwing getter, a disposed wrapper).
    pub fn get_property(&self, name: &str) -> Result<Value> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;

        tracing::trace!(context = cx.id(), property = name, "get property");
        let raw = cx
            .with_boa(|boa| object.get(JsString::from(name), boa))
            .map_err(JsbindError::engine)?;
        Ok(Value::from_raw(cx, raw))
    }

    /// Write a property. Fails with [`JsbindError::PropertyRejected`] when the
    /// engine refuses the write, e.g. for a read-only property.
    pub fn set_property(&self, name: &str, value: &Value) -> Result<()> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;
        let raw = value.raw_in(cx)?;

        tracing::trace!(context = cx.id(), property = name, "set property");
        let written = cx
            .with_boa(|boa| object.set(JsString::from(name), raw, false, boa))
            .map_err(JsbindError::engine)?;
        if !written {
            return Err(JsbindError::PropertyRejected(name.to_owned()));
        }
        Ok(())
    }

    /// Define a plain data property with the given attributes.
    pub fn define_value(&self, name: &str, value: &Value, attrs: PropertyAttrs) -> Result<()> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;
        let raw = value.raw_in(cx)?;

        let descriptor = bindings::value_descriptor(raw, attrs);
        cx.with_boa(|boa| object.define_property_or_throw(JsString::from(name), descriptor, boa))
            .map_err(JsbindError::engine)?;
        Ok(())
    }

    /// Define an accessor property backed by host closures.
    ///
    /// Reads call the getter. Writes call the setter. With a setter but no
    /// getter, reads return the last written value, starting with `value`;
    /// `value` is not used otherwise. With a getter but no setter, writes
    /// behave like writes to any getter-only accessor.
    ///
    /// On success the closures replace whatever was registered under `name`.
    /// Fails with [`JsbindError::ContextReleased`] once the context's host
    /// handles are gone.
    ///
    /// # Panics
    ///
    /// Panics if `accessors` has neither a getter nor a setter, or if this
    /// object is an array. Both are usage errors rather than runtime
    /// conditions.
    pub fn define_property(
        &self,
        name: &str,
        value: &Value,
        accessors: Accessors,
        attrs: PropertyAttrs,
    ) -> Result<()> {
        if !accessors.has_getter() && !accessors.has_setter() {
            panic!("define_property('{name}'): getter and setter are both None");
        }

        let cx = self.context();
        let _guard = cx.lock();
        cx.ensure_live()?;
        let object = self.root.object()?;
        if object.is_array() {
            panic!("define_property('{name}'): accessor properties cannot be defined on an array");
        }
        let initial = value.raw_in(cx)?;

        tracing::debug!(
            context = cx.id(),
            property = name,
            getter = accessors.has_getter(),
            setter = accessors.has_setter(),
            "define property"
        );
        cx.with_boa(|boa| {
            let descriptor = bindings::accessor_descriptor(boa, &self.root, name, &accessors, attrs);
            object.define_property_or_throw(JsString::from(name), descriptor, boa)
        })
        .map_err(JsbindError::engine)?;

        self.with_callbacks(|table| table.set_accessors(name, accessors, initial))
    }

    /// Define a host function as a method of this object.
    ///
    /// The callback receives the call's arguments in order, exactly as many
    /// as the caller passed. Returning `None` makes the call fail. Like
    /// [`Object::define_property`], refused once the context is released.
    pub fn define_function<F>(&self, name: &str, callback: F) -> Result<()>
    where
        F: Fn(&Context, &[Value]) -> Option<Value> + 'static,
    {
        let cx = self.context();
        let _guard = cx.lock();
        cx.ensure_live()?;
        let object = self.root.object()?;

        tracing::debug!(context = cx.id(), function = name, "define function");
        cx.with_boa(|boa| {
            let descriptor = bindings::function_descriptor(boa, &self.root, name);
            object.define_property_or_throw(JsString::from(name), descriptor, boa)
        })
        .map_err(JsbindError::engine)?;

        self.with_callbacks(|table| table.set_function(name, Rc::new(callback)))
    }

    /// Call the method `name` with this object as `this`.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;

        let method = cx
            .with_boa(|boa| object.get(JsString::from(name), boa))
            .map_err(JsbindError::engine)?;
        let function = method
            .as_object()
            .filter(|o| o.is_callable())
            .ok_or(JsbindError::NotCallable)?
            .clone();
        value::call_function(cx, &function, &object.clone().into(), args)
    }

    fn with_callbacks(&self, f: impl FnOnce(&mut CallbackTable) -> Displaced) -> Result<()> {
        let id = self.root.id();
        let displaced = self.context().with_roots(|table| {
            let entry = table.get_mut(id).ok_or(JsbindError::Disposed)?;
            Ok::<_, JsbindError>(f(entry.callbacks.get_or_insert_with(CallbackTable::default)))
        })?;
        if !displaced.is_empty() {
            tracing::debug!(context = self.context().id(), root = ?id, "replaced host callbacks");
        }
        drop(displaced);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Typed accessors
    //
    // Getters return `None` when the property is missing, has another type,
    // or the read fails. Setters are `set_property` with a fresh value.
    // ------------------------------------------------------------------

    /// Property `name` as an int.
    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get_property(name).ok()?.to_int()
    }

    pub fn set_int(&self, name: &str, v: i32) -> Result<()> {
        self.set_property(name, &self.context().int(v))
    }

    /// Property `name` as a number; ints widen.
    pub fn get_number(&self, name: &str) -> Option<f64> {
        self.get_property(name).ok()?.to_number()
    }

    pub fn set_number(&self, name: &str, v: f64) -> Result<()> {
        self.set_property(name, &self.context().number(v))
    }

    /// Property `name` as a boolean.
    pub fn get_boolean(&self, name: &str) -> Option<bool> {
        self.get_property(name).ok()?.to_boolean()
    }

    pub fn set_boolean(&self, name: &str, v: bool) -> Result<()> {
        self.set_property(name, &self.context().boolean(v))
    }

    /// Property `name` as a string, without coercion.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_property(name).ok()?.to_string()
    }

    pub fn set_string(&self, name: &str, v: &str) -> Result<()> {
        self.set_property(name, &self.context().string(v))
    }

    /// Property `name` as an object.
    pub fn get_object(&self, name: &str) -> Option<Object> {
        self.get_property(name).ok()?.to_object()
    }

    pub fn set_object(&self, name: &str, o: &Object) -> Result<()> {
        self.set_property(name, &o.to_value()?)
    }

    /// Property `name` as an array.
    pub fn get_array(&self, name: &str) -> Option<Array> {
        self.get_property(name).ok()?.to_array()
    }

    pub fn set_array(&self, name: &str, a: &Array) -> Result<()> {
        self.set_property(name, &a.to_value()?)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("context", &self.context().id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
