//! Host closures called back by the engine.

use boa_engine::JsValue;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;
use crate::runtime::Context;
use crate::value::Value;

/// Produces the value of an accessor property. `None` fails the read.
pub type Getter = Rc<dyn Fn(&Object) -> Option<Value>>;

/// Receives writes to an accessor property.
pub type Setter = Rc<dyn Fn(&Object, &Value)>;

/// Implements a host function. `None` fails the call.
pub type HostFunction = Rc<dyn Fn(&Context, &[Value]) -> Option<Value>>;

/// Getter and setter for [`Object::define_property`].
///
/// At least one of the two must be set.
///
/// ```
/// use jsbind::Accessors;
///
/// let accessors = Accessors::new()
///     .getter(|o| Some(o.context().int(7)))
///     .setter(|_o, _v| {});
/// assert!(accessors.has_getter() && accessors.has_setter());
/// ```
#[derive(Clone, Default)]
pub struct Accessors {
    pub(crate) getter: Option<Getter>,
    pub(crate) setter: Option<Setter>,
}

impl Accessors {
    /// No getter and no setter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the closure that produces the property's value.
    pub fn getter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Object) -> Option<Value> + 'static,
    {
        self.getter = Some(Rc::new(f));
        self
    }

    /// Set the closure that receives writes to the property.
    pub fn setter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Object, &Value) + 'static,
    {
        self.setter = Some(Rc::new(f));
        self
    }

    pub fn has_getter(&self) -> bool {
        self.getter.is_some()
    }

    pub fn has_setter(&self) -> bool {
        self.setter.is_some()
    }
}

impl std::fmt::Debug for Accessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accessors")
            .field("getter", &self.has_getter())
            .field("setter", &self.has_setter())
            .finish()
    }
}

/// Per-object callbacks, keyed by property or function name.
#[derive(Default)]
pub(crate) struct CallbackTable {
    getters: HashMap<String, Getter>,
    setters: HashMap<String, Setter>,
    functions: HashMap<String, HostFunction>,
    /// Last written value of setter-only properties.
    values: HashMap<String, JsValue>,
}

/// What a property read resolves to.
pub(crate) enum Read {
    Getter(Getter),
    Stored(JsValue),
}

/// Callbacks replaced by a registration.
///
/// Closures may own wrappers whose drop needs the root table, so the caller
/// drops this only after its table borrow has ended.
#[must_use]
#[derive(Default)]
pub(crate) struct Displaced {
    getter: Option<Getter>,
    setter: Option<Setter>,
    function: Option<HostFunction>,
}

impl Displaced {
    pub(crate) fn is_empty(&self) -> bool {
        self.getter.is_none() && self.setter.is_none() && self.function.is_none()
    }
}

impl CallbackTable {
    /// Replace the accessors registered for `name`.
    pub(crate) fn set_accessors(&mut self, name: &str, accessors: Accessors, initial: JsValue) -> Displaced {
        let mut displaced = Displaced {
            function: self.functions.remove(name),
            ..Displaced::default()
        };
        self.values.remove(name);

        match accessors.getter {
            Some(getter) => {
                displaced.getter = self.getters.insert(name.to_owned(), getter);
            }
            None => {
                displaced.getter = self.getters.remove(name);
                self.values.insert(name.to_owned(), initial);
            }
        }
        displaced.setter = match accessors.setter {
            Some(setter) => self.setters.insert(name.to_owned(), setter),
            None => self.setters.remove(name),
        };
        displaced
    }

    pub(crate) fn set_function(&mut self, name: &str, function: HostFunction) -> Displaced {
        self.values.remove(name);
        Displaced {
            getter: self.getters.remove(name),
            setter: self.setters.remove(name),
            function: self.functions.insert(name.to_owned(), function),
        }
    }

    pub(crate) fn read(&self, name: &str) -> Option<Read> {
        if let Some(getter) = self.getters.get(name) {
            return Some(Read::Getter(getter.clone()));
        }
        if self.setters.contains_key(name) {
            let stored = self.values.get(name).cloned().unwrap_or_default();
            return Some(Read::Stored(stored));
        }
        None
    }

    pub(crate) fn setter(&self, name: &str) -> Option<Setter> {
        self.setters.get(name).cloned()
    }

    /// Remember the last value written through a setter.
    ///
    /// Only setter-only properties read it back.
    pub(crate) fn store(&mut self, name: &str, value: JsValue) {
        if !self.getters.contains_key(name) {
            self.values.insert(name.to_owned(), value);
        }
    }

    pub(crate) fn function(&self, name: &str) -> Option<HostFunction> {
        self.functions.get(name).cloned()
    }
}
