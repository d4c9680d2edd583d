use boa_engine::JsValue;
use std::mem::ManuallyDrop;

use crate::array::Array;
use crate::error::{JsbindError, Result};
use crate::object::Object;
use crate::runtime::{conversions, Context};
use serde_json::Value as JsonValue;

/// A JavaScript value owned by host code.
///
/// Values are meant to be short-lived; to keep an object around, convert it
/// with [`Value::to_object`] or [`Value::to_array`]. Like every handle into
/// a context, a value stays on the thread that created the context.
///
/// None of the `to_*` conversions coerce: a number is not a string and a
/// string is not a number. Use [`Value::coerce_string`] for the engine's own
/// string conversion.
pub struct Value {
    cx: Context,
    raw: ManuallyDrop<JsValue>,
}

impl Value {
    pub(crate) fn from_raw(cx: &Context, raw: JsValue) -> Self {
        Self {
            cx: cx.detached(),
            raw: ManuallyDrop::new(raw),
        }
    }

    pub(crate) fn raw(&self) -> &JsValue {
        &self.raw
    }

    /// Clone the engine value for use in `cx`.
    ///
    /// Fails for values created by another runtime, whose lock does not
    /// cover `cx`'s engine.
    pub(crate) fn raw_in(&self, cx: &Context) -> Result<JsValue> {
        if !self.cx.runtime().same_runtime(cx.runtime()) {
            return Err(JsbindError::ForeignContext);
        }
        let _guard = cx.lock();
        Ok(self.raw().clone())
    }

    /// The context this value belongs to.
    pub fn context(&self) -> &Context {
        &self.cx
    }

    pub fn is_undefined(&self) -> bool {
        self.raw.is_undefined()
    }

    pub fn is_null(&self) -> bool {
        self.raw.is_null()
    }

    /// True for numbers that [`Value::to_int`] accepts.
    pub fn is_int(&self) -> bool {
        self.to_int().is_some()
    }

    pub fn is_number(&self) -> bool {
        self.raw.is_number()
    }

    pub fn is_boolean(&self) -> bool {
        self.raw.is_boolean()
    }

    pub fn is_string(&self) -> bool {
        self.raw.is_string()
    }

    /// True for every object, arrays and functions included.
    pub fn is_object(&self) -> bool {
        self.raw.is_object()
    }

    pub fn is_array(&self) -> bool {
        self.raw.as_object().is_some_and(|o| o.is_array())
    }

    /// True for callable objects.
    pub fn is_function(&self) -> bool {
        self.raw.as_object().is_some_and(|o| o.is_callable())
    }

    /// The `typeof`-style name of the value, with `"array"` for arrays and
    /// `"null"` for null.
    pub fn type_name(&self) -> &'static str {
        let raw = &*self.raw;
        if raw.is_undefined() {
            "undefined"
        } else if raw.is_null() {
            "null"
        } else if raw.is_boolean() {
            "boolean"
        } else if raw.is_number() {
            "number"
        } else if raw.is_string() {
            "string"
        } else if raw.is_symbol() {
            "symbol"
        } else if raw.is_bigint() {
            "bigint"
        } else if self.is_function() {
            "function"
        } else if self.is_array() {
            "array"
        } else {
            "object"
        }
    }

    /// The value as an `i32`, if it is a number with an integral value in
    /// range. Negative zero is not an integer.
    pub fn to_int(&self) -> Option<i32> {
        let n = self.raw.as_number()?;
        if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
            return None;
        }
        if n == 0.0 && n.is_sign_negative() {
            return None;
        }
        Some(n as i32)
    }

    /// The value as an `f64`, if it is a number.
    pub fn to_number(&self) -> Option<f64> {
        self.raw.as_number()
    }

    /// The value as a `bool`, if it is a boolean.
    pub fn to_boolean(&self) -> Option<bool> {
        self.raw.as_boolean()
    }

    /// The value as a Rust string, if it is a string. Strings holding lone
    /// surrogates have no UTF-8 form and yield `None`.
    pub fn to_string(&self) -> Option<String> {
        self.raw.as_string()?.to_std_string().ok()
    }

    /// Root the value's object, if it is one.
    pub fn to_object(&self) -> Option<Object> {
        let _guard = self.cx.lock();
        let object = self.raw.as_object()?.clone();
        Some(Object::wrap(&self.cx, object))
    }

    /// Root the value's array, if it is one.
    pub fn to_array(&self) -> Option<Array> {
        let _guard = self.cx.lock();
        let object = self.raw.as_object()?.clone();
        if !object.is_array() {
            return None;
        }
        Some(Array::wrap(&self.cx, object))
    }

    /// The engine's ToString conversion.
    pub fn coerce_string(&self) -> Result<String> {
        let _guard = self.cx.lock();
        let raw = self.raw().clone();
        let s = self
            .cx
            .with_boa(|boa| raw.to_string(boa))
            .map_err(JsbindError::engine)?;
        Ok(s.to_std_string_escaped())
    }

    /// Call the value as a function with `this` set to undefined.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let _guard = self.cx.lock();
        let function = self
            .raw
            .as_object()
            .filter(|o| o.is_callable())
            .ok_or(JsbindError::NotCallable)?
            .clone();
        call_function(&self.cx, &function, &JsValue::undefined(), args)
    }

    /// The value as JSON. Functions, symbols and bigints become null;
    /// integral numbers in the safe range become JSON integers.
    pub fn to_json(&self) -> Result<JsonValue> {
        let _guard = self.cx.lock();
        let raw = self.raw().clone();
        self.cx.with_boa(|boa| conversions::js_value_to_json(&raw, boa))
    }
}

/// Call `function` from host code. Arguments must belong to `cx`'s runtime.
pub(crate) fn call_function(
    cx: &Context,
    function: &boa_engine::JsObject,
    this: &JsValue,
    args: &[Value],
) -> Result<Value> {
    let argv = args
        .iter()
        .map(|arg| arg.raw_in(cx))
        .collect::<Result<Vec<_>>>()?;

    let result = cx
        .with_boa(|boa| function.call(this, &argv, boa))
        .map_err(|e| JsbindError::JavaScriptExecution(e.to_string()))?;
    Ok(Value::from_raw(cx, result))
}

impl Clone for Value {
    fn clone(&self) -> Self {
        let _guard = self.cx.lock();
        Self::from_raw(&self.cx, self.raw().clone())
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        let _guard = self.cx.lock();
        // SAFETY: `raw` is not used after this point.
        unsafe { ManuallyDrop::drop(&mut self.raw) };
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_name())
            .field("context", &self.cx.id())
            .finish()
    }
}
