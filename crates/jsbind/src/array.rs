use boa_engine::{object::builtins::JsArray, JsObject};
use std::rc::Rc;

use crate::error::{JsbindError, Result};
use crate::object::Object;
use crate::runtime::roots::{self, Root};
use crate::runtime::{Context, Runtime};
use crate::value::Value;

/// A rooted JavaScript array.
///
/// Same lifetime rules as [`Object`]: clones share a root, and the root is
/// released on [`Array::dispose`] or when the last clone is dropped.
#[derive(Clone)]
pub struct Array {
    root: Rc<Root>,
}

impl Array {
    pub(crate) fn wrap(cx: &Context, array: JsObject) -> Self {
        Self {
            root: roots::register(cx, array),
        }
    }

    /// The context this array lives in.
    pub fn context(&self) -> &Context {
        self.root.context()
    }

    /// Shorthand for `self.context().runtime()`.
    pub fn runtime(&self) -> &Runtime {
        self.context().runtime()
    }

    /// This array as a [`Value`].
    pub fn to_value(&self) -> Result<Value> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;
        Ok(Value::from_raw(cx, object.into()))
    }

    /// Release the root now. Same contract as [`Object::dispose`].
    pub fn dispose(&self) -> bool {
        self.root.release()
    }

    /// True once the shared root was released.
    pub fn is_disposed(&self) -> bool {
        self.root.is_released()
    }

    /// The array's `length`.
    pub fn length(&self) -> Result<u32> {
        let cx = self.context();
        let _guard = cx.lock();
        let array = JsArray::from_object(self.root.object()?).map_err(JsbindError::engine)?;

        let len = cx
            .with_boa(|boa| array.length(boa))
            .map_err(JsbindError::engine)?;
        u32::try_from(len).map_err(|_| JsbindError::Conversion(format!("array length {len} exceeds u32")))
    }

    /// Grow or truncate the array. Growing adds holes, which read as
    /// undefined.
    pub fn set_length(&self, len: u32) -> Result<()> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;

        tracing::trace!(context = cx.id(), len, "set array length");
        let written = cx
            .with_boa(|boa| object.set(Context::length_key(), len, false, boa))
            .map_err(JsbindError::engine)?;
        if !written {
            return Err(JsbindError::PropertyRejected("length".to_owned()));
        }
        Ok(())
    }

    /// Read element `index`. Out-of-range indices read as undefined.
    pub fn get_element(&self, index: u32) -> Result<Value> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;

        let raw = cx
            .with_boa(|boa| object.get(index, boa))
            .map_err(JsbindError::engine)?;
        Ok(Value::from_raw(cx, raw))
    }

    /// Write element `index`, extending the array if needed.
    pub fn set_element(&self, index: u32, value: &Value) -> Result<()> {
        let cx = self.context();
        let _guard = cx.lock();
        let object = self.root.object()?;
        let raw = value.raw_in(cx)?;

        let written = cx
            .with_boa(|boa| object.set(index, raw, false, boa))
            .map_err(JsbindError::engine)?;
        if !written {
            return Err(JsbindError::ElementRejected(index));
        }
        Ok(())
    }

    /// Append `value` at the current length.
    pub fn push(&self, value: &Value) -> Result<()> {
        let _guard = self.context().lock();
        let len = self.length()?;
        self.set_element(len, value)
    }

    // ------------------------------------------------------------------
    // Typed accessors
    //
    // Same conversions as the typed accessors on Object, keyed by index.
    // ------------------------------------------------------------------

    /// Element `index` as an int.
    pub fn get_int(&self, index: u32) -> Option<i32> {
        self.get_element(index).ok()?.to_int()
    }

    pub fn set_int(&self, index: u32, v: i32) -> Result<()> {
        self.set_element(index, &self.context().int(v))
    }

    /// Element `index` as a number.
    pub fn get_number(&self, index: u32) -> Option<f64> {
        self.get_element(index).ok()?.to_number()
    }

    pub fn set_number(&self, index: u32, v: f64) -> Result<()> {
        self.set_element(index, &self.context().number(v))
    }

    /// Element `index` as a boolean.
    pub fn get_boolean(&self, index: u32) -> Option<bool> {
        self.get_element(index).ok()?.to_boolean()
    }

    pub fn set_boolean(&self, index: u32, v: bool) -> Result<()> {
        self.set_element(index, &self.context().boolean(v))
    }

    /// Element `index` as a string.
    pub fn get_string(&self, index: u32) -> Option<String> {
        self.get_element(index).ok()?.to_string()
    }

    pub fn set_string(&self, index: u32, v: &str) -> Result<()> {
        self.set_element(index, &self.context().string(v))
    }

    /// Element `index` as an object.
    pub fn get_object(&self, index: u32) -> Option<Object> {
        self.get_element(index).ok()?.to_object()
    }

    pub fn set_object(&self, index: u32, o: &Object) -> Result<()> {
        self.set_element(index, &o.to_value()?)
    }

    /// Element `index` as an array.
    pub fn get_array(&self, index: u32) -> Option<Array> {
        self.get_element(index).ok()?.to_array()
    }

    pub fn set_array(&self, index: u32, a: &Array) -> Result<()> {
        self.set_element(index, &a.to_value()?)
    }
}

impl std::fmt::Debug for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Array")
            .field("context", &self.context().id())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_then_write() {
        let cx = Runtime::new().new_context();
        let arr = cx.new_array();
        assert_eq!(arr.length().unwrap(), 0);

        arr.set_length(3).unwrap();
        assert_eq!(arr.length().unwrap(), 3);
        assert!(arr.get_element(1).unwrap().is_undefined());

        arr.set_element(0, &cx.int(42)).unwrap();
        assert_eq!(arr.get_int(0), Some(42));
        assert_eq!(arr.get_int(5), None);
        assert!(arr.get_element(5).unwrap().is_undefined());
    }

    #[test]
    fn test_truncate() {
        let cx = Runtime::new().new_context();
        let arr = cx.eval("[1, 2, 3, 4]").unwrap().to_array().unwrap();
        arr.set_length(2).unwrap();

        assert_eq!(arr.length().unwrap(), 2);
        assert_eq!(arr.get_int(1), Some(2));
        assert!(arr.get_element(2).unwrap().is_undefined());
    }

    #[test]
    fn test_write_past_end_extends() {
        let cx = Runtime::new().new_context();
        let arr = cx.new_array();
        arr.set_string(4, "tail").unwrap();

        assert_eq!(arr.length().unwrap(), 5);
        assert_eq!(arr.get_string(4).as_deref(), Some("tail"));
    }

    #[test]
    fn test_push_appends() {
        let cx = Runtime::new().new_context();
        let arr = cx.new_array();
        arr.push(&cx.int(1)).unwrap();
        arr.push(&cx.boolean(true)).unwrap();

        assert_eq!(arr.length().unwrap(), 2);
        assert_eq!(arr.get_boolean(1), Some(true));
    }

    #[test]
    fn test_nested_containers() {
        let cx = Runtime::new().new_context();
        let outer = cx.new_array();
        let inner = cx.new_array();
        inner.set_int(0, 9).unwrap();
        let obj = cx.new_object();
        obj.set_int("k", 3).unwrap();

        outer.set_array(0, &inner).unwrap();
        outer.set_object(1, &obj).unwrap();

        assert_eq!(outer.get_array(0).unwrap().get_int(0), Some(9));
        assert_eq!(outer.get_object(1).unwrap().get_int("k"), Some(3));
        assert!(outer.get_array(1).is_none(), "a plain object is not an array");
    }

    #[test]
    fn test_frozen_array_rejects_writes() {
        let cx = Runtime::new().new_context();
        let arr = cx.eval("Object.freeze([1])").unwrap().to_array().unwrap();

        assert!(matches!(arr.set_int(0, 2), Err(JsbindError::ElementRejected(0))));
        assert!(matches!(arr.set_length(0), Err(JsbindError::PropertyRejected(_))));
        assert_eq!(arr.get_int(0), Some(1));
    }

    #[test]
    fn test_disposed_array_fails() {
        let cx = Runtime::new().new_context();
        let arr = cx.new_array();
        assert!(arr.dispose());
        assert!(matches!(arr.length(), Err(JsbindError::Disposed)));
        assert!(matches!(arr.set_int(0, 1), Err(JsbindError::Disposed)));
    }
}
