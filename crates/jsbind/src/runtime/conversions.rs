//! JSON <-> JavaScript value conversions.
//!
//! | JSON    | JavaScript |
//! |---------|------------|
//! | null    | null       |
//! | boolean | Boolean    |
//! | number  | Number     |
//! | string  | String     |
//! | array   | Array      |
//! | object  | Object     |
//!
//! Going the other way, `undefined`, functions and symbols become `null`,
//! symbol keys are skipped, and non-finite numbers are an error. Nesting
//! deeper than [`MAX_DEPTH`] is rejected in both directions, which also
//! catches cyclic objects.

use boa_engine::{
    js_string,
    object::{builtins::JsArray, JsObject},
    property::PropertyKey,
    value::JsValue,
    Context as BoaContext,
};
use serde_json::Value as JsonValue;

use crate::error::{JsbindError, Result};

pub(crate) const MAX_DEPTH: usize = 128;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

pub(crate) fn json_to_js_value(json: &JsonValue, boa: &mut BoaContext) -> Result<JsValue> {
    json_to_js(json, boa, 0)
}

fn json_to_js(json: &JsonValue, boa: &mut BoaContext, depth: usize) -> Result<JsValue> {
    if depth > MAX_DEPTH {
        return Err(JsbindError::Conversion(format!("JSON nested deeper than {MAX_DEPTH}")));
    }

    match json {
        JsonValue::Null => Ok(JsValue::null()),
        JsonValue::Bool(b) => Ok(JsValue::new(*b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64().and_then(|i| i32::try_from(i).ok()) {
                return Ok(JsValue::new(i));
            }
            n.as_f64()
                .map(JsValue::new)
                .ok_or_else(|| JsbindError::Conversion(format!("number {n} out of range")))
        }
        JsonValue::String(s) => Ok(JsValue::new(js_string!(s.as_str()))),
        JsonValue::Array(items) => {
            let array = JsArray::new(boa);
            for item in items {
                let value = json_to_js(item, boa, depth + 1)?;
                array.push(value, boa).map_err(JsbindError::engine)?;
            }
            Ok(array.into())
        }
        JsonValue::Object(map) => {
            let object = JsObject::with_object_proto(boa.intrinsics());
            for (key, value) in map {
                let value = json_to_js(value, boa, depth + 1)?;
                object
                    .create_data_property_or_throw(js_string!(key.as_str()), value, boa)
                    .map_err(JsbindError::engine)?;
            }
            Ok(object.into())
        }
    }
}

pub(crate) fn js_value_to_json(value: &JsValue, boa: &mut BoaContext) -> Result<JsonValue> {
    js_to_json(value, boa, 0)
}

fn js_to_json(value: &JsValue, boa: &mut BoaContext, depth: usize) -> Result<JsonValue> {
    if depth > MAX_DEPTH {
        return Err(JsbindError::Conversion(format!(
            "value nested deeper than {MAX_DEPTH} (cyclic?)"
        )));
    }

    if value.is_undefined() || value.is_null() {
        return Ok(JsonValue::Null);
    }
    if let Some(b) = value.as_boolean() {
        return Ok(JsonValue::Bool(b));
    }
    if let Some(i) = value.as_i32() {
        return Ok(JsonValue::Number(i.into()));
    }
    if let Some(n) = value.as_number() {
        // Integral doubles in the exactly-representable range stay integers.
        if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER && !(n == 0.0 && n.is_sign_negative()) {
            return Ok(JsonValue::Number((n as i64).into()));
        }
        return serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .ok_or_else(|| JsbindError::Conversion(format!("{n} has no JSON form")));
    }
    if let Some(s) = value.as_string() {
        return s
            .to_std_string()
            .map(JsonValue::String)
            .map_err(|_| JsbindError::Conversion("string is not valid UTF-16".into()));
    }

    let Some(object) = value.as_object().map(|o| o.clone()) else {
        // Symbols and bigints.
        return Ok(JsonValue::Null);
    };
    if object.is_callable() {
        return Ok(JsonValue::Null);
    }

    if object.is_array() {
        let array = JsArray::from_object(object).map_err(JsbindError::engine)?;
        let len: usize = array
            .length(boa)
            .map_err(JsbindError::engine)?
            .try_into()
            .map_err(|_| JsbindError::Conversion("array length overflow".into()))?;

        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let item = array.get(i, boa).map_err(JsbindError::engine)?;
            items.push(js_to_json(&item, boa, depth + 1)?);
        }
        return Ok(JsonValue::Array(items));
    }

    let keys = object.own_property_keys(boa).map_err(JsbindError::engine)?;
    let mut map = serde_json::Map::new();
    for key in keys {
        let name = match &key {
            PropertyKey::String(s) => s
                .to_std_string()
                .map_err(|_| JsbindError::Conversion("property name is not valid UTF-16".into()))?,
            PropertyKey::Index(i) => i.get().to_string(),
            PropertyKey::Symbol(_) => continue,
        };
        let item = object.get(key, boa).map_err(JsbindError::engine)?;
        map.insert(name, js_to_json(&item, boa, depth + 1)?);
    }
    Ok(JsonValue::Object(map))
}
