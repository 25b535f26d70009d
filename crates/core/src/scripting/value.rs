//! Conversions between portable JSON values and engine-native values.
//!
//! The shared shape set is null, boolean, number, string, array and
//! string-keyed object. Both directions are total over that set and reject
//! everything else instead of coercing it.

use boa_engine::object::builtins::{JsArray, JsMap, JsPromise, JsSet};
use boa_engine::property::Attribute;
use boa_engine::{Context, JsObject, JsString, JsValue};
use serde_json::{Map, Number, Value};

use crate::error::CoreError;

/// Deepest nesting accepted in either direction.
pub const MAX_VALUE_DEPTH: usize = 128;

/// Longest array the serializer will walk. Sparse arrays can report huge
/// lengths without holding any elements.
pub const MAX_ARRAY_LENGTH: u32 = 1 << 24;

/// 2^53 - 1: integers beyond this cannot round-trip through a JS number.
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

// ---------------------------------------------------------------------------
// Binding (JSON -> JS)
// ---------------------------------------------------------------------------

/// Define one global binding per entry on the context's current realm.
///
/// Callers enter a freshly created realm first; the bindings disappear with
/// it.
pub fn bind_environment(
    environment: &Map<String, Value>,
    context: &mut Context,
) -> Result<(), CoreError> {
    for (name, value) in environment {
        if name.is_empty() {
            return Err(CoreError::InvalidEnvironmentValue(
                "binding names must not be empty".to_string(),
            ));
        }
        let native = to_js(value, 0, context)
            .map_err(|reason| CoreError::InvalidEnvironmentValue(format!("{name}: {reason}")))?;
        context
            .register_global_property(JsString::from(name.as_str()), native, Attribute::all())
            .map_err(|err| CoreError::InvalidEnvironmentValue(format!("{name}: {err}")))?;
    }
    Ok(())
}

/// Convert a single portable value into an engine value.
pub fn to_js_value(value: &Value, context: &mut Context) -> Result<JsValue, CoreError> {
    to_js(value, 0, context).map_err(CoreError::InvalidEnvironmentValue)
}

fn to_js(value: &Value, depth: usize, context: &mut Context) -> Result<JsValue, String> {
    if depth > MAX_VALUE_DEPTH {
        return Err(format!("nesting exceeds {MAX_VALUE_DEPTH} levels"));
    }

    Ok(match value {
        Value::Null => JsValue::null(),
        Value::Bool(flag) => JsValue::from(*flag),
        Value::Number(number) => number_to_js(number)?,
        Value::String(text) => JsValue::from(JsString::from(text.as_str())),
        Value::Array(items) => {
            let mut elements = Vec::with_capacity(items.len());
            for item in items {
                elements.push(to_js(item, depth + 1, context)?);
            }
            JsArray::from_iter(elements, context).into()
        }
        Value::Object(entries) => {
            let object = JsObject::with_object_proto(context.intrinsics());
            for (key, item) in entries {
                let item = to_js(item, depth + 1, context)?;
                object
                    .create_data_property_or_throw(JsString::from(key.as_str()), item, context)
                    .map_err(|err| err.to_string())?;
            }
            object.into()
        }
    })
}

fn number_to_js(number: &Number) -> Result<JsValue, String> {
    if let Some(int) = number.as_i64() {
        if int.unsigned_abs() > MAX_SAFE_INTEGER.unsigned_abs() {
            return Err(format!("integer {int} cannot be represented exactly"));
        }
        return Ok(i32::try_from(int).map_or_else(|_| JsValue::from(int as f64), JsValue::from));
    }
    if number.is_u64() {
        return Err(format!("integer {number} cannot be represented exactly"));
    }
    number
        .as_f64()
        .map(JsValue::from)
        .ok_or_else(|| format!("unsupported number {number}"))
}

// ---------------------------------------------------------------------------
// Serialization (JS -> JSON)
// ---------------------------------------------------------------------------

/// Built-in functions the serializer calls. Captured before a script runs so
/// that reassigning `Object.keys` and friends cannot change the encoding.
#[derive(Clone)]
pub struct JsonIntrinsics {
    object_keys: JsObject,
    /// `valueOf` of `Number`, `String` and `Boolean`; each succeeds only on
    /// its own wrapper objects.
    primitive_value_of: [JsObject; 3],
}

impl JsonIntrinsics {
    /// Capture the built-ins of the context's current realm.
    pub fn capture(context: &mut Context) -> Result<Self, CoreError> {
        let (object, number, string, boolean) = {
            let constructors = context.intrinsics().constructors();
            (
                constructors.object().constructor(),
                constructors.number().prototype(),
                constructors.string().prototype(),
                constructors.boolean().prototype(),
            )
        };

        Ok(Self {
            object_keys: builtin_method(&object, "keys", context)?,
            primitive_value_of: [
                builtin_method(&number, "valueOf", context)?,
                builtin_method(&string, "valueOf", context)?,
                builtin_method(&boolean, "valueOf", context)?,
            ],
        })
    }

    /// Convert an evaluation result into a portable value, following
    /// `JSON.stringify`: `toJSON` is honoured, primitive wrappers are
    /// unwrapped and only enumerable own string keys are written.
    ///
    /// Unlike `JSON.stringify`, shapes JSON cannot hold are errors rather
    /// than silently dropped: functions, symbols, BigInts, non-finite numbers,
    /// cycles, and promises, maps and sets.
    pub fn to_json(&self, value: &JsValue, context: &mut Context) -> Result<Value, CoreError> {
        let mut ancestors = Vec::new();
        self.property_to_json("", value.clone(), &mut ancestors, context)
            .map(|converted| converted.unwrap_or(Value::Null))
            .map_err(CoreError::Serialization)
    }

    /// `None` means "omit": `undefined`, which becomes `null` inside arrays.
    fn property_to_json(
        &self,
        key: &str,
        value: JsValue,
        ancestors: &mut Vec<JsObject>,
        context: &mut Context,
    ) -> Result<Option<Value>, String> {
        let value = apply_to_json(key, value, context)?;
        let value = self.unwrap_primitive(value, context);

        if value.is_undefined() {
            return Ok(None);
        }
        if value.is_null() {
            return Ok(Some(Value::Null));
        }
        if let Some(flag) = value.as_boolean() {
            return Ok(Some(Value::Bool(flag)));
        }
        if let Some(text) = value.as_string() {
            return Ok(Some(Value::String(text.to_std_string_lossy())));
        }
        if let Some(number) = value.as_number() {
            return number_to_json(number).map(Some);
        }
        if value.is_bigint() {
            return Err("BigInt values have no JSON representation".to_string());
        }
        if value.is_symbol() {
            return Err("symbols have no JSON representation".to_string());
        }
        match value.as_object() {
            Some(object) => self
                .object_to_json(object.clone(), ancestors, context)
                .map(Some),
            None => Err("unsupported value".to_string()),
        }
    }

    fn unwrap_primitive(&self, value: JsValue, context: &mut Context) -> JsValue {
        if !value.is_object() {
            return value;
        }
        self.primitive_value_of
            .iter()
            .find_map(|value_of| value_of.call(&value, &[], context).ok())
            .unwrap_or(value)
    }

    fn object_to_json(
        &self,
        object: JsObject,
        ancestors: &mut Vec<JsObject>,
        context: &mut Context,
    ) -> Result<Value, String> {
        if object.is_callable() {
            return Err("functions have no JSON representation".to_string());
        }
        if let Some(kind) = engine_internal_kind(&object) {
            return Err(format!("{kind} objects have no JSON representation"));
        }
        if ancestors.iter().any(|seen| JsObject::equals(seen, &object)) {
            return Err("cyclic structure has no JSON representation".to_string());
        }
        if ancestors.len() >= MAX_VALUE_DEPTH {
            return Err(format!("nesting exceeds {MAX_VALUE_DEPTH} levels"));
        }

        ancestors.push(object.clone());
        let converted = if object.is_array() {
            self.array_to_json(&object, ancestors, context)
        } else {
            self.properties_to_json(&object, ancestors, context)
        };
        ancestors.pop();
        converted
    }

    fn array_to_json(
        &self,
        object: &JsObject,
        ancestors: &mut Vec<JsObject>,
        context: &mut Context,
    ) -> Result<Value, String> {
        let array = JsArray::from_object(object.clone()).map_err(|err| err.to_string())?;
        let length = array_length(&array, context)?;

        let mut items = Vec::with_capacity(length as usize);
        for index in 0..length {
            let element = array.get(index, context).map_err(|err| err.to_string())?;
            let item = self.property_to_json(&index.to_string(), element, ancestors, context)?;
            items.push(item.unwrap_or(Value::Null));
        }
        Ok(Value::Array(items))
    }

    fn properties_to_json(
        &self,
        object: &JsObject,
        ancestors: &mut Vec<JsObject>,
        context: &mut Context,
    ) -> Result<Value, String> {
        let keys = self
            .object_keys
            .call(&JsValue::undefined(), &[object.clone().into()], context)
            .map_err(|err| err.to_string())?;
        let keys = keys
            .as_object()
            .cloned()
            .ok_or_else(|| "Object.keys did not return an array".to_string())?;
        let keys = JsArray::from_object(keys).map_err(|err| err.to_string())?;
        let length = array_length(&keys, context)?;

        let mut entries = Map::new();
        for index in 0..length {
            let key = keys.get(index, context).map_err(|err| err.to_string())?;
            let Some(key) = key.as_string().cloned() else {
                continue;
            };
            let name = key.to_std_string_lossy();
            let item = object.get(key, context).map_err(|err| err.to_string())?;
            if let Some(item) = self.property_to_json(&name, item, ancestors, context)? {
                entries.insert(name, item);
            }
        }
        Ok(Value::Object(entries))
    }
}

/// Convert an evaluation result into a portable value using the built-ins of
/// the current realm. See [`JsonIntrinsics::to_json`].
pub fn to_json_value(value: &JsValue, context: &mut Context) -> Result<Value, CoreError> {
    JsonIntrinsics::capture(context)?.to_json(value, context)
}

/// Encode a portable value as compact JSON text.
pub fn serialize_result(value: &Value) -> Result<String, CoreError> {
    serde_json::to_string(value).map_err(|err| CoreError::Serialization(err.to_string()))
}

fn builtin_method(target: &JsObject, name: &str, context: &mut Context) -> Result<JsObject, CoreError> {
    target
        .get(JsString::from(name), context)
        .ok()
        .and_then(|method| method.as_callable().cloned())
        .ok_or_else(|| CoreError::Internal(format!("built-in {name} is unavailable")))
}

/// Replace an object by the result of its `toJSON` method, when it has one.
fn apply_to_json(key: &str, value: JsValue, context: &mut Context) -> Result<JsValue, String> {
    let Some(object) = value.as_object().cloned() else {
        return Ok(value);
    };
    let to_json = object
        .get(JsString::from("toJSON"), context)
        .map_err(|err| err.to_string())?;
    match to_json.as_callable() {
        Some(method) => method
            .call(&value, &[JsString::from(key).into()], context)
            .map_err(|err| format!("toJSON threw: {err}")),
        None => Ok(value),
    }
}

fn engine_internal_kind(object: &JsObject) -> Option<&'static str> {
    if JsPromise::from_object(object.clone()).is_ok() {
        Some("Promise")
    } else if JsMap::from_object(object.clone()).is_ok() {
        Some("Map")
    } else if JsSet::from_object(object.clone()).is_ok() {
        Some("Set")
    } else {
        None
    }
}

fn array_length(array: &JsArray, context: &mut Context) -> Result<u32, String> {
    let length = array.length(context).map_err(|err| err.to_string())?;
    u32::try_from(length)
        .ok()
        .filter(|length| *length <= MAX_ARRAY_LENGTH)
        .ok_or_else(|| format!("array of length {length} is too large to serialize"))
}

fn number_to_json(number: f64) -> Result<Value, String> {
    if !number.is_finite() {
        return Err(format!("{number} has no JSON representation"));
    }
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER as f64 {
        return Ok(Value::from(number as i64));
    }
    Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| format!("{number} has no JSON representation"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use boa_engine::Source;
    use serde_json::json;

    use super::*;

    fn eval(source: &str, context: &mut Context) -> JsValue {
        context
            .eval(Source::from_bytes(source))
            .expect("script should evaluate")
    }

    fn eval_json(source: &str) -> Result<Value, CoreError> {
        let mut context = Context::default();
        let value = eval(source, &mut context);
        to_json_value(&value, &mut context)
    }

    #[test]
    fn round_trips_every_shape() {
        let samples = [
            json!(null),
            json!(true),
            json!(42),
            json!(-7),
            json!(1.5),
            json!("héllo ✓"),
            json!([]),
            json!({}),
            json!([1, "two", null, [3.25], {"four": false}]),
            json!({"nested": {"deeper": {"list": [1, 2, {"x": "y"}]}}}),
        ];

        for sample in samples {
            let mut context = Context::default();
            let native = to_js_value(&sample, &mut context).expect("bind");
            let back = to_json_value(&native, &mut context).expect("serialize");
            assert_eq!(back, sample, "round trip of {sample}");
        }
    }

    #[test]
    fn bound_globals_are_visible_to_scripts() {
        let mut context = Context::default();
        let env = json!({"x": "world", "n": 2}).as_object().cloned().unwrap();
        bind_environment(&env, &mut context).expect("bind");
        let value = eval("'hello ' + x + n", &mut context);
        assert_eq!(to_json_value(&value, &mut context).unwrap(), json!("hello world2"));
    }

    #[test]
    fn empty_binding_name_is_rejected() {
        let mut context = Context::default();
        let env = json!({"": 1}).as_object().cloned().unwrap();
        assert_matches!(
            bind_environment(&env, &mut context),
            Err(CoreError::InvalidEnvironmentValue(_))
        );
    }

    #[test]
    fn unsafe_integers_are_rejected() {
        let mut context = Context::default();
        assert_matches!(
            to_js_value(&json!(9_007_199_254_740_993_i64), &mut context),
            Err(CoreError::InvalidEnvironmentValue(_))
        );
        assert_matches!(
            to_js_value(&json!(u64::MAX), &mut context),
            Err(CoreError::InvalidEnvironmentValue(_))
        );
        assert!(to_js_value(&json!(9_007_199_254_740_991_i64), &mut context).is_ok());
    }

    #[test]
    fn over_deep_environment_is_rejected() {
        let mut value = json!(0);
        for _ in 0..=MAX_VALUE_DEPTH {
            value = json!([value]);
        }
        let mut context = Context::default();
        assert_matches!(
            to_js_value(&value, &mut context),
            Err(CoreError::InvalidEnvironmentValue(_))
        );
    }

    #[test]
    fn rebinding_a_frozen_global_is_rejected() {
        let mut context = Context::default();
        let env = json!({"undefined": 1}).as_object().cloned().unwrap();
        assert_matches!(
            bind_environment(&env, &mut context),
            Err(CoreError::InvalidEnvironmentValue(_))
        );
    }

    #[test]
    fn undefined_follows_json_stringify() {
        assert_eq!(eval_json("undefined").unwrap(), json!(null));
        assert_eq!(eval_json("[1, undefined]").unwrap(), json!([1, null]));
        assert_eq!(eval_json("({a: 1, b: undefined})").unwrap(), json!({"a": 1}));
    }

    #[test]
    fn integral_numbers_serialize_as_integers() {
        assert_eq!(eval_json("6 / 2").unwrap(), json!(3));
        assert_eq!(eval_json("1 / 4").unwrap(), json!(0.25));
    }

    #[test]
    fn functions_are_rejected() {
        assert_matches!(eval_json("(function () {})"), Err(CoreError::Serialization(_)));
        assert_matches!(
            eval_json("({ handler: () => 1 })"),
            Err(CoreError::Serialization(_))
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let result = eval_json("var a = {}; a.self = a; a");
        assert_matches!(result, Err(CoreError::Serialization(msg)) if msg.contains("cyclic"));
    }

    #[test]
    fn shared_references_are_not_cycles() {
        let value = eval_json("var shared = {v: 1}; [shared, shared]").unwrap();
        assert_eq!(value, json!([{"v": 1}, {"v": 1}]));
    }

    #[test]
    fn non_finite_symbol_and_bigint_are_rejected() {
        assert_matches!(eval_json("NaN"), Err(CoreError::Serialization(_)));
        assert_matches!(eval_json("1 / 0"), Err(CoreError::Serialization(_)));
        assert_matches!(eval_json("Symbol('s')"), Err(CoreError::Serialization(_)));
        assert_matches!(eval_json("10n"), Err(CoreError::Serialization(_)));
    }

    #[test]
    fn to_json_methods_are_honoured() {
        assert_eq!(
            eval_json("new Date(0)").unwrap(),
            json!("1970-01-01T00:00:00.000Z")
        );
        assert_eq!(
            eval_json("({ toJSON() { return 'custom'; } })").unwrap(),
            json!("custom")
        );
        assert_eq!(
            eval_json("({ at: { toJSON(key) { return key; } } })").unwrap(),
            json!({"at": "at"})
        );
    }

    #[test]
    fn only_enumerable_own_keys_are_written() {
        let source = "var o = Object.defineProperty({a: 1}, 'hidden', {value: 2, enumerable: false}); \
                      Object.setPrototypeOf(o, {inherited: 3}); o";
        assert_eq!(eval_json(source).unwrap(), json!({"a": 1}));
        assert_eq!(eval_json("new Error('x')").unwrap(), json!({}));
        assert_eq!(eval_json("/re/g").unwrap(), json!({}));
    }

    #[test]
    fn primitive_wrappers_are_unwrapped() {
        assert_eq!(eval_json("new Number(5)").unwrap(), json!(5));
        assert_eq!(eval_json("new String('s')").unwrap(), json!("s"));
        assert_eq!(eval_json("[new Boolean(false)]").unwrap(), json!([false]));
    }

    #[test]
    fn engine_internal_objects_are_rejected() {
        assert_matches!(
            eval_json("Promise.resolve(1)"),
            Err(CoreError::Serialization(msg)) if msg.contains("Promise")
        );
        assert_matches!(eval_json("new Map([[1, 2]])"), Err(CoreError::Serialization(_)));
        assert_matches!(eval_json("({ s: new Set() })"), Err(CoreError::Serialization(_)));
    }

    #[test]
    fn built_ins_captured_before_the_script_are_used() {
        let mut context = Context::default();
        let intrinsics = JsonIntrinsics::capture(&mut context).unwrap();
        let value = eval(
            "Object.keys = () => []; Number.prototype.valueOf = () => 0; [{a: 1}, new Number(7)]",
            &mut context,
        );
        assert_eq!(
            intrinsics.to_json(&value, &mut context).unwrap(),
            json!([{"a": 1}, 7])
        );
    }

    #[test]
    fn lone_surrogates_are_replaced() {
        assert_eq!(eval_json("'a\\uD800b'").unwrap(), json!("a\u{FFFD}b"));
    }

    #[test]
    fn serialize_result_is_compact_json() {
        let text = serialize_result(&json!({"a": [1, 2]})).unwrap();
        assert_eq!(text, r#"{"a":[1,2]}"#);
    }
}
