//! JSON interop.
//!
//! Natural mappings in both directions: `null` ↔ `None`, objects ↔ nested
//! mappings (insertion order preserved), arrays ↔ list-kind sequences.
//! Output-only shapes follow what JSON can express: tuple-kind sequences
//! become arrays, byte strings become arrays of numbers, integer keys become
//! their decimal strings, and non-finite floats become `null`.

use serde_json::{Map, Number};

use crate::{
    attr::Attr,
    error::{AttrError, AttrResult},
    key::Key,
    store::Store,
    value::{SharedMap, Value},
    wrap::SequencePolicy,
};

impl<S: Store> From<serde_json::Value> for Value<S> {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::None,
            serde_json::Value::Bool(flag) => Self::Bool(flag),
            serde_json::Value::Number(number) => number_to_value(&number),
            serde_json::Value::String(text) => Self::Str(text),
            serde_json::Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            serde_json::Value::Object(object) => Self::Map(SharedMap::new(S::from_pairs(
                object.into_iter().map(|(key, value)| (Key::Str(key), value.into())),
            ))),
        }
    }
}

fn number_to_value<S>(number: &Number) -> Value<S> {
    if let Some(int) = number.as_i64() {
        Value::Int(int)
    } else {
        // u64 beyond i64 range, or a float; both land on f64.
        Value::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}

impl<S: Store> From<&Value<S>> for serde_json::Value {
    fn from(value: &Value<S>) -> Self {
        match value {
            Value::None => Self::Null,
            Value::Bool(flag) => Self::Bool(*flag),
            Value::Int(int) => Self::Number(Number::from(*int)),
            Value::Float(float) => Number::from_f64(*float).map_or(Self::Null, Self::Number),
            Value::Str(text) => Self::String(text.clone()),
            Value::Bytes(bytes) => Self::Array(bytes.iter().map(|byte| Self::Number(Number::from(*byte))).collect()),
            Value::List(items) | Value::Tuple(items) => Self::Array(items.iter().map(Into::into).collect()),
            Value::Map(shared) => store_to_json(&*shared.borrow()),
        }
    }
}

fn store_to_json<S: Store>(store: &S) -> serde_json::Value {
    let mut object = Map::with_capacity(store.len());
    for (key, value) in store.iter() {
        object.insert(key.to_string(), value.into());
    }
    serde_json::Value::Object(object)
}

impl<S: Store> Attr<S> {
    /// Parses a JSON object into a proxy with the default policy. Non-object
    /// roots are a type mismatch.
    pub fn from_json(text: &str) -> AttrResult<Self> {
        Self::from_json_value(serde_json::from_str(text)?)
    }

    /// Converts a parsed JSON value into a proxy. Non-object roots are a
    /// type mismatch.
    pub fn from_json_value(value: serde_json::Value) -> AttrResult<Self> {
        match Value::<S>::from(value) {
            Value::Map(shared) => Ok(Self::from_shared(shared, SequencePolicy::default())),
            other => Err(AttrError::type_mismatch(format!(
                "JSON root must be an object to build {}, found {}",
                S::KIND,
                other.type_name()
            ))),
        }
    }

    /// Converts the backing store to a JSON object.
    #[must_use]
    pub fn to_json_value(&self) -> serde_json::Value {
        store_to_json(&*self.store.borrow())
    }

    /// Serializes the backing store as a JSON string.
    pub fn to_json(&self) -> AttrResult<String> {
        serde_json::to_string(&self.to_json_value()).map_err(Into::into)
    }
}
