//! Dynamic value representation for token payloads and resolved trees.
//!
//! [`Value`] is the tree type the resolver walks. It covers everything JSON
//! can express plus the two binary results a token can decode to: raw bytes
//! and typed numeric arrays.
//!
//! Arrays and objects are held behind [`Arc`], so cloning a tree is cheap
//! and the resolver can hand back untouched subtrees without copying them.
//!
//! ## Creating Values
//!
//! ```rust
//! use serde_dataref::{value, Value};
//!
//! let null = Value::Null;
//! let number = Value::from(42);
//! let text = Value::from("hello");
//!
//! let obj = value!({
//!     "name": "Alice",
//!     "tags": ["a", "b"]
//! });
//! assert!(obj.is_object());
//! ```
//!
//! ## Converting from Rust Types
//!
//! ```rust
//! use serde_dataref::{to_value, Value};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let value: Value = to_value(&Point { x: 10, y: 20 }).unwrap();
//! assert_eq!(value.as_object().map(|o| o.len()), Some(2));
//! ```

use crate::{Error, Map, NumericArray};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// A dynamically-typed tree node.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::{Number, Value};
///
/// let num = Value::Number(Number::Integer(42));
/// let text = Value::String("hello".to_string());
///
/// assert!(Value::Null.is_null());
/// assert!(num.is_number());
/// assert!(text.is_string());
/// ```
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
    /// Raw bytes decoded from an octet-stream token or fetched from a URL.
    Bytes(Bytes),
    /// A typed numeric array decoded from an octet-stream token.
    Numeric(NumericArray),
}

/// A JSON number.
///
/// # Examples
///
/// ```rust
/// use serde_dataref::Number;
///
/// assert_eq!(Number::Integer(42).as_i64(), Some(42));
/// assert_eq!(Number::Float(3.5).as_f64(), 3.5);
/// assert!(Number::Float(f64::NAN).as_i64().is_none());
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Number {
    Integer(i64),
    Float(f64),
}

impl Number {
    #[inline]
    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Number::Float(_))
    }

    /// Converts this number to an `i64` if it has no fractional part and
    /// fits in range.
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Integer(i) => Some(*i),
            Number::Float(f) => {
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                    Some(*f as i64)
                } else {
                    None
                }
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            Number::Float(fl) => write!(f, "{}", fl),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Integer(value)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        match i64::try_from(value) {
            Ok(i) => Number::Integer(i),
            Err(_) => Number::Float(value as f64),
        }
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl Value {
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_bytes(&self) -> bool {
        matches!(self, Value::Bytes(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Value::Numeric(_))
    }

    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// If the value is a string, returns a reference to it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_dataref::Value;
    ///
    /// assert_eq!(Value::from("hello").as_str(), Some("hello"));
    /// assert_eq!(Value::from(42).as_str(), None);
    /// ```
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr.as_slice()),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(obj) => Some(&**obj),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(&bytes[..]),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn as_numeric(&self) -> Option<&NumericArray> {
        match self {
            Value::Numeric(array) => Some(array),
            _ => None,
        }
    }

    /// Looks up a key in an object. Returns `None` for non-objects.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Returns `true` when both values are the same shared container.
    ///
    /// Only arrays and objects carry identity; every other pair returns
    /// `false`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_dataref::value;
    ///
    /// let tree = value!({"a": 1});
    /// let copy = tree.clone();
    /// assert!(tree.ptr_eq(&copy));
    /// assert!(!tree.ptr_eq(&value!({"a": 1})));
    /// ```
    #[must_use]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Returns a short name of the variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Bytes(_) => "bytes",
            Value::Numeric(_) => "numeric array",
        }
    }

    /// Converts this value into a `serde_json::Value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for non-finite floats.
    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        serde_json::to_value(self).map_err(Error::serialization)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::{Error as _, SerializeMap, SerializeSeq};

        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Integer(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(f)) => {
                if f.is_finite() {
                    serializer.serialize_f64(*f)
                } else {
                    Err(S::Error::custom(format!("{} has no JSON representation", f)))
                }
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for element in arr.iter() {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Object(obj) => {
                let mut map = serializer.serialize_map(Some(obj.len()))?;
                for (k, v) in obj.iter() {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Bytes(bytes) => serializer.serialize_bytes(bytes),
            Value::Numeric(array) => match array {
                NumericArray::Int8(v) => v.serialize(serializer),
                NumericArray::Uint8(v) | NumericArray::Uint8Clamped(v) => v.serialize(serializer),
                NumericArray::Int16(v) => v.serialize(serializer),
                NumericArray::Uint16(v) => v.serialize(serializer),
                NumericArray::Int32(v) => v.serialize(serializer),
                NumericArray::Uint32(v) => v.serialize(serializer),
                NumericArray::BigInt64(v) => v.serialize(serializer),
                NumericArray::BigUint64(v) => v.serialize(serializer),
                NumericArray::Float32(v) => v.serialize(serializer),
                NumericArray::Float64(v) => v.serialize(serializer),
            },
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any JSON value")
            }

            fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E> {
                Ok(Value::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E> {
                Ok(Value::Number(Number::Integer(value)))
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E> {
                Ok(Value::Number(Number::from(value)))
            }

            fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E> {
                Ok(Value::Number(Number::Float(value)))
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E> {
                Ok(Value::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> Result<Self::Value, E> {
                Ok(Value::String(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E> {
                Ok(Value::Bytes(Bytes::copy_from_slice(value)))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> Result<Self::Value, E> {
                Ok(Value::Bytes(Bytes::from(value)))
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> Result<Self::Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut vec = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(elem) = seq.next_element()? {
                    vec.push(elem);
                }
                Ok(Value::from(vec))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut values = Map::new();
                while let Some((key, value)) = map.next_entry()? {
                    values.insert(key, value);
                }
                Ok(Value::from(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Number::Integer(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Number(Number::from(u))
                } else {
                    Value::Number(Number::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::from(arr.into_iter().map(Value::from).collect::<Vec<_>>())
            }
            serde_json::Value::Object(obj) => Value::from(
                obj.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect::<Map>(),
            ),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::payload_mismatch("integer", format!("found {}", value.type_name())))
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::payload_mismatch("number", format!("found {}", value.type_name())))
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::payload_mismatch("bool", format!("found {}", value.type_name())))
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> crate::Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(Error::payload_mismatch(
                "string",
                format!("found {}", other.type_name()),
            )),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(Number::Integer(i64::from(value)))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(Number::Integer(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(Number::Integer(i64::from(value)))
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(Number::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::Float(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(Arc::new(value))
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(Arc::new(value))
    }
}

impl From<Bytes> for Value {
    fn from(value: Bytes) -> Self {
        Value::Bytes(value)
    }
}

impl From<NumericArray> for Value {
    fn from(value: NumericArray) -> Self {
        Value::Numeric(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tryfrom_i64() {
        let value = Value::Number(Number::Float(42.0));
        let result: i64 = TryFrom::try_from(value).unwrap();
        assert_eq!(result, 42);

        assert!(i64::try_from(Value::from("test")).is_err());
    }

    #[test]
    fn test_tryfrom_string() {
        let result: String = TryFrom::try_from(Value::from("hello")).unwrap();
        assert_eq!(result, "hello");
        assert!(String::try_from(Value::from(42)).is_err());
    }

    #[test]
    fn test_large_u64_becomes_float() {
        assert_eq!(Value::from(u64::MAX), Value::Number(Number::Float(u64::MAX as f64)));
        assert_eq!(Value::from(7u64), Value::Number(Number::Integer(7)));
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let text = r#"{"z":1,"a":[true,null,"x"],"m":{"k":2.5}}"#;
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), text);
    }

    #[test]
    fn test_non_finite_float_does_not_serialize() {
        let value = Value::from(vec![Value::from(f64::INFINITY)]);
        assert!(serde_json::to_string(&value).is_err());
        assert!(value.to_json().is_err());
    }

    #[test]
    fn test_numeric_serializes_as_sequence() {
        let value = Value::from(NumericArray::Int16(vec![-1, 2]));
        assert_eq!(serde_json::to_string(&value).unwrap(), "[-1,2]");
    }

    #[test]
    fn test_from_serde_json() {
        let json = serde_json::json!({"name": "John", "age": 30, "big": u64::MAX});
        let value = Value::from(json);
        assert_eq!(value.get("name").and_then(Value::as_str), Some("John"));
        assert_eq!(value.get("age").and_then(Value::as_i64), Some(30));
        assert!(value.get("big").map(Value::is_number).unwrap_or(false));
    }

    #[test]
    fn test_ptr_eq_only_for_shared_containers() {
        let arr = Value::from(vec![Value::from(1)]);
        assert!(arr.ptr_eq(&arr.clone()));
        assert!(!Value::from(1).ptr_eq(&Value::from(1)));
    }
}
