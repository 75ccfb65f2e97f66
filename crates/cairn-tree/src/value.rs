//! Tagged values stored in a node's data bag.
//!
//! [`Value`] is the uniformly typed payload of [`Data`](crate::Data). It
//! covers everything a loader can produce (JSON-compatible scalars, arrays,
//! objects), plus dates parsed from filenames and opaque references that
//! plugins attach without the core knowing their type.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// Ordered mapping used for object values.
pub type Map = BTreeMap<String, Value>;

/// A single value in a data bag.
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Explicit null.
    #[default]
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value.
    String(String),
    /// Date and time (no timezone).
    Date(NaiveDateTime),
    /// Ordered sequence.
    Array(Vec<Value>),
    /// Nested mapping.
    Object(Map),
    /// Plugin-owned reference, compared by identity.
    Opaque(Opaque),
}

/// Shared reference to a plugin value the core never inspects.
#[derive(Clone)]
pub struct Opaque {
    label: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    /// Wrap a value, labelling it with its type name for debug output.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            label: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// Borrow the wrapped value if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Type name of the wrapped value.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({})", self.label)
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Opaque(a), Self::Opaque(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Borrow as a string slice if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as a boolean if this is a bool.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as a date if this is a date.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Borrow as a slice if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow as a map if this is an object.
    #[must_use]
    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Render a scalar as plain text.
    ///
    /// Integral numbers drop the fractional part, dates use ISO-8601.
    /// Arrays and objects fall back to their JSON form, opaque values to their
    /// type label.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => format_number(*n),
            Self::String(s) => s.clone(),
            Self::Date(d) => d.format("%Y-%m-%dT%H:%M:%S").to_string(),
            Self::Array(_) | Self::Object(_) => {
                serde_json::to_string(self).unwrap_or_default()
            }
            Self::Opaque(o) => o.label().to_owned(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(map)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::Opaque(_) => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.collect_str(&d.format("%Y-%m-%dT%H:%M:%S")),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_from_json_nested() {
        let value = Value::from(serde_json::json!({"a": [1, "x", true], "b": null}));
        let map = value.as_object().unwrap();
        assert_eq!(
            map.get("a"),
            Some(&Value::Array(vec![
                Value::Number(1.0),
                Value::String("x".to_owned()),
                Value::Bool(true),
            ]))
        );
        assert_eq!(map.get("b"), Some(&Value::Null));
    }

    #[test]
    fn test_plain_string_integral_number() {
        assert_eq!(Value::Number(3.0).to_plain_string(), "3");
        assert_eq!(Value::Number(2.5).to_plain_string(), "2.5");
    }

    #[test]
    fn test_plain_string_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(Value::Date(date).to_plain_string(), "2024-03-01T00:00:00");
    }

    #[test]
    fn test_opaque_identity_equality() {
        let a = Opaque::new(42_u32);
        let b = a.clone();
        let c = Opaque::new(42_u32);
        assert_eq!(Value::Opaque(a.clone()), Value::Opaque(b));
        assert_ne!(Value::Opaque(a.clone()), Value::Opaque(c));
        assert_eq!(a.downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_serialize_opaque_as_null() {
        let mut map = Map::new();
        map.insert("page".to_owned(), Value::Opaque(Opaque::new("x")));
        map.insert("n".to_owned(), Value::Number(1.0));
        let json = serde_json::to_string(&Value::Object(map)).unwrap();
        assert_eq!(json, r#"{"n":1.0,"page":null}"#);
    }
}
