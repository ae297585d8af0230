//! Dynamic values used as parameter objects, bindings and row cells.

use crate::error::{MapperError, MapperResult};
use crate::reflection::{Bean, TypeDesc};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// A dynamically typed value.
///
/// Parameter objects handed to a mapped statement, values produced by template
/// bindings and the cells of a returned [`Row`](crate::backend::Row) are all
/// `Value`s. Structs take part through [`Value::Bean`], whose properties are
/// resolved through a [`Reflector`](crate::reflection::Reflector).
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Bean(Arc<dyn Bean>),
}

impl Value {
    /// Wrap a bean as a parameter object.
    pub fn bean<B: Bean>(bean: B) -> Self {
        Value::Bean(Arc::new(bean))
    }

    /// Build a map value from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value stands for itself rather than holding named or
    /// indexed members. JSON objects and arrays hold members.
    pub fn is_scalar(&self) -> bool {
        match self {
            Value::List(_) | Value::Map(_) | Value::Bean(_) => false,
            Value::Json(json) => !(json.is_object() || json.is_array()),
            _ => true,
        }
    }

    /// A JSON object or array as the equivalent `Map` or `List`, so property
    /// paths can read into it. `None` for every other value.
    pub fn expand_json(&self) -> Option<Value> {
        match self {
            Value::Json(json) if json.is_object() || json.is_array() => {
                Some(Value::from(json.clone()))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_bean(&self) -> Option<&Arc<dyn Bean>> {
        match self {
            Value::Bean(b) => Some(b),
            _ => None,
        }
    }

    /// Runtime type of this value, as seen by placeholder type resolution.
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Value::Null => TypeDesc::object(),
            Value::Bool(_) => TypeDesc::boolean(),
            Value::Int(_) => TypeDesc::integer(),
            Value::Float(_) => TypeDesc::float(),
            Value::Text(_) => TypeDesc::text(),
            Value::Bytes(_) => TypeDesc::bytes(),
            Value::Timestamp(_) => TypeDesc::timestamp(),
            Value::Uuid(_) => TypeDesc::uuid(),
            Value::Json(_) => TypeDesc::json(),
            Value::List(_) => TypeDesc::list(),
            Value::Map(_) => TypeDesc::map(),
            Value::Bean(b) => b.class_def().type_desc().clone(),
        }
    }

    /// Short type label used in statement logs, e.g. `5(Int)`.
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Text(_) => "Text",
            Value::Bytes(_) => "Bytes",
            Value::Timestamp(_) => "Timestamp",
            Value::Uuid(_) => "Uuid",
            Value::Json(_) => "Json",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Bean(_) => "Bean",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::Timestamp(t) => write!(f, "Timestamp({t})"),
            Value::Uuid(u) => write!(f, "Uuid({u})"),
            Value::Json(j) => write!(f, "Json({j})"),
            Value::List(l) => f.debug_tuple("List").field(l).finish(),
            Value::Map(m) => f.debug_tuple("Map").field(m).finish(),
            Value::Bean(b) => write!(f, "Bean({})", b.class_def().name()),
        }
    }
}

/// Text rendering used by `${}` substitution: `Null` renders as empty text.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => {
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Timestamp(t) => write!(f, "{t}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::List(l) => {
                f.write_str("[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_str("}")
            }
            Value::Bean(b) => write!(f, "{}", b.class_def().name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Uuid(a), Value::Uuid(b)) => a == b,
            (Value::Json(a), Value::Json(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Bean(a), Value::Bean(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ==================== Conversions into Value ====================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

// u8 is left out so `Vec<u8>` converts to bytes rather than a list.
impl_from_int!(i8, i16, i32, i64, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(v: BTreeMap<String, V>) -> Self {
        Value::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<V: Into<Value>> From<std::collections::HashMap<String, V>> for Value {
    fn from(v: std::collections::HashMap<String, V>) -> Self {
        Value::Map(v.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

/// JSON objects become maps and arrays become lists, so JSON documents can be
/// used directly as parameter objects.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => {
                Value::Map(o.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

// ==================== Conversions out of Value ====================

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> MapperResult<Self>;
}

fn mismatch(expected: &str, got: &Value) -> MapperError {
    MapperError::binding(format!(
        "cannot convert {} value to {expected}",
        got.type_label()
    ))
}

impl FromValue for Value {
    fn from_value(value: Value) -> MapperResult<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> MapperResult<Self> {
                    let wide = value.as_i64().ok_or_else(|| mismatch(stringify!($t), &value))?;
                    <$t>::try_from(wide).map_err(|_| {
                        MapperError::binding(format!("{wide} out of range for {}", stringify!($t)))
                    })
                }
            }
        )*
    };
}

impl_from_value_int!(i8, i16, i32, i64, u16, u32, u64, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> MapperResult<Self> {
        value.as_f64().ok_or_else(|| mismatch("f64", &value))
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> MapperResult<Self> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| mismatch("f32", &value))
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch("String", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => Err(mismatch("Vec<u8>", &other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            other => Err(mismatch("NaiveDateTime", &other)),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(s) => Uuid::parse_str(&s)
                .map_err(|e| MapperError::binding(format!("invalid uuid '{s}': {e}"))),
            other => Err(mismatch("Uuid", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Value::Int(i) => Ok(serde_json::Value::from(i)),
            Value::Float(f) => Ok(serde_json::Value::from(f)),
            Value::Text(s) => Ok(serde_json::Value::String(s)),
            other => Err(mismatch("serde_json::Value", &other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> MapperResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("Vec", &other)),
        }
    }
}
