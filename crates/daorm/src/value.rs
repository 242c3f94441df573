//! Bound argument and column values.
//!
//! Every argument handed to a statement and every column read back from a cursor
//! is a [`Value`]. Rust types move in and out through [`ToValue`] / [`FromValue`];
//! anything that has no scalar mapping goes through JSON instead (see
//! [`crate::record::JsonField`]).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Text form used for timestamps when they have to travel as strings.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Text form used for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A dynamically typed SQL value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
    /// A raw SQL expression, inlined verbatim instead of bound.
    ///
    /// Only honored in INSERT/UPDATE value positions. The caller is responsible for
    /// making sure the text is safe.
    Raw(String),
    /// A sequence, expanded by `(?)` placeholders.
    List(Vec<Value>),
}

impl Value {
    /// Create a raw SQL expression value, e.g. `Value::raw("hits + 1")`.
    pub fn raw(expr: impl Into<String>) -> Self {
        Value::Raw(expr.into())
    }

    /// Create a list value from anything convertible.
    pub fn list<T: ToValue>(items: impl IntoIterator<Item = T>) -> Self {
        Value::List(items.into_iter().map(|v| v.to_value()).collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is the zero value of its kind.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::UInt(u) => *u == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) | Value::Raw(s) => s.is_empty(),
            Value::Bytes(b) => b.is_empty(),
            Value::Timestamp(ts) => *ts == NaiveDateTime::default(),
            Value::List(items) => items.is_empty(),
        }
    }

    /// Short kind name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Raw(_) => "raw",
            Value::List(_) => "list",
        }
    }

    /// The byte form a driver would hand out for this value. NULL becomes empty.
    pub fn into_raw_bytes(self) -> Vec<u8> {
        match self {
            Value::Null => Vec::new(),
            Value::Bytes(b) => b,
            Value::Text(s) | Value::Raw(s) => s.into_bytes(),
            Value::Bool(true) => b"1".to_vec(),
            Value::Bool(false) => b"0".to_vec(),
            Value::Int(i) => i.to_string().into_bytes(),
            Value::UInt(u) => u.to_string().into_bytes(),
            Value::Float(f) => f.to_string().into_bytes(),
            Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string().into_bytes(),
            Value::List(items) => items
                .into_iter()
                .map(|v| String::from_utf8_lossy(&v.into_raw_bytes()).into_owned())
                .collect::<Vec<_>>()
                .join(",")
                .into_bytes(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Raw(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Conversion of a Rust value into a bound [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;

    /// Whether the value counts as "unset" for partial updates and key omission.
    fn is_zero(&self) -> bool {
        self.to_value().is_zero()
    }
}

/// Conversion of a column [`Value`] into a Rust value.
///
/// The error is a plain message; callers attach the column name.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, String>;
}

fn unexpected(value: &Value, target: &str) -> String {
    format!("cannot convert {} value to {}", value.kind(), target)
}

fn text_of(value: Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s),
        Value::Bytes(b) => String::from_utf8(b).ok(),
        _ => None,
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, String> {
        Ok(value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, String> {
                let target = stringify!($t);
                match value {
                    Value::Int(i) => <$t>::try_from(i).map_err(|e| e.to_string()),
                    Value::UInt(u) => <$t>::try_from(u).map_err(|e| e.to_string()),
                    Value::Bool(b) => Ok(b as $t),
                    Value::Float(f) if f.fract() == 0.0 => Ok(f as $t),
                    Value::Null => Err(format!("unexpected NULL for {target}")),
                    other => match text_of(other.clone()) {
                        Some(s) => s.trim().parse::<$t>().map_err(|e| e.to_string()),
                        None => Err(unexpected(&other, target)),
                    },
                }
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::UInt(*self as u64)
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, String> {
                let target = stringify!($t);
                match value {
                    Value::Int(i) => <$t>::try_from(i).map_err(|e| e.to_string()),
                    Value::UInt(u) => <$t>::try_from(u).map_err(|e| e.to_string()),
                    Value::Bool(b) => Ok(b as $t),
                    Value::Float(f) if f.fract() == 0.0 && f >= 0.0 => Ok(f as $t),
                    Value::Null => Err(format!("unexpected NULL for {target}")),
                    other => match text_of(other.clone()) {
                        Some(s) => s.trim().parse::<$t>().map_err(|e| e.to_string()),
                        None => Err(unexpected(&other, target)),
                    },
                }
            }
        }
    )*};
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u16, u32, u64, usize);

// u8 gets its own impls: `Vec<u8>` is bytes, not a list.
impl ToValue for u8 {
    fn to_value(&self) -> Value {
        Value::UInt(u64::from(*self))
    }
}

impl FromValue for u8 {
    fn from_value(value: Value) -> Result<Self, String> {
        u64::from_value(value).and_then(|u| u8::try_from(u).map_err(|e| e.to_string()))
    }
}

macro_rules! impl_float {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Float(f64::from(*self))
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, String> {
                let target = stringify!($t);
                match value {
                    Value::Float(f) => Ok(f as $t),
                    Value::Int(i) => Ok(i as $t),
                    Value::UInt(u) => Ok(u as $t),
                    Value::Null => Err(format!("unexpected NULL for {target}")),
                    other => match text_of(other.clone()) {
                        Some(s) => s.trim().parse::<$t>().map_err(|e| e.to_string()),
                        None => Err(unexpected(&other, target)),
                    },
                }
            }
        }
    )*};
}

impl_float!(f32, f64);

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::UInt(u) => Ok(u != 0),
            Value::Null => Err("unexpected NULL for bool".to_string()),
            other => match text_of(other.clone()).as_deref().map(str::trim) {
                Some("1") | Some("true") | Some("TRUE") => Ok(true),
                Some("0") | Some("false") | Some("FALSE") => Ok(false),
                _ => Err(unexpected(&other, "bool")),
            },
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Err("unexpected NULL for String".to_string()),
            Value::Text(s) => Ok(s),
            Value::Bytes(b) => String::from_utf8(b).map_err(|e| e.to_string()),
            other => Ok(String::from_utf8_lossy(&other.into_raw_bytes()).into_owned()),
        }
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Err("unexpected NULL for Vec<u8>".to_string()),
            other => Ok(other.into_raw_bytes()),
        }
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.naive_utc()))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map(NaiveDateTime::from)
        })
        .map_err(|e| format!("invalid timestamp '{s}': {e}"))
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Int(secs) => DateTime::from_timestamp(secs, 0)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| format!("timestamp out of range: {secs}")),
            Value::Null => Err("unexpected NULL for timestamp".to_string()),
            other => match text_of(other.clone()) {
                Some(s) => parse_timestamp(&s),
                None => Err(unexpected(&other, "timestamp")),
            },
        }
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, String> {
        NaiveDateTime::from_value(value).map(|ts| ts.and_utc())
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Text(self.format(DATE_FORMAT).to_string())
    }

    fn is_zero(&self) -> bool {
        *self == NaiveDate::default()
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Timestamp(ts) => Ok(ts.date()),
            Value::Null => Err("unexpected NULL for date".to_string()),
            other => match text_of(other.clone()) {
                Some(s) => parse_timestamp(&s).map(|ts| ts.date()),
                None => Err(unexpected(&other, "date")),
            },
        }
    }
}

impl ToValue for uuid::Uuid {
    fn to_value(&self) -> Value {
        Value::Text(self.hyphenated().to_string())
    }

    fn is_zero(&self) -> bool {
        self.is_nil()
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => uuid::Uuid::parse_str(s.trim()).map_err(|e| e.to_string()),
            Value::Bytes(b) if b.len() == 16 => {
                uuid::Uuid::from_slice(&b).map_err(|e| e.to_string())
            }
            Value::Bytes(b) => String::from_utf8(b)
                .map_err(|e| e.to_string())
                .and_then(|s| uuid::Uuid::parse_str(s.trim()).map_err(|e| e.to_string())),
            other => Err(unexpected(&other, "uuid")),
        }
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn is_zero(&self) -> bool {
        self.is_null()
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| e.to_string()),
            Value::Bytes(b) => serde_json::from_slice(&b).map_err(|e| e.to_string()),
            other => Err(unexpected(&other, "json")),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn is_zero(&self) -> bool {
        self.is_none()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

macro_rules! impl_list {
    ($($t:ty),*) => {$(
        impl ToValue for Vec<$t> {
            fn to_value(&self) -> Value {
                Value::List(self.iter().map(ToValue::to_value).collect())
            }
        }

        impl ToValue for [$t] {
            fn to_value(&self) -> Value {
                Value::List(self.iter().map(ToValue::to_value).collect())
            }
        }
    )*};
}

impl_list!(
    i8, i16, i32, i64, isize, u16, u32, u64, usize, f32, f64, bool, String, &str, uuid::Uuid,
    Value
);

/// Build a `Vec<Value>` of bound arguments.
///
/// ```ignore
/// session.where_("name = ? and id in (?)", args!["x", vec![1, 2, 3]]);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::ToValue::to_value(&$arg)),+]
    };
}
