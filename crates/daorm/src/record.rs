//! Record traits and declared field metadata.
//!
//! `#[derive(Record)]` describes a struct's fields as static [`FieldDecl`]s and
//! generates path-based accessors. What a field *means* to the database (its
//! column name, whether it is JSON-encoded, how embedded records merge) is decided
//! once per type by [`crate::resolver`].
//!
//! # Example
//!
//! ```ignore
//! use daorm::Record;
//!
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     id: i64,
//!     #[orm(column = "user_name")]
//!     name: String,
//!     tags: Vec<String>,          // JSON-encoded
//!     #[orm(skip)]
//!     cached: Option<String>,
//!     #[orm(flatten)]
//!     audit: Audit,               // merged into User's columns
//! }
//! ```

use crate::error::OrmResult;
use crate::value::{FromValue, ToValue, Value};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// The semantic kind of a declared field, as seen by the derive macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Numbers, booleans, text and other directly bindable types.
    Scalar,
    /// Timestamp-like structured values, bound directly.
    Timestamp,
    /// `Vec<u8>`, bound directly.
    Bytes,
    /// Any other structured value.
    Struct,
    /// A sequence of non-byte elements.
    Sequence,
    /// A flattened sub-record.
    Embedded,
}

/// Static metadata for one declared field.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecl {
    /// The Rust identifier.
    pub ident: &'static str,
    /// `#[orm(column = "...")]`
    pub column: Option<&'static str>,
    /// `#[orm(skip)]`
    pub skip: bool,
    /// `#[orm(json)]`
    pub json: bool,
    pub kind: FieldKind,
    /// Declared fields of the embedded record, for `#[orm(flatten)]`.
    pub embedded: Option<fn() -> Vec<FieldDecl>>,
}

impl FieldDecl {
    /// A plain field of the given kind.
    pub const fn new(ident: &'static str, kind: FieldKind) -> Self {
        Self {
            ident,
            column: None,
            skip: false,
            json: false,
            kind,
            embedded: None,
        }
    }

    pub const fn column(mut self, column: &'static str) -> Self {
        self.column = Some(column);
        self
    }

    pub const fn skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub const fn json(mut self) -> Self {
        self.json = true;
        self
    }

    pub const fn embedded(mut self, fields: fn() -> Vec<FieldDecl>) -> Self {
        self.kind = FieldKind::Embedded;
        self.embedded = Some(fields);
        self
    }

    /// Whether values of this field travel as JSON text.
    pub fn requires_json(&self) -> bool {
        self.json || matches!(self.kind, FieldKind::Struct | FieldKind::Sequence)
    }
}

/// A field that binds directly to a column.
pub trait ScalarField {
    fn to_value(&self) -> Value;

    fn set_value(&mut self, value: Value) -> Result<(), String>;

    fn is_zero(&self) -> bool;
}

impl<T: ToValue + FromValue> ScalarField for T {
    fn to_value(&self) -> Value {
        ToValue::to_value(self)
    }

    fn set_value(&mut self, value: Value) -> Result<(), String> {
        *self = T::from_value(value)?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        ToValue::is_zero(self)
    }
}

/// A field that travels as JSON text.
pub trait JsonField {
    fn encode_json(&self) -> OrmResult<String>;

    fn decode_json(&mut self, bytes: &[u8]) -> OrmResult<()>;

    fn is_zero(&self) -> bool;
}

impl<T: Serialize + DeserializeOwned> JsonField for T {
    fn encode_json(&self) -> OrmResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn decode_json(&mut self, bytes: &[u8]) -> OrmResult<()> {
        *self = serde_json::from_slice(bytes)?;
        Ok(())
    }

    fn is_zero(&self) -> bool {
        serde_json::to_value(self).is_ok_and(|v| json_is_zero(&v))
    }
}

/// Zero in the sense of "every leaf is empty, false, zero or null".
pub(crate) fn json_is_zero(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !*b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(map) => map.values().all(json_is_zero),
    }
}

/// Shared access to a record field.
pub enum FieldRef<'a> {
    Scalar(&'a dyn ScalarField),
    Json(&'a dyn JsonField),
}

/// Mutable access to a record field.
pub enum FieldMut<'a> {
    Scalar(&'a mut dyn ScalarField),
    Json(&'a mut dyn JsonField),
}

impl FieldRef<'_> {
    pub fn is_zero(&self) -> bool {
        match self {
            FieldRef::Scalar(f) => f.is_zero(),
            FieldRef::Json(f) => f.is_zero(),
        }
    }
}

/// A struct mapped to a table row.
///
/// Implemented by `#[derive(Record)]`. Paths are the Rust identifiers leading to a
/// field: `["name"]` for a direct field, `["audit", "created_at"]` for a field of a
/// flattened sub-record.
pub trait Record: Default + 'static {
    /// Declared fields, in declaration order.
    fn declared_fields() -> Vec<FieldDecl>;

    fn field(&self, path: &[&str]) -> Option<FieldRef<'_>>;

    fn field_mut(&mut self, path: &[&str]) -> Option<FieldMut<'_>>;
}
