//! Records as sources of column values for INSERT and UPDATE.

use crate::error::{OrmError, OrmResult};
use crate::record::{FieldRef, Record};
use crate::resolver::resolve;
use crate::value::{ToValue, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// One column of a record with its bound value.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundColumn {
    pub column: String,
    pub value: Value,
    /// Whether the source field held its zero value.
    pub zero: bool,
}

impl BoundColumn {
    pub fn new(column: impl Into<String>, value: Value, zero: bool) -> Self {
        Self {
            column: column.into(),
            value,
            zero,
        }
    }
}

/// Column values read from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordValues {
    /// From a derived record, in resolved column order.
    Fielded(Vec<BoundColumn>),
    /// From a key/value map. Every key is written on update.
    Mapped(Vec<BoundColumn>),
}

impl RecordValues {
    pub fn columns(&self) -> &[BoundColumn] {
        match self {
            RecordValues::Fielded(cols) | RecordValues::Mapped(cols) => cols,
        }
    }

    pub fn into_columns(self) -> Vec<BoundColumn> {
        match self {
            RecordValues::Fielded(cols) | RecordValues::Mapped(cols) => cols,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, RecordValues::Mapped(_))
    }
}

/// A value that can be written as one table row.
///
/// Implemented by `#[derive(Record)]` and by `HashMap`/`BTreeMap` keyed by column
/// name.
pub trait Writable {
    fn record_values(&self) -> OrmResult<RecordValues>;
}

/// Read the resolved columns of a derived record.
pub fn record_values<R: Record>(record: &R) -> OrmResult<RecordValues> {
    let fields = resolve::<R>();
    let mut out = Vec::with_capacity(fields.len());
    for desc in fields.iter() {
        let field = record.field(desc.path()).ok_or_else(|| {
            OrmError::shape(format!(
                "{} has no accessor for field {}",
                std::any::type_name::<R>(),
                desc.path.join(".")
            ))
        })?;
        let zero = field.is_zero();
        let value = match field {
            FieldRef::Scalar(f) => f.to_value(),
            FieldRef::Json(f) => Value::Text(f.encode_json()?),
        };
        out.push(BoundColumn::new(desc.column.clone(), value, zero));
    }
    Ok(RecordValues::Fielded(out))
}

fn mapped<'a, V, I>(entries: I) -> RecordValues
where
    V: ToValue + 'a,
    I: Iterator<Item = (&'a String, &'a V)>,
{
    RecordValues::Mapped(
        entries
            .map(|(k, v)| BoundColumn::new(k.clone(), v.to_value(), v.is_zero()))
            .collect(),
    )
}

impl<V: ToValue, S: BuildHasher> Writable for HashMap<String, V, S> {
    fn record_values(&self) -> OrmResult<RecordValues> {
        // sorted so the generated column order is stable
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        Ok(mapped(entries.into_iter()))
    }
}

impl<V: ToValue> Writable for BTreeMap<String, V> {
    fn record_values(&self) -> OrmResult<RecordValues> {
        Ok(mapped(self.iter()))
    }
}

impl<W: Writable + ?Sized> Writable for &W {
    fn record_values(&self) -> OrmResult<RecordValues> {
        (**self).record_values()
    }
}

impl<W: Writable + ?Sized> Writable for Box<W> {
    fn record_values(&self) -> OrmResult<RecordValues> {
        (**self).record_values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_map_columns_are_sorted() {
        let mut m = HashMap::new();
        m.insert("b".to_string(), Value::Int(2));
        m.insert("a".to_string(), Value::Int(0));
        let values = m.record_values().unwrap();
        assert!(values.is_mapped());
        let cols = values.columns();
        assert_eq!(cols[0], BoundColumn::new("a", Value::Int(0), true));
        assert_eq!(cols[1], BoundColumn::new("b", Value::Int(2), false));
    }
}
