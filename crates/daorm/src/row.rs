//! Row materialization.
//!
//! A cursor's column list is turned into a plan once per query; every row is
//! then scanned through that plan. Derived records bind each column to a scalar
//! field, a JSON-decoded field, or nothing (columns the record does not know are
//! read and dropped). Maps keep every column.

use crate::client::{Cursor, Row};
use crate::error::{OrmError, OrmResult};
use crate::record::{FieldMut, Record};
use crate::resolver::resolve;
use crate::value::{FromValue, Value};
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// A destination rows can be scanned into.
///
/// Implemented by `#[derive(Record)]`, by `HashMap`/`BTreeMap<String, V>` for any
/// [`MapValue`], and by `Box<T>`.
pub trait FromRow: Sized {
    /// Per-query binding plan computed from the column list.
    type Plan;

    fn plan(columns: &[String]) -> OrmResult<Self::Plan>;

    /// Scan one row into `self`.
    fn scan(&mut self, plan: &Self::Plan, row: Row) -> OrmResult<()>;

    /// A fresh destination for `find`.
    fn blank() -> Self;
}

/// What a column of the result set is scanned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Scalar(Vec<&'static str>),
    Json(Vec<&'static str>),
    /// The record has no field for this column.
    Discard,
}

/// Binding plan of a derived record.
#[derive(Debug, Clone)]
pub struct RecordPlan {
    columns: Vec<String>,
    bindings: Vec<Binding>,
}

impl RecordPlan {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

/// Plan a query's columns against the resolved fields of `R`.
pub fn plan_record<R: Record>(columns: &[String]) -> OrmResult<RecordPlan> {
    let fields = resolve::<R>();
    let bindings = columns
        .iter()
        .map(|col| match fields.get(col) {
            Some(desc) if desc.json => Binding::Json(desc.path.clone()),
            Some(desc) => Binding::Scalar(desc.path.clone()),
            None => Binding::Discard,
        })
        .collect();
    Ok(RecordPlan {
        columns: columns.to_vec(),
        bindings,
    })
}

fn missing_field<R>(path: &[&str]) -> OrmError {
    OrmError::shape(format!(
        "{} has no accessor for field {}",
        std::any::type_name::<R>(),
        path.join(".")
    ))
}

/// Scan one row into a derived record.
pub fn scan_record<R: Record>(record: &mut R, plan: &RecordPlan, row: Row) -> OrmResult<()> {
    if row.len() != plan.bindings.len() {
        return Err(OrmError::shape(format!(
            "row has {} values for {} columns",
            row.len(),
            plan.bindings.len()
        )));
    }

    for ((column, binding), value) in plan.columns.iter().zip(&plan.bindings).zip(row) {
        match binding {
            Binding::Discard => {}
            Binding::Scalar(path) => match record.field_mut(path) {
                Some(FieldMut::Scalar(field)) => field
                    .set_value(value)
                    .map_err(|message| OrmError::decode(column, message))?,
                Some(FieldMut::Json(_)) | None => return Err(missing_field::<R>(path)),
            },
            Binding::Json(path) => {
                // NULL leaves the field as it was
                if value.is_null() {
                    continue;
                }
                let bytes = value.into_raw_bytes();
                match record.field_mut(path) {
                    Some(FieldMut::Json(field)) => field
                        .decode_json(&bytes)
                        .map_err(|e| OrmError::decode(column, e.to_string()))?,
                    Some(FieldMut::Scalar(_)) | None => return Err(missing_field::<R>(path)),
                }
            }
        }
    }
    Ok(())
}

/// A value type usable in map destinations.
///
/// Implemented for [`Value`], `String` (NULL reads as empty text), `serde_json::Value`,
/// the integer and float types, `bool`, and `Option<T>` of any [`FromValue`] type.
pub trait MapValue: Sized {
    fn from_column(column: &str, value: Value) -> OrmResult<Self>;
}

impl MapValue for Value {
    fn from_column(_column: &str, value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

impl MapValue for String {
    /// SQL NULL becomes the empty string.
    fn from_column(column: &str, value: Value) -> OrmResult<Self> {
        String::from_utf8(value.into_raw_bytes())
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }
}

impl MapValue for serde_json::Value {
    fn from_column(column: &str, value: Value) -> OrmResult<Self> {
        Ok(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => b.into(),
            Value::Int(i) => i.into(),
            Value::UInt(u) => u.into(),
            Value::Float(f) => f.into(),
            other => serde_json::Value::String(
                String::from_utf8(other.into_raw_bytes())
                    .map_err(|e| OrmError::decode(column, e.to_string()))?,
            ),
        })
    }
}

macro_rules! map_value_via_from_value {
    ($($t:ty),*) => {$(
        impl MapValue for $t {
            fn from_column(column: &str, value: Value) -> OrmResult<Self> {
                <$t as FromValue>::from_value(value)
                    .map_err(|message| OrmError::decode(column, message))
            }
        }
    )*};
}

map_value_via_from_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool);

/// Typed map values that tolerate NULL.
impl<T: FromValue> MapValue for Option<T> {
    fn from_column(column: &str, value: Value) -> OrmResult<Self> {
        Option::<T>::from_value(value).map_err(|message| OrmError::decode(column, message))
    }
}

impl<V: MapValue, S: BuildHasher + Default> FromRow for HashMap<String, V, S> {
    type Plan = Vec<String>;

    fn plan(columns: &[String]) -> OrmResult<Self::Plan> {
        Ok(columns.to_vec())
    }

    fn scan(&mut self, plan: &Self::Plan, row: Row) -> OrmResult<()> {
        for (column, value) in plan.iter().zip(row) {
            self.insert(column.clone(), V::from_column(column, value)?);
        }
        Ok(())
    }

    fn blank() -> Self {
        HashMap::default()
    }
}

impl<V: MapValue> FromRow for BTreeMap<String, V> {
    type Plan = Vec<String>;

    fn plan(columns: &[String]) -> OrmResult<Self::Plan> {
        Ok(columns.to_vec())
    }

    fn scan(&mut self, plan: &Self::Plan, row: Row) -> OrmResult<()> {
        for (column, value) in plan.iter().zip(row) {
            self.insert(column.clone(), V::from_column(column, value)?);
        }
        Ok(())
    }

    fn blank() -> Self {
        BTreeMap::new()
    }
}

impl<T: FromRow> FromRow for Box<T> {
    type Plan = T::Plan;

    fn plan(columns: &[String]) -> OrmResult<Self::Plan> {
        T::plan(columns)
    }

    fn scan(&mut self, plan: &Self::Plan, row: Row) -> OrmResult<()> {
        (**self).scan(plan, row)
    }

    fn blank() -> Self {
        Box::new(T::blank())
    }
}

fn closing<T>(cursor: &mut dyn Cursor, result: OrmResult<T>) -> OrmResult<T> {
    let closed = cursor.close();
    let value = result?;
    closed?;
    Ok(value)
}

/// Scan the first row of `cursor` into `dest`.
///
/// Returns `false` (leaving `dest` untouched) when there are no rows. The cursor is
/// closed in every case.
pub fn read_one<T: FromRow>(cursor: &mut dyn Cursor, dest: &mut T) -> OrmResult<bool> {
    let result = (|| -> OrmResult<bool> {
        let plan = T::plan(cursor.columns())?;
        match cursor.next_row()? {
            Some(row) => {
                dest.scan(&plan, row)?;
                Ok(true)
            }
            None => Ok(false),
        }
    })();
    closing(cursor, result)
}

/// Append one element per remaining row of `cursor` to `dest`.
///
/// Returns the number of rows read. The cursor is closed in every case.
pub fn read_all<T: FromRow>(cursor: &mut dyn Cursor, dest: &mut Vec<T>) -> OrmResult<usize> {
    let result = (|| -> OrmResult<usize> {
        let plan = T::plan(cursor.columns())?;
        let mut n = 0;
        while let Some(row) = cursor.next_row()? {
            let mut item = T::blank();
            item.scan(&plan, row)?;
            dest.push(item);
            n += 1;
        }
        Ok(n)
    })();
    closing(cursor, result)
}

/// Read the column named `column` from the first row.
pub fn read_scalar<T: FromValue>(cursor: &mut dyn Cursor, column: &str) -> OrmResult<Option<T>> {
    let result = (|| -> OrmResult<Option<T>> {
        let Some(index) = cursor.columns().iter().position(|c| c == column) else {
            return Err(OrmError::shape(format!("result has no column {column}")));
        };
        match cursor.next_row()? {
            Some(mut row) if index < row.len() => {
                let value = row.swap_remove(index);
                T::from_value(value)
                    .map(Some)
                    .map_err(|message| OrmError::decode(column, message))
            }
            Some(_) => Err(OrmError::shape("row is shorter than its column list")),
            None => Ok(None),
        }
    })();
    closing(cursor, result)
}
