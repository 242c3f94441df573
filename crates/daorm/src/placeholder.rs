//! `?` placeholder expansion.
//!
//! A `(?)` placeholder bound to a [`Value::List`] expands into one placeholder per
//! element, and the elements are flattened into the argument list:
//!
//! ```ignore
//! let (sql, args) = expand("name = ? and id in (?)", args!["x", vec![1, 2, 3]])?;
//! assert_eq!(sql, "name = ? and id in (?,?,?)");
//! assert_eq!(args, args!["x", 1, 2, 3]);
//! ```
//!
//! An empty list renders as `(NULL)`, which is valid SQL and matches nothing.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Expand `(?)` list placeholders in `template`.
///
/// Every `?` consumes the next argument in order. Arguments left over after the
/// last placeholder are passed through unchanged.
pub fn expand(template: &str, args: Vec<Value>) -> OrmResult<(String, Vec<Value>)> {
    let mut sql = String::with_capacity(template.len());
    let mut out = Vec::with_capacity(args.len());
    let mut args = args.into_iter();
    let mut consumed = 0usize;

    for c in template.chars() {
        if c != '?' {
            sql.push(c);
            continue;
        }

        let Some(arg) = args.next() else {
            return Err(OrmError::validation(format!(
                "not enough arguments for placeholders in '{template}': got {consumed}"
            )));
        };
        consumed += 1;

        match arg {
            // the previous template character is copied verbatim, so this checks the template
            Value::List(items) if sql.ends_with('(') => {
                if items.is_empty() {
                    sql.push_str("NULL");
                } else {
                    for i in 0..items.len() {
                        if i > 0 {
                            sql.push(',');
                        }
                        sql.push('?');
                    }
                    out.extend(items);
                }
            }
            other => {
                sql.push('?');
                out.push(other);
            }
        }
    }
    out.extend(args);
    Ok((sql, out))
}

/// Number of `?` placeholders in `sql`.
pub fn count_placeholders(sql: &str) -> usize {
    sql.matches('?').count()
}
