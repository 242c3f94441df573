//! WHERE clause accumulation.
//!
//! A [`Condition`] collects predicate fragments in the order they are appended.
//! Each fragment is placeholder-expanded on its own, so `(?)` list expansion never
//! crosses fragment boundaries.
//!
//! # Example
//! ```ignore
//! use daorm::{Condition, args};
//!
//! let cond = Condition::new("status = ?", args!["active"])?
//!     .and("id in (?)", args![vec![1, 2, 3]])?
//!     .or("role = ?", args!["admin"])?;
//!
//! let (sql, params) = cond.build();
//! assert_eq!(sql, " WHERE status = ? AND (id in (?,?,?)) OR (role = ?)");
//! assert_eq!(params.len(), 5);
//! ```

use crate::error::OrmResult;
use crate::placeholder::expand;
use crate::value::Value;

/// Accumulated WHERE predicate and its bound arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    sql: String,
    args: Vec<Value>,
}

impl Condition {
    /// Start a condition from its first predicate.
    pub fn new(template: &str, args: Vec<Value>) -> OrmResult<Self> {
        let mut cond = Self::default();
        cond.push_first(template, args)?;
        Ok(cond)
    }

    /// Append `AND (template)`.
    pub fn and(mut self, template: &str, args: Vec<Value>) -> OrmResult<Self> {
        self.push_and(template, args)?;
        Ok(self)
    }

    /// Append `OR (template)`.
    pub fn or(mut self, template: &str, args: Vec<Value>) -> OrmResult<Self> {
        self.push_or(template, args)?;
        Ok(self)
    }

    pub(crate) fn push_first(&mut self, template: &str, args: Vec<Value>) -> OrmResult<()> {
        let (fragment, args) = expand(template, args)?;
        self.sql.push_str(&fragment);
        self.args.extend(args);
        Ok(())
    }

    pub(crate) fn push_and(&mut self, template: &str, args: Vec<Value>) -> OrmResult<()> {
        self.push_joined("AND", template, args)
    }

    pub(crate) fn push_or(&mut self, template: &str, args: Vec<Value>) -> OrmResult<()> {
        self.push_joined("OR", template, args)
    }

    fn push_joined(&mut self, joiner: &str, template: &str, args: Vec<Value>) -> OrmResult<()> {
        let (fragment, args) = expand(template, args)?;
        if self.sql.is_empty() {
            self.sql.push_str(&fragment);
        } else {
            self.sql.push(' ');
            self.sql.push_str(joiner);
            self.sql.push_str(" (");
            self.sql.push_str(&fragment);
            self.sql.push(')');
        }
        self.args.extend(args);
        Ok(())
    }

    /// Whether no predicate has been appended.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }

    /// The predicate text without the `WHERE` keyword.
    pub fn predicate(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Render as `" WHERE ..."` (empty when there is no predicate) plus the
    /// flattened arguments in append order.
    pub fn build(&self) -> (String, Vec<Value>) {
        if self.sql.is_empty() {
            return (String::new(), Vec::new());
        }
        (format!(" WHERE {}", self.sql), self.args.clone())
    }

    /// Like [`Condition::build`], consuming the condition.
    pub fn into_parts(self) -> (String, Vec<Value>) {
        if self.sql.is_empty() {
            return (String::new(), Vec::new());
        }
        (format!(" WHERE {}", self.sql), self.args)
    }
}

/// Build an optional condition, rendering nothing when absent.
pub(crate) fn build_optional(cond: Option<&Condition>) -> (String, Vec<Value>) {
    cond.map(Condition::build).unwrap_or_default()
}
