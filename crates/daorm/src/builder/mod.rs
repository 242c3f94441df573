//! Statement assembly.
//!
//! [`SessionState`] holds everything a session has been configured with; the
//! `select`/`insert`/`update`/`delete` submodules turn it into a [`Statement`].
//! Nothing here talks to a connection.

mod delete;
mod insert;
mod select;
mod update;


pub use insert::{insert_records, insert_statement};

use crate::condition::Condition;
use crate::error::{OrmError, OrmResult};
use crate::placeholder::expand;
use crate::value::Value;
use std::fmt;

/// A finished statement: SQL text plus its bound arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Build a statement from a template, expanding `(?)` list placeholders.
    pub fn expanded(template: &str, args: Vec<Value>) -> OrmResult<Self> {
        let (sql, args) = expand(template, args)?;
        Ok(Self { sql, args })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.sql, self.args)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.sql, self.args)
    }
}

/// Keyword of a trailing clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    GroupBy,
    OrderBy,
    Limit,
}

impl ClauseKind {
    fn keyword(self) -> &'static str {
        match self {
            ClauseKind::GroupBy => "GROUP BY",
            ClauseKind::OrderBy => "ORDER BY",
            ClauseKind::Limit => "LIMIT",
        }
    }
}

/// A trailing clause, rendered as `" KEYWORD v1, v2"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub kind: ClauseKind,
    pub values: Vec<String>,
}

impl Clause {
    pub fn new(kind: ClauseKind, values: Vec<String>) -> Self {
        Self { kind, values }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, " {} {}", self.kind.keyword(), self.values.join(", "))
    }
}

/// Backtick-quote a column identifier.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Mutable builder state of one session.
#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub table: String,
    pub indexes: Vec<String>,
    pub cols: Vec<String>,
    pub cond: Option<Condition>,
    pub clauses: Vec<Clause>,
    pub upsert: Vec<String>,
    pub raw: Option<Statement>,
    /// First error raised by a chained call, reported by the next terminal operation.
    pub deferred: Option<OrmError>,
}

impl SessionState {
    /// Clear everything a terminal operation consumed. Allocations are kept.
    pub fn reset(&mut self) {
        self.table.clear();
        self.indexes.clear();
        self.cols.clear();
        self.cond = None;
        self.clauses.clear();
        self.upsert.clear();
        self.raw = None;
        self.deferred = None;
    }

    /// Whether the state equals a freshly reset one.
    pub fn is_clear(&self) -> bool {
        self.table.is_empty()
            && self.indexes.is_empty()
            && self.cols.is_empty()
            && self.cond.is_none()
            && self.clauses.is_empty()
            && self.upsert.is_empty()
            && self.raw.is_none()
            && self.deferred.is_none()
    }

    pub fn defer(&mut self, result: OrmResult<()>) {
        if let Err(err) = result {
            if self.deferred.is_none() {
                self.deferred = Some(err);
            }
        }
    }

    /// Fail with the first deferred error, if any.
    pub fn check_deferred(&mut self) -> OrmResult<()> {
        match self.deferred.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn where_(&mut self, template: &str, args: Vec<Value>) {
        let result = Condition::new(template, args).map(|cond| {
            self.cond = Some(cond);
        });
        self.defer(result);
    }

    pub fn and(&mut self, template: &str, args: Vec<Value>) {
        let result = self
            .cond
            .get_or_insert_with(Condition::default)
            .push_and(template, args);
        self.defer(result);
    }

    pub fn or(&mut self, template: &str, args: Vec<Value>) {
        let result = self
            .cond
            .get_or_insert_with(Condition::default)
            .push_or(template, args);
        self.defer(result);
    }

    pub fn push_clause(&mut self, kind: ClauseKind, values: Vec<String>) {
        self.clauses.push(Clause::new(kind, values));
    }

    /// Make the statement return at most one row.
    ///
    /// An existing `LIMIT` keeps its offset and has its count replaced; otherwise
    /// `LIMIT 1` is appended.
    pub fn force_single_row(&mut self) {
        let existing = self
            .clauses
            .iter_mut()
            .rev()
            .find(|c| c.kind == ClauseKind::Limit);
        match existing {
            Some(clause) => match clause.values.last_mut() {
                Some(count) => *count = "1".to_string(),
                None => clause.values.push("1".to_string()),
            },
            None => self.push_clause(ClauseKind::Limit, vec!["1".to_string()]),
        }
    }

    pub(crate) fn require_table(&self, op: &str) -> OrmResult<&str> {
        if self.table.is_empty() {
            return Err(OrmError::config(format!("{op} requires a table name")));
        }
        Ok(&self.table)
    }

    pub(crate) fn render_indexes(&self, out: &mut String) {
        if !self.indexes.is_empty() {
            out.push_str(" USE INDEX (");
            out.push_str(&self.indexes.join(", "));
            out.push(')');
        }
    }

    pub(crate) fn render_clauses(&self, out: &mut String) {
        use std::fmt::Write;
        for clause in &self.clauses {
            let _ = write!(out, "{clause}");
        }
    }
}
