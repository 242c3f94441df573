//! The fluent session.
//!
//! A [`Session`] is configured through chained calls and consumed by one terminal
//! operation (`get`, `find`, `count`, `insert`, `insert_many`, `update`, `delete`,
//! `exec`). Every terminal operation resets the configuration, whether it
//! succeeded or not, so the same session can build the next statement.
//!
//! ```ignore
//! let mut users: Vec<User> = Vec::new();
//! dao.session()
//!     .table("users")
//!     .where_("age > ?", args![18])
//!     .and("id in (?)", args![vec![1, 2, 3]])
//!     .order_by(["id DESC"])
//!     .limit(10)
//!     .find(&mut users)?;
//! ```
//!
//! Errors in chained calls (for instance a template with more placeholders than
//! arguments) are held back and returned by the next terminal operation.

use crate::builder::{ClauseKind, SessionState, Statement, insert_statement};
use crate::client::{Cursor, GenericClient, Transaction};
use crate::dao::Dao;
use crate::error::OrmResult;
use crate::row::{self, FromRow};
use crate::value::Value;
use crate::writable::Writable;
use std::fmt;

/// Column alias `count` reads its result from.
const COUNT_COLUMN: &str = "cnt";

pub struct Session<'d> {
    dao: &'d Dao,
    tag: String,
    state: SessionState,
    pub(crate) tx: Option<Box<dyn Transaction>>,
}

fn strings<I, S>(items: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into)
}

impl<'d> Session<'d> {
    pub(crate) fn new(dao: &'d Dao, tag: String, state: SessionState) -> Self {
        Self {
            dao,
            tag,
            state,
            tx: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn dao(&self) -> &'d Dao {
        self.dao
    }

    /// Whether statements currently run inside a transaction.
    pub fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }

    // ==================== Configuration ====================

    pub fn table(&mut self, name: impl Into<String>) -> &mut Self {
        self.state.table = name.into();
        self
    }

    /// `USE INDEX (...)` hint, placed after the table name.
    pub fn use_index<I, S>(&mut self, indexes: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.indexes.extend(strings(indexes));
        self
    }

    /// Columns to select, or to write on `update`.
    pub fn cols<I, S>(&mut self, cols: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.cols.extend(strings(cols));
        self
    }

    /// Alias of [`Session::cols`].
    pub fn select<I, S>(&mut self, cols: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cols(cols)
    }

    /// Replace the condition with `template`.
    pub fn where_(&mut self, template: &str, args: Vec<Value>) -> &mut Self {
        self.state.where_(template, args);
        self
    }

    pub fn and(&mut self, template: &str, args: Vec<Value>) -> &mut Self {
        self.state.and(template, args);
        self
    }

    pub fn or(&mut self, template: &str, args: Vec<Value>) -> &mut Self {
        self.state.or(template, args);
        self
    }

    pub fn order_by<I, S>(&mut self, cols: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.push_clause(ClauseKind::OrderBy, strings(cols).collect());
        self
    }

    pub fn group_by<I, S>(&mut self, cols: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.push_clause(ClauseKind::GroupBy, strings(cols).collect());
        self
    }

    pub fn limit(&mut self, n: u64) -> &mut Self {
        self.state.push_clause(ClauseKind::Limit, vec![n.to_string()]);
        self
    }

    /// `LIMIT offset, n`
    pub fn limit_offset(&mut self, offset: u64, n: u64) -> &mut Self {
        self.state.push_clause(ClauseKind::Limit, vec![offset.to_string(), n.to_string()]);
        self
    }

    /// Columns refreshed by `ON DUPLICATE KEY UPDATE` on the next insert.
    pub fn on_duplicate_update<I, S>(&mut self, cols: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.upsert.extend(strings(cols));
        self
    }

    /// Use `sql` verbatim for the next `get`/`find`/`count`.
    pub fn query(&mut self, sql: &str, args: Vec<Value>) -> &mut Self {
        match Statement::expanded(sql, args) {
            Ok(stmt) => self.state.raw = Some(stmt),
            Err(err) => self.state.defer(Err(err)),
        }
        self
    }

    // ==================== Terminal operations ====================

    /// Read at most one row into `dest`.
    ///
    /// Returns `Ok(false)` and leaves `dest` untouched when nothing matched.
    pub fn get<T: FromRow>(&mut self, dest: &mut T) -> OrmResult<bool> {
        let result = self.get_inner(dest);
        self.state.reset();
        result
    }

    fn get_inner<T: FromRow>(&mut self, dest: &mut T) -> OrmResult<bool> {
        self.state.check_deferred()?;
        if self.state.raw.is_none() {
            self.state.force_single_row();
        }
        let stmt = self.state.select_statement()?;
        let mut cursor = self.run_query(&stmt)?;
        row::read_one(cursor.as_mut(), dest)
    }

    /// Append one element per matching row to `dest`.
    pub fn find<T: FromRow>(&mut self, dest: &mut Vec<T>) -> OrmResult<usize> {
        let result = self.find_inner(dest);
        self.state.reset();
        result
    }

    fn find_inner<T: FromRow>(&mut self, dest: &mut Vec<T>) -> OrmResult<usize> {
        self.state.check_deferred()?;
        let stmt = self.state.select_statement()?;
        let mut cursor = self.run_query(&stmt)?;
        row::read_all(cursor.as_mut(), dest)
    }

    /// Number of matching rows.
    pub fn count(&mut self) -> OrmResult<i64> {
        let result = self.count_inner();
        self.state.reset();
        result
    }

    fn count_inner(&mut self) -> OrmResult<i64> {
        self.state.check_deferred()?;
        let stmt = self.state.count_statement()?;
        let mut cursor = self.run_query(&stmt)?;
        Ok(row::read_scalar::<i64>(cursor.as_mut(), COUNT_COLUMN)?.unwrap_or(0))
    }

    /// Insert one record. Returns the number of affected rows.
    pub fn insert<W: Writable + ?Sized>(&mut self, record: &W) -> OrmResult<u64> {
        let result = self.insert_inner(record);
        self.state.reset();
        result
    }

    fn insert_inner<W: Writable + ?Sized>(&mut self, record: &W) -> OrmResult<u64> {
        self.state.check_deferred()?;
        let stmt = self.state.insert_statement(record.record_values()?)?;
        self.run_exec(&stmt)
    }

    /// Insert `records` one at a time, stopping at the first failure.
    ///
    /// Returns the summed affected-row count.
    pub fn insert_many<W: Writable>(&mut self, records: &[W]) -> OrmResult<u64> {
        let result = self.insert_many_inner(records);
        self.state.reset();
        result
    }

    fn insert_many_inner<W: Writable>(&mut self, records: &[W]) -> OrmResult<u64> {
        self.state.check_deferred()?;
        let mut affected = 0;
        for record in records {
            let stmt = insert_statement(
                &self.state.table,
                record.record_values()?,
                &self.state.upsert,
            )?;
            affected += self.run_exec(&stmt)?;
        }
        Ok(affected)
    }

    /// Update matching rows from `record`.
    ///
    /// For derived records, configured [`Session::cols`] are written as they are;
    /// without them every non-zero field is written. Maps write every key.
    pub fn update<W: Writable + ?Sized>(&mut self, record: &W) -> OrmResult<u64> {
        let result = self.update_inner(record);
        self.state.reset();
        result
    }

    fn update_inner<W: Writable + ?Sized>(&mut self, record: &W) -> OrmResult<u64> {
        self.state.check_deferred()?;
        let stmt = self.state.update_statement(record.record_values()?)?;
        self.run_exec(&stmt)
    }

    pub fn delete(&mut self) -> OrmResult<u64> {
        let result = self.delete_inner();
        self.state.reset();
        result
    }

    fn delete_inner(&mut self) -> OrmResult<u64> {
        self.state.check_deferred()?;
        let stmt = self.state.delete_statement()?;
        self.run_exec(&stmt)
    }

    /// Run a raw statement.
    pub fn exec(&mut self, sql: &str, args: Vec<Value>) -> OrmResult<u64> {
        let result = self.exec_inner(sql, args);
        self.state.reset();
        result
    }

    fn exec_inner(&mut self, sql: &str, args: Vec<Value>) -> OrmResult<u64> {
        self.state.check_deferred()?;
        let stmt = Statement::expanded(sql, args)?;
        self.run_exec(&stmt)
    }

    // ==================== Routing ====================

    /// The transaction when one is bound, otherwise the connection.
    fn client(&self) -> &dyn GenericClient {
        match &self.tx {
            Some(tx) => &**tx,
            None => &**self.dao.connection(),
        }
    }

    fn run_query(&self, stmt: &Statement) -> OrmResult<Box<dyn Cursor>> {
        let client = self.client();
        self.dao
            .monitor()
            .observe(&self.tag, stmt.sql(), stmt.args(), || {
                client.query(stmt.sql(), stmt.args())
            })
    }

    fn run_exec(&self, stmt: &Statement) -> OrmResult<u64> {
        let client = self.client();
        self.dao
            .monitor()
            .observe(&self.tag, stmt.sql(), stmt.args(), || {
                client.exec(stmt.sql(), stmt.args())
            })
    }

    pub(crate) fn reset_state(&mut self) {
        self.state.reset();
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.dao.pool().release(state);
    }
}

impl fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("tag", &self.tag)
            .field("state", &self.state)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}
