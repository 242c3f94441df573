//! Connection-side traits consumed by the session.
//!
//! daorm never talks to a database directly. A driver adapter implements
//! [`Connection`] (and hands out [`Transaction`]s and [`Cursor`]s); sessions route
//! every statement through [`GenericClient`], so the same code path serves both the
//! ambient connection and an open transaction.

use crate::error::OrmResult;
use crate::value::Value;
use std::collections::VecDeque;

/// One result row, in cursor column order.
pub type Row = Vec<Value>;

/// A trait that unifies connections and transactions.
pub trait GenericClient: Send + Sync {
    /// Execute a statement and return the number of affected rows.
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64>;

    /// Execute a query and return a cursor over its rows.
    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor>>;
}

/// A database connection that can start transactions.
pub trait Connection: GenericClient {
    /// Begin a transaction.
    fn begin(&self) -> OrmResult<Box<dyn Transaction>>;
}

/// An open transaction.
///
/// Dropping a transaction without calling [`Transaction::commit`] or
/// [`Transaction::rollback`] is up to the adapter; the bundled adapters roll back.
pub trait Transaction: GenericClient {
    fn commit(self: Box<Self>) -> OrmResult<()>;

    fn rollback(self: Box<Self>) -> OrmResult<()>;
}

/// A forward-only cursor over a result set.
pub trait Cursor {
    /// Column names, in row order.
    fn columns(&self) -> &[String];

    /// Advance to the next row. `Ok(None)` once exhausted.
    fn next_row(&mut self) -> OrmResult<Option<Row>>;

    /// Release the cursor. Calling it more than once is allowed.
    fn close(&mut self) -> OrmResult<()>;
}

/// A cursor over rows that are already in memory.
///
/// Adapters that buffer their results (and test doubles) can hand this out directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryCursor {
    columns: Vec<String>,
    rows: VecDeque<Row>,
    closed: bool,
}

impl MemoryCursor {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows: rows.into(),
            closed: false,
        }
    }

    /// Whether [`Cursor::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Cursor for MemoryCursor {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> OrmResult<Option<Row>> {
        if self.closed {
            return Ok(None);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> OrmResult<()> {
        self.closed = true;
        self.rows.clear();
        Ok(())
    }
}
