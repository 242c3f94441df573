//! `rusqlite`-backed [`Connection`] adapter.
//!
//! One SQLite connection is shared behind a mutex. While a transaction is open,
//! statements from other sessions on the same adapter run inside it too, so give
//! each concurrent writer its own `SqliteConnection` (file databases) when that
//! matters.

use crate::client::{Connection, Cursor, GenericClient, MemoryCursor, Row, Transaction};
use crate::error::{OrmError, OrmResult};
use crate::value::{TIMESTAMP_FORMAT, Value};
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{ToSql, params_from_iter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use rusqlite::types::Value as Sql;

        Ok(match self {
            Value::Null => ToSqlOutput::Owned(Sql::Null),
            Value::Bool(b) => ToSqlOutput::Owned(Sql::Integer(i64::from(*b))),
            Value::Int(i) => ToSqlOutput::Owned(Sql::Integer(*i)),
            Value::UInt(u) => match i64::try_from(*u) {
                Ok(i) => ToSqlOutput::Owned(Sql::Integer(i)),
                Err(_) => ToSqlOutput::Owned(Sql::Text(u.to_string())),
            },
            Value::Float(f) => ToSqlOutput::Owned(Sql::Real(*f)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Bytes(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Timestamp(ts) => {
                ToSqlOutput::Owned(Sql::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
            }
            Value::Raw(_) | Value::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    format!("{} values cannot be bound", self.kind()).into(),
                ));
            }
        })
    }
}

fn value_from_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    }
}

type Shared = Arc<Mutex<rusqlite::Connection>>;

fn lock(conn: &Shared) -> OrmResult<MutexGuard<'_, rusqlite::Connection>> {
    conn.lock()
        .map_err(|_| OrmError::Connection("DB Lock failed".to_string()))
}

fn exec_on(conn: &Shared, sql: &str, args: &[Value]) -> OrmResult<u64> {
    let conn = lock(conn)?;
    let changed = conn.execute(sql, params_from_iter(args.iter()))?;
    Ok(changed as u64)
}

fn query_on(conn: &Shared, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor>> {
    let conn = lock(conn)?;
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    let mut rows = stmt.query(params_from_iter(args.iter()))?;
    let mut buffered: Vec<Row> = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(value_from_ref(row.get_ref(i)?));
        }
        buffered.push(values);
    }
    Ok(Box::new(MemoryCursor::new(columns, buffered)))
}

/// A SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteConnection {
    conn: Shared,
}

impl SqliteConnection {
    pub fn open(path: impl AsRef<Path>) -> OrmResult<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    pub fn open_in_memory() -> OrmResult<Self> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run a batch of `;`-separated statements, e.g. a schema.
    pub fn execute_batch(&self, sql: &str) -> OrmResult<()> {
        lock(&self.conn)?.execute_batch(sql)?;
        Ok(())
    }
}

impl GenericClient for SqliteConnection {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        exec_on(&self.conn, sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor>> {
        query_on(&self.conn, sql, args)
    }
}

impl Connection for SqliteConnection {
    fn begin(&self) -> OrmResult<Box<dyn Transaction>> {
        lock(&self.conn)?.execute_batch("BEGIN")?;
        Ok(Box::new(SqliteTransaction {
            conn: Arc::clone(&self.conn),
            finished: false,
        }))
    }
}

/// An open SQLite transaction. Rolled back on drop unless finished.
#[derive(Debug)]
pub struct SqliteTransaction {
    conn: Shared,
    finished: bool,
}

impl SqliteTransaction {
    fn finish(&mut self, sql: &str) -> OrmResult<()> {
        let conn = lock(&self.conn)?;
        conn.execute_batch(sql)?;
        self.finished = true;
        Ok(())
    }
}

impl GenericClient for SqliteTransaction {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        exec_on(&self.conn, sql, args)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor>> {
        query_on(&self.conn, sql, args)
    }
}

impl Transaction for SqliteTransaction {
    fn commit(mut self: Box<Self>) -> OrmResult<()> {
        let Err(err) = self.finish("COMMIT") else {
            return Ok(());
        };
        // A failed COMMIT (deferred constraints) leaves the transaction open.
        if let Err(rollback_err) = self.finish("ROLLBACK") {
            tracing::warn!(
                target: "daorm.sql",
                error = %rollback_err,
                "rollback after failed commit failed"
            );
        }
        Err(err)
    }

    fn rollback(mut self: Box<Self>) -> OrmResult<()> {
        self.finish("ROLLBACK")
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        tracing::warn!(target: "daorm.sql", "transaction dropped without commit or rollback, rolling back");
        if let Ok(conn) = self.conn.lock() {
            let _ = conn.execute_batch("ROLLBACK");
        }
    }
}
