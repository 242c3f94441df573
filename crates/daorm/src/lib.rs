//! # daorm
//!
//! A lightweight query builder and row mapper for MySQL-flavored SQL.
//!
//! ## Features
//!
//! - **Fluent sessions**: chain `table`/`where_`/`order_by`/`limit`, finish with
//!   `get`, `find`, `count`, `insert`, `update` or `delete`
//! - **List placeholders**: `id in (?)` bound to a list expands to `id in (?,?,?)`
//! - **Derived mapping**: `#[derive(Record)]` maps struct fields to columns, with
//!   JSON fallback for nested values and flattening of embedded records
//! - **Transactions**: `session.tx(|s| ...)` commits on `Ok`, rolls back on `Err`
//! - **Driver agnostic**: anything implementing [`Connection`] works; a `rusqlite`
//!   adapter ships behind the `sqlite` feature
//!
//! ```ignore
//! use daorm::prelude::*;
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default, Record)]
//! struct User {
//!     id: i64,
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let dao = Dao::new(Arc::new(SqliteConnection::open_in_memory()?));
//! let mut s = dao.session();
//!
//! s.table("users").insert(&User { id: 0, name: "ann".into(), tags: vec![] })?;
//!
//! let mut users: Vec<User> = Vec::new();
//! s.table("users")
//!     .where_("id in (?)", args![vec![1, 2, 3]])
//!     .order_by(["id DESC"])
//!     .find(&mut users)?;
//! ```

// Lets the derive macro refer to `::daorm` from inside this crate's own tests.
extern crate self as daorm;

pub mod builder;
pub mod client;
pub mod condition;
pub mod config;
pub mod dao;
pub mod error;
pub mod monitor;
pub mod placeholder;
mod pool;
pub mod prelude;
pub mod record;
pub mod resolver;
pub mod row;
pub mod session;
pub mod transaction;
pub mod value;
pub mod writable;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use builder::{Clause, ClauseKind, Statement, insert_records, insert_statement};
pub use client::{Connection, Cursor, GenericClient, MemoryCursor, Row, Transaction};
pub use condition::Condition;
pub use config::DaoConfig;
pub use dao::Dao;
pub use error::{OrmError, OrmResult};
pub use monitor::{LogSink, QueryType};
pub use placeholder::expand;
pub use record::{FieldDecl, FieldKind, FieldMut, FieldRef, JsonField, Record, ScalarField};
pub use resolver::{FieldDescriptor, FieldSet, resolve, to_column_name};
pub use row::{FromRow, MapValue};
pub use session::Session;
pub use value::{FromValue, ToValue, Value};
pub use writable::{RecordValues, Writable};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteConnection, SqliteTransaction};

#[cfg(feature = "derive")]
pub use daorm_derive::Record;
