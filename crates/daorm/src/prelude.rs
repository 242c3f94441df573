//! Convenient imports for typical `daorm` usage.
//!
//! ```ignore
//! use daorm::prelude::*;
//! ```

pub use crate::{
    Condition, Connection, Dao, DaoConfig, FromRow, GenericClient, OrmError, OrmResult, Record,
    Session, ToValue, Value, Writable, args,
};

#[cfg(feature = "sqlite")]
pub use crate::SqliteConnection;
