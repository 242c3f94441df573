//! Transaction coordination for sessions.
//!
//! ```ignore
//! dao.session().tx(|s| {
//!     s.table("accounts").insert(&from)?;
//!     s.table("accounts").insert(&to)?;
//!     Ok(())
//! })?;
//! ```

use crate::error::{OrmError, OrmResult};
use crate::session::Session;

impl Session<'_> {
    /// Run `f` inside a transaction.
    ///
    /// While `f` runs every statement of this session goes through the
    /// transaction. It is committed when `f` returns `Ok` and rolled back when it
    /// returns `Err`; in the latter case the error from `f` is returned as is, and
    /// a failing rollback is only logged. Nesting is rejected.
    pub fn tx<T, F>(&mut self, f: F) -> OrmResult<T>
    where
        F: FnOnce(&mut Self) -> OrmResult<T>,
    {
        if self.tx.is_some() {
            self.reset_state();
            return Err(OrmError::config("nested transactions are not supported"));
        }

        let tx = match self.dao().connection().begin() {
            Ok(tx) => tx,
            Err(err) => {
                self.reset_state();
                return Err(err);
            }
        };
        tracing::debug!(target: "daorm.sql", tag = self.tag(), "transaction begin");
        self.tx = Some(tx);

        let result = f(self);
        self.reset_state();

        let Some(tx) = self.tx.take() else {
            return Err(OrmError::Other(
                "transaction was released while still in use".to_string(),
            ));
        };

        match result {
            Ok(value) => {
                tx.commit()?;
                tracing::debug!(target: "daorm.sql", tag = self.tag(), "transaction commit");
                Ok(value)
            }
            Err(err) => {
                match tx.rollback() {
                    Ok(()) => {
                        tracing::debug!(target: "daorm.sql", tag = self.tag(), "transaction rollback");
                    }
                    Err(rollback_err) => {
                        tracing::warn!(
                            target: "daorm.sql",
                            tag = self.tag(),
                            error = %rollback_err,
                            "transaction rollback failed"
                        );
                        self.dao()
                            .monitor()
                            .note(&format!("{}rollback failed: {rollback_err}", self.tag()));
                    }
                }
                Err(err)
            }
        }
    }
}
