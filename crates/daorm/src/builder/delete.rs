use super::{SessionState, Statement};
use crate::condition::build_optional;
use crate::error::OrmResult;

impl SessionState {
    /// `DELETE FROM table [USE INDEX (...)] [WHERE ...] [clauses]`.
    pub fn delete_statement(&self) -> OrmResult<Statement> {
        let table = self.require_table("DELETE")?;

        let mut sql = format!("DELETE FROM {table}");
        self.render_indexes(&mut sql);
        let (where_sql, args) = build_optional(self.cond.as_ref());
        sql.push_str(&where_sql);
        self.render_clauses(&mut sql);
        Ok(Statement::new(sql, args))
    }
}
