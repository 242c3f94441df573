use super::{SessionState, Statement};
use crate::condition::build_optional;
use crate::error::OrmResult;

impl SessionState {
    /// `SELECT cols FROM table [USE INDEX (...)] [WHERE ...] [clauses]`, or the raw
    /// override when one is set.
    pub fn select_statement(&self) -> OrmResult<Statement> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let table = self.require_table("SELECT")?;

        let mut sql = String::from("SELECT ");
        if self.cols.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.cols.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(table);
        self.render_indexes(&mut sql);

        let (where_sql, args) = build_optional(self.cond.as_ref());
        sql.push_str(&where_sql);
        self.render_clauses(&mut sql);
        Ok(Statement::new(sql, args))
    }

    /// The statement `count` runs: the configured query with its column list
    /// replaced by `count(1) AS cnt`.
    pub fn count_statement(&mut self) -> OrmResult<Statement> {
        self.cols.clear();
        self.cols.push("count(1) AS cnt".to_string());
        self.select_statement()
    }
}
