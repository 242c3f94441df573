use super::{SessionState, Statement, quote_ident};
use crate::condition::build_optional;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use crate::writable::{BoundColumn, RecordValues};

impl SessionState {
    /// `UPDATE table SET ... [WHERE ...] [clauses]`.
    ///
    /// Which columns end up in the SET list:
    /// - derived records with `cols` configured: exactly those columns;
    /// - derived records otherwise: every column whose field is not zero;
    /// - maps: every key.
    pub fn update_statement(&self, values: RecordValues) -> OrmResult<Statement> {
        let table = self.require_table("UPDATE")?;

        let selected: Vec<BoundColumn> = match values {
            RecordValues::Mapped(cols) => cols,
            RecordValues::Fielded(cols) if !self.cols.is_empty() => {
                let mut picked = Vec::with_capacity(self.cols.len());
                for name in &self.cols {
                    let bound = cols.iter().find(|b| &b.column == name).ok_or_else(|| {
                        OrmError::shape(format!("record has no column {name}"))
                    })?;
                    picked.push(bound.clone());
                }
                picked
            }
            RecordValues::Fielded(cols) => cols.into_iter().filter(|b| !b.zero).collect(),
        };
        if selected.is_empty() {
            return Err(OrmError::config(format!(
                "UPDATE {table} has no columns to set"
            )));
        }

        let mut sets = Vec::with_capacity(selected.len());
        let mut args = Vec::new();
        for bound in selected {
            let col = quote_ident(&bound.column);
            match bound.value {
                Value::Raw(expr) => sets.push(format!("{col} = {expr}")),
                value => {
                    sets.push(format!("{col} = ?"));
                    args.push(value);
                }
            }
        }

        let mut sql = format!("UPDATE {table} SET {}", sets.join(", "));
        let (where_sql, where_args) = build_optional(self.cond.as_ref());
        sql.push_str(&where_sql);
        args.extend(where_args);
        self.render_clauses(&mut sql);
        Ok(Statement::new(sql, args))
    }
}
