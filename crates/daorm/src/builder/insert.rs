use super::{SessionState, Statement, quote_ident};
use crate::client::GenericClient;
use crate::error::{OrmError, OrmResult};
use crate::value::Value;
use crate::writable::{RecordValues, Writable};

/// Build `INSERT INTO table (...) VALUES (...)` for one record.
///
/// An `id` column holding a null or zero value is left out so the database can
/// assign it. A non-empty `update_cols` appends `ON DUPLICATE KEY UPDATE`.
pub fn insert_statement(
    table: &str,
    values: RecordValues,
    update_cols: &[String],
) -> OrmResult<Statement> {
    if table.is_empty() {
        return Err(OrmError::config("INSERT requires a table name"));
    }

    let mut cols = Vec::new();
    let mut exprs = Vec::new();
    let mut args = Vec::new();
    for bound in values.into_columns() {
        if bound.column == "id" && (bound.zero || bound.value.is_null()) {
            continue;
        }
        cols.push(quote_ident(&bound.column));
        match bound.value {
            Value::Raw(expr) => exprs.push(expr),
            value => {
                exprs.push("?".to_string());
                args.push(value);
            }
        }
    }
    if cols.is_empty() {
        return Err(OrmError::shape(format!(
            "INSERT into {table} has no columns"
        )));
    }

    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        cols.join(", "),
        exprs.join(", ")
    );
    if !update_cols.is_empty() {
        let sets: Vec<String> = update_cols
            .iter()
            .map(|c| {
                let c = quote_ident(c);
                format!("{c} = VALUES({c})")
            })
            .collect();
        sql.push_str(" ON DUPLICATE KEY UPDATE ");
        sql.push_str(&sets.join(", "));
    }
    Ok(Statement::new(sql, args))
}

/// Insert `records` one statement at a time through `client`.
///
/// Returns the summed affected-row count and stops at the first failure.
pub fn insert_records<W: Writable>(
    client: &dyn GenericClient,
    table: &str,
    update_cols: &[String],
    records: &[W],
) -> OrmResult<u64> {
    let mut affected = 0;
    for record in records {
        let stmt = insert_statement(table, record.record_values()?, update_cols)?;
        affected += client.exec(stmt.sql(), stmt.args())?;
    }
    Ok(affected)
}

impl SessionState {
    pub fn insert_statement(&self, values: RecordValues) -> OrmResult<Statement> {
        insert_statement(&self.table, values, &self.upsert)
    }
}
