//! Statement logging.
//!
//! Every statement a session runs goes through [`SqlMonitor::observe`], which
//! feeds the optional logger sink and emits a `tracing` event on target
//! `daorm.sql` once the statement finishes.

use crate::config::DaoConfig;
use crate::error::OrmResult;
use crate::value::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller-supplied log line consumer.
pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// The type of SQL operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    /// Anything else (DDL, transaction control, ...)
    Other,
}

impl QueryType {
    /// Detect query type from SQL string.
    pub fn from_sql(sql: &str) -> Self {
        fn strip_sql_prefix(sql: &str) -> &str {
            let mut s = sql;
            loop {
                let before = s;
                s = s.trim_start();
                if s.starts_with("--") {
                    match s.find('\n') {
                        Some(pos) => {
                            s = &s[pos + 1..];
                            continue;
                        }
                        None => return "",
                    }
                }
                if s.starts_with("/*") {
                    match s.find("*/") {
                        Some(pos) => {
                            s = &s[pos + 2..];
                            continue;
                        }
                        None => return "",
                    }
                }
                if let Some(rest) = s.strip_prefix('(') {
                    s = rest;
                    continue;
                }
                if s == before {
                    return s;
                }
            }
        }

        fn starts_with_keyword(s: &str, keyword: &str) -> bool {
            s.get(0..keyword.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(keyword))
        }

        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") || starts_with_keyword(trimmed, "WITH") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") || starts_with_keyword(trimmed, "REPLACE")
        {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Other
        }
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Line handed to the logger sink: tag, SQL, then the bound arguments.
pub fn format_log_line(tag: &str, sql: &str, args: &[Value]) -> String {
    let args = args.iter().map(ToString::to_string).collect::<Vec<_>>();
    format!("{tag}{sql} [{}]", args.join(", "))
}

/// Logging shared by every session of a [`crate::Dao`].
#[derive(Clone)]
pub(crate) struct SqlMonitor {
    config: DaoConfig,
    sink: Option<LogSink>,
}

impl SqlMonitor {
    pub fn new(config: DaoConfig) -> Self {
        Self { config, sink: None }
    }

    pub fn config(&self) -> &DaoConfig {
        &self.config
    }

    pub fn set_sink(&mut self, sink: LogSink) {
        self.sink = Some(sink);
    }

    fn truncate_sql(&self, sql: &str) -> String {
        match self.config.max_sql_log_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)),
            _ => sql.to_string(),
        }
    }

    /// Hand a free-form line to the logger sink.
    pub fn note(&self, line: &str) {
        if let Some(sink) = &self.sink {
            sink(line);
        }
    }

    /// Run one statement, logging it before and after.
    pub fn observe<T>(
        &self,
        tag: &str,
        sql: &str,
        args: &[Value],
        run: impl FnOnce() -> OrmResult<T>,
    ) -> OrmResult<T> {
        if let Some(sink) = &self.sink {
            sink(&format_log_line(tag, sql, args));
        }

        let start = Instant::now();
        let result = run();
        self.emit(tag, sql, args, start.elapsed(), result.is_ok());
        result
    }

    fn emit(&self, tag: &str, sql: &str, args: &[Value], elapsed: Duration, ok: bool) {
        let query_type = QueryType::from_sql(sql);
        let sql = self.truncate_sql(sql);
        let tag = if tag.is_empty() { "-" } else { tag };
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let param_count = args.len();
        let args = self
            .config
            .log_args
            .then(|| tracing::field::debug(args));

        let slow = self
            .config
            .slow_query_threshold
            .is_some_and(|threshold| elapsed > threshold);
        if slow {
            tracing::warn!(
                target: "daorm.sql",
                query_type = ?query_type,
                tag,
                param_count,
                sql = %sql,
                args,
                elapsed_ms,
                "slow query"
            );
        } else {
            tracing::debug!(
                target: "daorm.sql",
                query_type = ?query_type,
                tag,
                param_count,
                sql = %sql,
                args,
                elapsed_ms,
                ok,
            );
        }
    }
}
