//! Session behavior against a connection that records every statement.

use daorm::{
    Connection, Cursor, Dao, DaoConfig, GenericClient, MemoryCursor, OrmError, OrmResult, Record,
    Row, Transaction, Value, args,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
struct Call {
    sql: String,
    args: Vec<Value>,
    in_tx: bool,
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<Call>>,
    events: Mutex<Vec<&'static str>>,
    results: Mutex<VecDeque<(Vec<String>, Vec<Row>)>>,
    fail_on: Mutex<Option<String>>,
    fail_rollback: bool,
    fail_begin: bool,
}

impl Recorder {
    fn record(&self, sql: &str, args: &[Value], in_tx: bool) -> OrmResult<()> {
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            args: args.to_vec(),
            in_tx,
        });
        match self.fail_on.lock().unwrap().as_deref() {
            Some(needle) if sql.contains(needle) => {
                Err(OrmError::driver(std::io::Error::other("boom")))
            }
            _ => Ok(()),
        }
    }

    fn next_cursor(&self) -> Box<dyn Cursor> {
        let (columns, rows) = self.results.lock().unwrap().pop_front().unwrap_or_default();
        Box::new(MemoryCursor::new(columns, rows))
    }

    fn script(&self, columns: &[&str], rows: Vec<Row>) {
        self.results
            .lock()
            .unwrap()
            .push_back((columns.iter().map(|c| c.to_string()).collect(), rows));
    }

    fn sqls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|c| c.sql.clone()).collect()
    }

    fn last(&self) -> Call {
        self.calls.lock().unwrap().last().cloned().unwrap()
    }
}

#[derive(Clone, Default)]
struct MockConn(Arc<Recorder>);

impl GenericClient for MockConn {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        self.0.record(sql, args, false)?;
        Ok(1)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor>> {
        self.0.record(sql, args, false)?;
        Ok(self.0.next_cursor())
    }
}

impl Connection for MockConn {
    fn begin(&self) -> OrmResult<Box<dyn Transaction>> {
        if self.0.fail_begin {
            return Err(OrmError::Connection("too many connections".to_string()));
        }
        self.0.events.lock().unwrap().push("begin");
        Ok(Box::new(MockTx(Arc::clone(&self.0))))
    }
}

struct MockTx(Arc<Recorder>);

impl GenericClient for MockTx {
    fn exec(&self, sql: &str, args: &[Value]) -> OrmResult<u64> {
        self.0.record(sql, args, true)?;
        Ok(1)
    }

    fn query(&self, sql: &str, args: &[Value]) -> OrmResult<Box<dyn Cursor>> {
        self.0.record(sql, args, true)?;
        Ok(self.0.next_cursor())
    }
}

impl Transaction for MockTx {
    fn commit(self: Box<Self>) -> OrmResult<()> {
        self.0.events.lock().unwrap().push("commit");
        Ok(())
    }

    fn rollback(self: Box<Self>) -> OrmResult<()> {
        self.0.events.lock().unwrap().push("rollback");
        if self.0.fail_rollback {
            return Err(OrmError::Connection("connection reset".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct User {
    id: i64,
    name: String,
    age: i32,
    tags: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Audit {
    created_by: String,
    #[orm(column = "rev")]
    revision: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Document {
    id: i64,
    title: String,
    #[orm(flatten)]
    audit: Audit,
    #[orm(skip)]
    cached: Option<String>,
}

fn setup() -> (Arc<Recorder>, Dao) {
    let conn = MockConn::default();
    let recorder = Arc::clone(&conn.0);
    (recorder, Dao::new(Arc::new(conn)))
}

#[test]
fn find_builds_select_and_maps_rows() {
    let (rec, dao) = setup();
    rec.script(
        &["id", "name", "age", "tags", "unknown"],
        vec![
            vec![
                Value::Int(1),
                Value::Text("ann".into()),
                Value::Int(30),
                Value::Text(r#"["a"]"#.into()),
                Value::Int(0),
            ],
            vec![
                Value::Int(2),
                Value::Text("bob".into()),
                Value::Int(40),
                Value::Null,
                Value::Int(0),
            ],
        ],
    );

    let mut users: Vec<User> = Vec::new();
    let n = dao
        .session()
        .table("users")
        .use_index(["idx_age"])
        .where_("age > ?", args![18])
        .and("id in (?)", args![vec![1, 2]])
        .order_by(["id DESC"])
        .limit(10)
        .find(&mut users)
        .unwrap();

    assert_eq!(n, 2);
    assert_eq!(
        rec.last(),
        Call {
            sql: "SELECT * FROM users USE INDEX (idx_age) WHERE age > ? AND (id in (?,?)) \
                  ORDER BY id DESC LIMIT 10"
                .to_string(),
            args: args![18, 1, 2],
            in_tx: false,
        }
    );
    assert_eq!(users[0].tags, vec!["a".to_string()]);
    assert_eq!(users[1].name, "bob");
    assert!(users[1].tags.is_empty());
}

#[test]
fn name_and_id_list_example() {
    let (rec, dao) = setup();
    let mut users: Vec<User> = Vec::new();
    dao.session()
        .table("users")
        .where_("name = ? and id in (?)", args!["x", vec![1, 2, 3]])
        .find(&mut users)
        .unwrap();
    let call = rec.last();
    assert_eq!(call.sql, "SELECT * FROM users WHERE name = ? and id in (?,?,?)");
    assert_eq!(call.args, args!["x", 1, 2, 3]);
    assert!(users.is_empty());
}

#[test]
fn get_limits_to_one_row_and_reports_no_rows() {
    let (rec, dao) = setup();
    let mut user = User {
        name: "untouched".into(),
        ..Default::default()
    };
    let found = dao
        .session()
        .table("users")
        .cols(["id", "name"])
        .where_("id = ?", args![99])
        .get(&mut user)
        .unwrap();
    assert!(!found);
    assert_eq!(user.name, "untouched");
    assert_eq!(rec.last().sql, "SELECT id, name FROM users WHERE id = ? LIMIT 1");
}

#[test]
fn get_into_string_map() {
    let (rec, dao) = setup();
    rec.script(&["name", "nick"], vec![vec![Value::Text("ann".into()), Value::Null]]);
    let mut row: HashMap<String, String> = HashMap::new();
    assert!(dao.session().table("users").get(&mut row).unwrap());
    assert_eq!(row["name"], "ann");
    assert_eq!(row["nick"], "");
}

#[test]
fn count_reads_cnt_column() {
    let (rec, dao) = setup();
    rec.script(&["cnt"], vec![vec![Value::Int(7)]]);
    let n = dao
        .session()
        .table("users")
        .where_("age > ?", args![1])
        .count()
        .unwrap();
    assert_eq!(n, 7);
    assert_eq!(rec.last().sql, "SELECT count(1) AS cnt FROM users WHERE age > ?");
}

#[test]
fn insert_omits_zero_id_and_encodes_json() {
    let (rec, dao) = setup();
    let user = User {
        id: 0,
        name: "ann".into(),
        age: 30,
        tags: vec!["x".into()],
    };
    assert_eq!(dao.session().table("users").insert(&user).unwrap(), 1);
    let call = rec.last();
    assert_eq!(call.sql, "INSERT INTO users (`name`, `age`, `tags`) VALUES (?, ?, ?)");
    assert_eq!(call.args, args!["ann", 30, r#"["x"]"#]);
}

#[test]
fn insert_with_upsert_columns() {
    let (rec, dao) = setup();
    let user = User {
        id: 5,
        name: "ann".into(),
        age: 30,
        tags: vec![],
    };
    dao.session()
        .table("users")
        .on_duplicate_update(["name", "age"])
        .insert(&user)
        .unwrap();
    assert_eq!(
        rec.last().sql,
        "INSERT INTO users (`id`, `name`, `age`, `tags`) VALUES (?, ?, ?, ?) \
         ON DUPLICATE KEY UPDATE `name` = VALUES(`name`), `age` = VALUES(`age`)"
    );
}

#[test]
fn insert_flattened_record() {
    let (rec, dao) = setup();
    let doc = Document {
        id: 0,
        title: "t".into(),
        audit: Audit {
            created_by: "ann".into(),
            revision: 3,
        },
        cached: Some("ignored".into()),
    };
    dao.session().table("docs").insert(&doc).unwrap();
    let call = rec.last();
    assert_eq!(call.sql, "INSERT INTO docs (`title`, `created_by`, `rev`) VALUES (?, ?, ?)");
    assert_eq!(call.args, args!["t", "ann", 3]);
}

#[test]
fn get_populates_flattened_fields() {
    let (rec, dao) = setup();
    rec.script(
        &["id", "title", "created_by", "rev", "cached"],
        vec![vec![
            Value::Int(1),
            Value::Text("t".into()),
            Value::Text("bob".into()),
            Value::Int(9),
            Value::Text("ignored".into()),
        ]],
    );
    let mut doc = Document::default();
    assert!(dao.session().table("docs").get(&mut doc).unwrap());
    assert_eq!(doc.audit.created_by, "bob");
    assert_eq!(doc.audit.revision, 9);
    assert_eq!(doc.cached, None);
}

#[test]
fn insert_map_with_raw_expression() {
    let (rec, dao) = setup();
    let mut row = BTreeMap::new();
    row.insert("name".to_string(), Value::Text("ann".into()));
    row.insert("created_at".to_string(), Value::raw("NOW()"));
    dao.session().table("users").insert(&row).unwrap();
    let call = rec.last();
    assert_eq!(call.sql, "INSERT INTO users (`created_at`, `name`) VALUES (NOW(), ?)");
    assert_eq!(call.args, args!["ann"]);
}

#[test]
fn insert_many_sums_and_stops_at_first_failure() {
    let (rec, dao) = setup();
    let users = vec![
        User {
            name: "a".into(),
            ..Default::default()
        },
        User {
            name: "b".into(),
            ..Default::default()
        },
    ];
    assert_eq!(dao.session().table("users").insert_many(&users).unwrap(), 2);

    *rec.fail_on.lock().unwrap() = Some("INSERT".to_string());
    let before = rec.sqls().len();
    let err = dao.session().table("users").insert_many(&users).unwrap_err();
    assert!(err.is_driver());
    assert_eq!(rec.sqls().len(), before + 1);
}

#[test]
fn update_skips_zero_fields() {
    let (rec, dao) = setup();
    let patch = User {
        age: 31,
        ..Default::default()
    };
    dao.session()
        .table("users")
        .where_("id = ?", args![1])
        .update(&patch)
        .unwrap();
    let call = rec.last();
    assert_eq!(call.sql, "UPDATE users SET `age` = ? WHERE id = ?");
    assert_eq!(call.args, args![31, 1]);
}

#[test]
fn update_with_explicit_cols() {
    let (rec, dao) = setup();
    let patch = User::default();
    dao.session()
        .table("users")
        .cols(["name", "age"])
        .where_("id = ?", args![1])
        .update(&patch)
        .unwrap();
    let call = rec.last();
    assert_eq!(call.sql, "UPDATE users SET `name` = ?, `age` = ? WHERE id = ?");
    assert_eq!(call.args, args!["", 0, 1]);
}

#[test]
fn update_map_inlines_raw_values() {
    let (rec, dao) = setup();
    let mut row: HashMap<String, Value> = HashMap::new();
    row.insert("hits".to_string(), Value::raw("hits + 1"));
    dao.session()
        .table("pages")
        .where_("id = ?", args![3])
        .update(&row)
        .unwrap();
    assert_eq!(rec.last().sql, "UPDATE pages SET `hits` = hits + 1 WHERE id = ?");
}

#[test]
fn update_with_nothing_to_set_is_config_error() {
    let (rec, dao) = setup();
    let err = dao
        .session()
        .table("users")
        .update(&User::default())
        .unwrap_err();
    assert!(err.is_config());
    assert!(rec.sqls().is_empty());
}

#[test]
fn delete_requires_table_and_session_resets_after_failure() {
    let (rec, dao) = setup();
    let mut s = dao.session();
    let err = s.where_("id = ?", args![1]).delete().unwrap_err();
    assert!(err.is_config());

    // nothing from the failed call leaks into the next statement
    s.table("users").delete().unwrap();
    assert_eq!(rec.last().sql, "DELETE FROM users");
}

#[test]
fn deferred_placeholder_error_surfaces_at_terminal_operation() {
    let (rec, dao) = setup();
    let mut s = dao.session();
    let err = s
        .table("users")
        .where_("a = ? and b = ?", args![1])
        .delete()
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert!(rec.sqls().is_empty());

    s.table("users").where_("a = ?", args![1]).delete().unwrap();
    assert_eq!(rec.last().sql, "DELETE FROM users WHERE a = ?");
}

#[test]
fn raw_query_and_exec() {
    let (rec, dao) = setup();
    rec.script(&["id"], vec![vec![Value::Int(4)]]);
    let mut ids: Vec<BTreeMap<String, Value>> = Vec::new();
    let mut s = dao.session();
    s.query("SELECT id FROM users WHERE id in (?)", args![vec![4, 5]])
        .find(&mut ids)
        .unwrap();
    assert_eq!(rec.last().sql, "SELECT id FROM users WHERE id in (?,?)");
    assert_eq!(ids[0]["id"], Value::Int(4));

    s.exec("UPDATE users SET age = age + 1 WHERE id in (?)", args![vec![4]])
        .unwrap();
    assert_eq!(rec.last().sql, "UPDATE users SET age = age + 1 WHERE id in (?)");
}

#[test]
fn logger_receives_tagged_lines() {
    let conn = MockConn::default();
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&lines);
    let mut dao = Dao::with_config(Arc::new(conn), DaoConfig::new().no_truncate());
    dao.set_logger(move |line| captured.lock().unwrap().push(line.to_string()));

    dao.session_tagged("[req-1] ")
        .table("users")
        .where_("id = ?", args![1])
        .delete()
        .unwrap();
    assert_eq!(
        lines.lock().unwrap().as_slice(),
        ["[req-1] DELETE FROM users WHERE id = ? [1]".to_string()]
    );
}

#[test]
fn tx_commits_and_routes_through_transaction() {
    let (rec, dao) = setup();
    let mut s = dao.session();
    let out = s
        .tx(|s| {
            assert!(s.in_transaction());
            s.table("users").insert(&User {
                name: "a".into(),
                ..Default::default()
            })?;
            s.table("users").where_("id = ?", args![1]).delete()
        })
        .unwrap();
    assert_eq!(out, 1);
    assert!(!s.in_transaction());
    assert_eq!(*rec.events.lock().unwrap(), vec!["begin", "commit"]);
    assert!(rec.calls.lock().unwrap().iter().all(|c| c.in_tx));

    s.table("users").delete().unwrap();
    assert!(!rec.last().in_tx);
}

#[test]
fn tx_rolls_back_and_returns_callback_error() {
    let (rec, dao) = setup();
    let err = dao
        .session()
        .tx(|s| -> OrmResult<()> {
            s.table("users").delete()?;
            Err(OrmError::validation("stop"))
        })
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(ref m) if m == "stop"));
    assert_eq!(*rec.events.lock().unwrap(), vec!["begin", "rollback"]);
}

#[test]
fn tx_rollback_failure_is_logged_not_returned() {
    let conn = MockConn(Arc::new(Recorder {
        fail_rollback: true,
        ..Default::default()
    }));
    let lines = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&lines);
    let mut dao = Dao::new(Arc::new(conn));
    dao.set_logger(move |line| captured.lock().unwrap().push(line.to_string()));

    let err = dao
        .session()
        .tx(|_| -> OrmResult<()> { Err(OrmError::validation("stop")) })
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert!(
        lines
            .lock()
            .unwrap()
            .iter()
            .any(|l| l.contains("rollback failed"))
    );
}

#[test]
fn failed_begin_clears_chained_configuration() {
    let conn = MockConn(Arc::new(Recorder {
        fail_begin: true,
        ..Default::default()
    }));
    let rec = Arc::clone(&conn.0);
    let dao = Dao::new(Arc::new(conn));
    let mut s = dao.session();

    s.table("stale").where_("x = ?", args![1]).order_by(["x"]);
    let err = s.tx(|s| s.delete()).unwrap_err();
    assert!(matches!(err, OrmError::Connection(_)));
    assert!(rec.events.lock().unwrap().is_empty());

    s.table("users").delete().unwrap();
    let call = rec.last();
    assert_eq!(call.sql, "DELETE FROM users");
    assert!(call.args.is_empty());
}

#[test]
fn nested_tx_is_rejected() {
    let (rec, dao) = setup();
    let err = dao.session().tx(|s| s.tx(|_| Ok(()))).unwrap_err();
    assert!(err.is_config());
    assert_eq!(*rec.events.lock().unwrap(), vec!["begin", "rollback"]);
}

#[test]
fn dropped_sessions_return_to_the_pool() {
    let (_rec, dao) = setup();
    assert_eq!(dao.idle_sessions(), 0);
    {
        let _a = dao.session();
        let _b = dao.session();
    }
    assert_eq!(dao.idle_sessions(), 2);
    let _c = dao.session();
    assert_eq!(dao.idle_sessions(), 1);
}
