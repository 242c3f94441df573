//! End-to-end session tests against an in-memory SQLite database.

#![cfg(feature = "sqlite")]

use chrono::NaiveDate;
use daorm::{Dao, OrmError, OrmResult, Record, SqliteConnection, Value, args};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    city: String,
    langs: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct User {
    id: i64,
    #[orm(column = "user_name")]
    name: String,
    age: i32,
    profile: Profile,
    created_at: chrono::NaiveDateTime,
    #[orm(skip)]
    scratch: String,
}

fn setup() -> Dao {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_name TEXT NOT NULL DEFAULT '',
            age INTEGER NOT NULL DEFAULT 0,
            profile TEXT,
            created_at TEXT
        );",
    )
    .unwrap();
    Dao::new(Arc::new(conn))
}

fn user(name: &str, age: i32) -> User {
    User {
        id: 0,
        name: name.to_string(),
        age,
        profile: Profile {
            city: "Oslo".into(),
            langs: vec!["rust".into()],
        },
        created_at: NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap(),
        scratch: "not stored".into(),
    }
}

#[test]
fn insert_then_get_round_trips_fields() {
    let dao = setup();
    let mut s = dao.session();
    s.table("users").insert(&user("ann", 30)).unwrap();

    let mut got = User::default();
    let found = s
        .table("users")
        .where_("user_name = ?", args!["ann"])
        .get(&mut got)
        .unwrap();
    assert!(found);
    assert_eq!(got.id, 1);
    assert_eq!(got.name, "ann");
    assert_eq!(got.profile.langs, vec!["rust".to_string()]);
    assert_eq!(got.created_at, user("ann", 30).created_at);
    assert_eq!(got.scratch, "");
}

#[test]
fn get_without_match_leaves_destination_alone() {
    let dao = setup();
    let mut got = User {
        name: "keep".into(),
        ..Default::default()
    };
    let found = dao
        .session()
        .table("users")
        .where_("id = ?", args![42])
        .get(&mut got)
        .unwrap();
    assert!(!found);
    assert_eq!(got.name, "keep");
}

#[test]
fn find_with_list_placeholder_and_ordering() {
    let dao = setup();
    let mut s = dao.session();
    for (name, age) in [("a", 10), ("b", 20), ("c", 30)] {
        s.table("users").insert(&user(name, age)).unwrap();
    }

    let mut users: Vec<User> = Vec::new();
    let n = s
        .table("users")
        .where_("id in (?)", args![vec![1, 3]])
        .order_by(["id DESC"])
        .find(&mut users)
        .unwrap();
    assert_eq!(n, 2);
    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, ["c", "a"]);

    let mut none: Vec<User> = Vec::new();
    let n = s
        .table("users")
        .where_("id in (?)", args![Vec::<i64>::new()])
        .find(&mut none)
        .unwrap();
    assert_eq!(n, 0);
    assert!(none.is_empty());
}

#[test]
fn count_and_delete() {
    let dao = setup();
    let mut s = dao.session();
    for (name, age) in [("a", 10), ("b", 20), ("c", 30)] {
        s.table("users").insert(&user(name, age)).unwrap();
    }
    assert_eq!(s.table("users").count().unwrap(), 3);
    assert_eq!(
        s.table("users").where_("age > ?", args![15]).count().unwrap(),
        2
    );

    let deleted = s
        .table("users")
        .where_("age < ?", args![25])
        .delete()
        .unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(s.table("users").count().unwrap(), 1);
}

#[test]
fn partial_update_keeps_other_columns() {
    let dao = setup();
    let mut s = dao.session();
    s.table("users").insert(&user("ann", 30)).unwrap();

    let patch = User {
        age: 31,
        ..Default::default()
    };
    let n = s
        .table("users")
        .where_("id = ?", args![1])
        .update(&patch)
        .unwrap();
    assert_eq!(n, 1);

    let mut got = User::default();
    s.table("users").get(&mut got).unwrap();
    assert_eq!(got.age, 31);
    assert_eq!(got.name, "ann");
}

#[test]
fn map_update_with_raw_expression() {
    let dao = setup();
    let mut s = dao.session();
    s.table("users").insert(&user("ann", 30)).unwrap();

    let mut patch: HashMap<String, Value> = HashMap::new();
    patch.insert("age".to_string(), Value::raw("age + 5"));
    s.table("users")
        .where_("id = ?", args![1])
        .update(&patch)
        .unwrap();

    let mut row: HashMap<String, Value> = HashMap::new();
    s.table("users").cols(["age"]).get(&mut row).unwrap();
    assert_eq!(row["age"], Value::Int(35));
}

#[test]
fn string_map_reads_null_as_empty() {
    let dao = setup();
    let mut s = dao.session();
    s.exec("INSERT INTO users (user_name) VALUES (?)", args!["bob"])
        .unwrap();

    let mut row: HashMap<String, String> = HashMap::new();
    s.table("users")
        .cols(["user_name", "profile"])
        .get(&mut row)
        .unwrap();
    assert_eq!(row["user_name"], "bob");
    assert_eq!(row["profile"], "");
}

#[test]
fn null_json_column_leaves_field_unchanged() {
    let dao = setup();
    let mut s = dao.session();
    s.exec("INSERT INTO users (user_name) VALUES (?)", args!["bob"])
        .unwrap();

    let mut got = User::default();
    s.table("users")
        .cols(["id", "user_name", "profile"])
        .get(&mut got)
        .unwrap();
    assert_eq!(got.profile, Profile::default());
}

#[test]
fn malformed_json_column_is_a_decode_error() {
    let dao = setup();
    let mut s = dao.session();
    s.exec(
        "INSERT INTO users (user_name, profile) VALUES (?, ?)",
        args!["bob", "{not json"],
    )
    .unwrap();

    let mut got = User::default();
    let err = s.table("users").get(&mut got).unwrap_err();
    assert!(matches!(err, OrmError::Decode { ref column, .. } if column == "profile"));
}

#[test]
fn rolled_back_transaction_is_invisible() {
    let dao = setup();
    let mut s = dao.session();
    let err = s
        .tx(|s| -> OrmResult<()> {
            s.table("users").insert(&user("ghost", 1))?;
            assert_eq!(s.table("users").count()?, 1);
            Err(OrmError::validation("abort"))
        })
        .unwrap_err();
    assert!(matches!(err, OrmError::Validation(_)));
    assert_eq!(s.table("users").count().unwrap(), 0);
}

#[test]
fn committed_transaction_persists() {
    let dao = setup();
    let mut s = dao.session();
    let inserted = s
        .tx(|s| s.table("users").insert_many(&[user("a", 1), user("b", 2)]))
        .unwrap();
    assert_eq!(inserted, 2);
    assert_eq!(dao.session().table("users").count().unwrap(), 2);
}

#[test]
fn raw_query_override_with_scalar_rows() {
    let dao = setup();
    let mut s = dao.session();
    for (name, age) in [("a", 10), ("b", 20)] {
        s.table("users").insert(&user(name, age)).unwrap();
    }

    let mut rows: Vec<HashMap<String, Value>> = Vec::new();
    s.query(
        "SELECT user_name, age FROM users WHERE age >= ? ORDER BY age",
        args![10],
    )
    .find(&mut rows)
    .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["user_name"], Value::Text("b".into()));
}

#[test]
fn commit_failure_is_returned_and_next_transaction_starts() {
    let conn = SqliteConnection::open_in_memory().unwrap();
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE parents (id INTEGER PRIMARY KEY);
         CREATE TABLE children (
            pid INTEGER REFERENCES parents(id) DEFERRABLE INITIALLY DEFERRED
         );",
    )
    .unwrap();
    let dao = Dao::new(Arc::new(conn));
    let mut s = dao.session();

    let err = s
        .tx(|s| s.exec("INSERT INTO children (pid) VALUES (?)", args![5]))
        .unwrap_err();
    assert!(err.is_driver());

    s.tx(|s| s.exec("INSERT INTO parents (id) VALUES (?)", args![5]))
        .unwrap();
    assert_eq!(s.table("children").count().unwrap(), 0);
    assert_eq!(s.table("parents").count().unwrap(), 1);
}

#[test]
fn typed_map_destination_reads_aggregates() {
    let dao = setup();
    let mut s = dao.session();
    for (name, age) in [("a", 10), ("b", 20)] {
        s.table("users").insert(&user(name, age)).unwrap();
    }

    let mut row: HashMap<String, i64> = HashMap::new();
    s.query("SELECT count(1) AS cnt, sum(age) AS total FROM users", args![])
        .get(&mut row)
        .unwrap();
    assert_eq!(row["cnt"], 2);
    assert_eq!(row["total"], 30);
}
