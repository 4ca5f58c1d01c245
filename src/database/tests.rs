//! Store tests

use super::*;
use crate::sanitize::{sanitize_identifier, Ident};
use pretty_assertions::assert_eq;

fn idents(names: &[&str]) -> Vec<Ident> {
    names.iter().map(|n| sanitize_identifier(n)).collect()
}

#[test]
fn test_create_table_sql() {
    let table = sanitize_identifier("All Indices");
    let columns = idents(&["key", "indexSymbol", "last"]);
    let keys = idents(&["key", "indexSymbol"]);

    let sql = CreateTable {
        table: &table,
        columns: &columns,
        keys: &keys,
        identity: true,
        created_at: true,
    }
    .to_sql();

    assert_eq!(
        sql,
        "CREATE TABLE IF NOT EXISTS \"all_indices\" (\
         \"id\" BIGINT DEFAULT nextval('all_indices_id_seq'), \
         \"col_key\" VARCHAR, \"indexsymbol\" VARCHAR, \"last\" VARCHAR, \
         \"created_at\" TIMESTAMP, \
         UNIQUE (\"col_key\", \"indexsymbol\"))"
    );
}

#[test]
fn test_create_and_introspect() {
    let engine = DatabaseEngine::in_memory("test").unwrap();
    let conn = engine.connect().unwrap();
    let table = sanitize_identifier("quotes");
    let columns = idents(&["symbol", "ltp"]);
    let keys = idents(&["symbol"]);

    assert!(!table_exists(&conn, &table).unwrap());

    create_table(
        &conn,
        &CreateTable {
            table: &table,
            columns: &columns,
            keys: &keys,
            identity: true,
            created_at: false,
        },
    )
    .unwrap();

    assert!(table_exists(&conn, &table).unwrap());
    assert_eq!(
        table_columns(&conn, "quotes").unwrap(),
        vec!["id".to_string(), "symbol".to_string(), "ltp".to_string()]
    );
    assert_eq!(
        unique_constraints(&conn, "quotes").unwrap(),
        vec![vec!["symbol".to_string()]]
    );
    assert_eq!(list_tables(&conn).unwrap(), vec!["quotes".to_string()]);
}

#[test]
fn test_identity_column_increments() {
    let engine = DatabaseEngine::in_memory("test").unwrap();
    let conn = engine.connect().unwrap();
    let table = sanitize_identifier("news");
    let columns = idents(&["title"]);

    create_table(
        &conn,
        &CreateTable {
            table: &table,
            columns: &columns,
            keys: &[],
            identity: true,
            created_at: false,
        },
    )
    .unwrap();

    conn.execute_batch("INSERT INTO news (title) VALUES ('a'); INSERT INTO news (title) VALUES ('b');")
        .unwrap();

    let max_id: i64 = conn
        .query_row("SELECT MAX(id) FROM news", [], |row| row.get(0))
        .unwrap();
    assert_eq!(max_id, 2);
}

#[test]
fn test_add_column_is_idempotent() {
    let engine = DatabaseEngine::in_memory("test").unwrap();
    let conn = engine.connect().unwrap();
    let table = sanitize_identifier("t");
    let column = sanitize_identifier("extra");

    conn.execute_batch("CREATE TABLE t (a VARCHAR)").unwrap();
    add_column(&conn, &table, &column).unwrap();
    add_column(&conn, &table, &column).unwrap();

    assert_eq!(
        table_columns(&conn, "t").unwrap(),
        vec!["a".to_string(), "extra".to_string()]
    );
}

#[test]
fn test_duplicate_column_error_is_benign() {
    let engine = DatabaseEngine::in_memory("test").unwrap();
    let conn = engine.connect().unwrap();
    conn.execute_batch("CREATE TABLE t (a VARCHAR)").unwrap();

    let err = conn
        .execute_batch("ALTER TABLE t ADD COLUMN a VARCHAR")
        .unwrap_err();
    assert!(is_benign_ddl_conflict(&err));

    let err = conn.execute_batch("SELECT * FROM missing").unwrap_err();
    assert!(!is_benign_ddl_conflict(&err));
}

#[test]
fn test_describe_and_preview() {
    let engine = DatabaseEngine::in_memory("test").unwrap();
    let conn = engine.connect().unwrap();
    conn.execute_batch("CREATE TABLE t (a VARCHAR, b VARCHAR); INSERT INTO t VALUES ('1', NULL)")
        .unwrap();

    let info = engine.describe_table("t").unwrap().unwrap();
    assert_eq!(info.columns, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(info.row_count, 1);
    assert!(info.unique_keys.is_empty());
    assert!(engine.describe_table("nope").unwrap().is_none());

    let rows = engine.preview("t", 10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["a"], serde_json::json!("1"));
    assert_eq!(rows[0]["b"], serde_json::Value::Null);
}

#[test]
fn test_describe_separates_system_columns() {
    let engine = DatabaseEngine::in_memory("test").unwrap();
    let conn = engine.connect().unwrap();
    conn.execute_batch("CREATE TABLE t (id BIGINT, a VARCHAR, created_at TIMESTAMP)")
        .unwrap();

    let info = engine.describe_table("t").unwrap().unwrap();
    assert_eq!(info.columns.len(), 3);
    assert_eq!(info.data_columns, vec!["a".to_string()]);
}

#[test]
fn test_prune_before() {
    let engine = DatabaseEngine::in_memory("ipo").unwrap();
    let conn = engine.connect().unwrap();
    conn.execute_batch(
        "CREATE TABLE sme_data (name VARCHAR, created_at TIMESTAMP);
         INSERT INTO sme_data VALUES ('old', TIMESTAMP '2024-01-01 00:00:00');
         INSERT INTO sme_data VALUES ('new', TIMESTAMP '2024-03-01 00:00:00');",
    )
    .unwrap();

    let cutoff = chrono::NaiveDate::from_ymd_opt(2024, 2, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    assert_eq!(engine.prune_before("sme_data", cutoff).unwrap(), 1);
    assert_eq!(engine.row_count("sme_data").unwrap(), 1);

    conn.execute_batch("CREATE TABLE plain (name VARCHAR)").unwrap();
    assert_eq!(engine.prune_before("plain", cutoff).unwrap(), 0);
}

#[test]
fn test_database_set_unknown_domain() {
    let set = DatabaseSet::in_memory(["indices"]);
    assert!(set.get("indices").is_ok());
    assert!(matches!(
        set.get("nope"),
        Err(crate::Error::UnknownDatabase { .. })
    ));
}

#[test]
fn test_database_set_reuses_engine() {
    let set = DatabaseSet::in_memory(["news"]);
    let a = set.get("news").unwrap();
    let b = set.get("news").unwrap();
    assert!(std::sync::Arc::ptr_eq(&a, &b));
    assert_eq!(set.domains(), vec!["news".to_string()]);
}
