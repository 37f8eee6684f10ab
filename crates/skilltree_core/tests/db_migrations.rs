use rusqlite::Connection;
use skilltree_core::db::migrations::{latest_version, schema_version};
use skilltree_core::db::{open_db, open_db_in_memory, DbError};

#[test]
fn in_memory_database_gets_skill_schema_and_foreign_keys() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert_eq!(sqlite_objects(&conn, "table"), ["skill_scopes", "skills"]);
    assert_eq!(sqlite_objects(&conn, "index"), ["idx_skills_scope_order"]);

    let foreign_keys: i64 = conn
        .pragma_query_value(None, "foreign_keys", |row| row.get(0))
        .unwrap();
    assert_eq!(foreign_keys, 1);
}

#[test]
fn reopening_a_skill_file_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skilltree.db");

    let conn = open_db(&path).unwrap();
    conn.execute(
        "INSERT INTO skill_scopes (scope_id, display_name) VALUES ('park', 'Park');",
        [],
    )
    .unwrap();
    drop(conn);

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    let scopes: i64 = conn
        .query_row("SELECT COUNT(*) FROM skill_scopes;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(scopes, 1);
}

#[test]
fn file_from_newer_binary_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.pragma_update(None, "user_version", 999).unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rejected_step_rolls_back_whole_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.db");

    // A pre-existing `skills` table without the ordering columns.
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE skills (skill_id TEXT PRIMARY KEY);")
        .unwrap();
    drop(conn);

    match open_db(&path).unwrap_err() {
        DbError::MigrationFailed { version, name, .. } => {
            assert_eq!(version, 2);
            assert_eq!(name, "skill_order_index");
        }
        other => panic!("unexpected error: {other}"),
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), 0);
    assert_eq!(sqlite_objects(&conn, "table"), ["skills"]);
}

#[test]
fn difficulty_column_rejects_negative_values() {
    let conn = open_db_in_memory().unwrap();
    conn.execute(
        "INSERT INTO skill_scopes (scope_id, display_name) VALUES ('s', 'S');",
        [],
    )
    .unwrap();

    let result = conn.execute(
        "INSERT INTO skills (skill_id, scope_id, name, difficulty) VALUES ('x', 's', 'X', -1);",
        [],
    );
    assert!(result.is_err());
}

fn sqlite_objects(conn: &Connection, kind: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = ?1 AND name NOT LIKE 'sqlite_%'
             ORDER BY name;",
        )
        .unwrap();
    stmt.query_map([kind], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}
