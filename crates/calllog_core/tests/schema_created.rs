use calllog_core::db::schema::{current_user_version, ensure_created, SCHEMA_VERSION, TABLES};
use calllog_core::db::{open_db, open_db_in_memory, DbError};
use calllog_core::ScratchDatabase;
use rusqlite::Connection;

#[test]
fn open_db_in_memory_creates_all_tables() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION);
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn ensure_created_is_idempotent() {
    let db = ScratchDatabase::start().unwrap();
    let factory = db.factory().unwrap();

    assert!(factory.ensure_created().unwrap());
    assert!(!factory.ensure_created().unwrap());

    let conn = open_db(db.path()).unwrap();
    assert!(!ensure_created(&conn).unwrap());
    assert_table_exists(&conn, "phone_call_topics");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let db = ScratchDatabase::start().unwrap();

    let conn = Connection::open(db.path()).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(db.path()).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, SCHEMA_VERSION);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn ensure_created_works_inside_explicit_transaction() {
    let db = ScratchDatabase::start().unwrap();
    let factory = db.factory().unwrap();

    let mut context = factory.create_context().unwrap();
    let tx = context.begin_transaction().unwrap();
    assert!(tx.ensure_created().unwrap());
    assert!(tx.in_transaction());
    tx.commit().unwrap();

    let conn = Connection::open(db.path()).unwrap();
    assert_eq!(current_user_version(&conn).unwrap(), SCHEMA_VERSION);
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn schema_created_in_rolled_back_transaction_is_discarded() {
    let db = ScratchDatabase::start().unwrap();
    let factory = db.factory().unwrap();

    let mut context = factory.create_context().unwrap();
    {
        let tx = context.begin_transaction().unwrap();
        assert!(tx.ensure_created().unwrap());
    }

    assert_eq!(current_user_version(context.connection()).unwrap(), 0);
    assert!(context.ensure_created().unwrap());
}

#[test]
fn foreign_keys_are_enforced() {
    let conn = open_db_in_memory().unwrap();
    let err = conn
        .execute(
            "INSERT INTO phone_calls (call_time, phone_number, caller_id) VALUES (0, '1', 999);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn scratch_database_is_removed_on_drop() {
    let db = ScratchDatabase::start().unwrap();
    let dir = db.directory().to_path_buf();
    {
        let factory = db.factory().unwrap();
        factory.ensure_created().unwrap();
    }
    assert!(db.path().exists());

    drop(db);
    assert!(!dir.exists());
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
