//! Schema upgrades for the snapshot database.
//!
//! Each step runs once, in order, when a database is opened; the single row
//! in `schema_version` records the last step applied.

use rusqlite::{Connection, Result as SqliteResult};

/// Version written by the newest step below.
pub const SCHEMA_VERSION: i32 = 2;

/// Run every step newer than the stored version.
///
/// # Errors
/// Any failing statement; the failed step leaves its version unrecorded.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Stored version, or 0 for a fresh file.
pub fn get_schema_version(conn: &Connection) -> SqliteResult<i32> {
    match conn.query_row("SELECT version FROM schema_version", [], |row| {
        row.get::<_, i32>(0)
    }) {
        Ok(v) => Ok(v),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: items, completions and the kv store.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS items (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            category    TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            position    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS completions (
            item_id      TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            date         TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            position     INTEGER NOT NULL,
            PRIMARY KEY (item_id, date)
        );

        CREATE TABLE IF NOT EXISTS kv (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    set_schema_version(&tx, 1)?;
    tx.commit()
}

/// Migration v2: journal for sleep, meditation and metric entries.
///
/// Entries are stored as their tagged JSON form with the kind and date
/// duplicated into columns for querying.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS journal (
            id       INTEGER PRIMARY KEY AUTOINCREMENT,
            kind     TEXT NOT NULL,
            date     TEXT NOT NULL,
            payload  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_journal_kind_date ON journal(kind, date);",
    )?;
    set_schema_version(&tx, 2)?;
    tx.commit()
}
