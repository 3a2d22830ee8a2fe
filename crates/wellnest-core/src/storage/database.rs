//! SQLite snapshot storage for the wellness state.
//!
//! Provides persistent storage for:
//! - Tracked items and their completion days
//! - Sleep, meditation and metric journal entries
//! - Key-value store for small bits of application state
//!
//! The whole [`WellnessState`] is written in one transaction; cached streaks
//! are not stored and must be refreshed by the caller after loading.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

use super::{data_dir, migrations};
use crate::error::{CoreError, DatabaseError, Result};
use crate::tracker::{Category, CompletionRecord, Record, TrackedItem, WellnessState};

/// SQLite database holding the state snapshot.
pub struct Database {
    conn: Connection,
}

fn corrupt(table: &'static str, message: impl Into<String>) -> DatabaseError {
    DatabaseError::CorruptRow {
        table,
        message: message.into(),
    }
}

fn parse_timestamp(table: &'static str, raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{raw}': {e}")))
}

fn parse_date(table: &'static str, raw: &str) -> Result<NaiveDate, DatabaseError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| corrupt(table, format!("bad date '{raw}': {e}")))
}

impl Database {
    /// Open the database at `<data dir>/wellnest.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("wellnest.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        tracing::debug!(path = %path.display(), "opened database");
        Ok(db)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(DatabaseError::from)?;
        migrations::migrate(&self.conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Read the full state snapshot.
    ///
    /// # Errors
    /// Query failures or rows that no longer decode.
    pub fn load_state(&self) -> Result<WellnessState> {
        let mut state = WellnessState::new();

        let mut items_stmt = self.conn.prepare(
            "SELECT id, name, category, created_at FROM items ORDER BY position",
        )?;
        let rows = items_stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (id, name, category, created_at) = row?;
            let category: Category = category
                .parse()
                .map_err(|e: crate::error::ValidationError| corrupt("items", e.to_string()))?;
            state.items.push(TrackedItem {
                id,
                name,
                category,
                created_at: parse_timestamp("items", &created_at)?,
                records: Vec::new(),
                current_streak: 0,
                best_streak: 0,
            });
        }

        let mut completions_stmt = self.conn.prepare(
            "SELECT date, completed_at FROM completions WHERE item_id = ?1 ORDER BY position",
        )?;
        for item in &mut state.items {
            let rows = completions_stmt.query_map(params![item.id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (date, completed_at) = row?;
                item.records.push(CompletionRecord {
                    date: parse_date("completions", &date)?,
                    completed_at: parse_timestamp("completions", &completed_at)?,
                });
            }
        }

        let mut journal_stmt = self
            .conn
            .prepare("SELECT payload FROM journal ORDER BY id")?;
        let rows = journal_stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            let payload = row?;
            let record: Record =
                serde_json::from_str(&payload).map_err(|e| corrupt("journal", e.to_string()))?;
            state.journal.push(record);
        }

        tracing::debug!(
            items = state.items.len(),
            journal = state.journal.len(),
            "loaded state snapshot"
        );
        Ok(state)
    }

    /// Replace the stored snapshot with `state`.
    ///
    /// # Errors
    /// Any failed statement rolls the whole write back.
    pub fn save_state(&self, state: &WellnessState) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(
            "DELETE FROM completions;
             DELETE FROM items;
             DELETE FROM journal;",
        )?;

        {
            let mut insert_item = tx.prepare(
                "INSERT INTO items (id, name, category, created_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_completion = tx.prepare(
                "INSERT INTO completions (item_id, date, completed_at, position)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (pos, item) in state.items.iter().enumerate() {
                insert_item.execute(params![
                    item.id,
                    item.name,
                    item.category.as_str(),
                    item.created_at.to_rfc3339(),
                    pos as i64,
                ])?;
                for (rpos, record) in item.records.iter().enumerate() {
                    insert_completion.execute(params![
                        item.id,
                        record.date.format("%Y-%m-%d").to_string(),
                        record.completed_at.to_rfc3339(),
                        rpos as i64,
                    ])?;
                }
            }

            let mut insert_journal = tx.prepare(
                "INSERT INTO journal (kind, date, payload) VALUES (?1, ?2, ?3)",
            )?;
            for record in &state.journal {
                let payload = serde_json::to_string(record)?;
                insert_journal.execute(params![
                    record.kind(),
                    record.date().format("%Y-%m-%d").to_string(),
                    payload,
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(
            items = state.items.len(),
            journal = state.journal.len(),
            "saved state snapshot"
        );
        Ok(())
    }

    /// Get a value from the kv store.
    ///
    /// # Errors
    /// Query failure.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self.conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(CoreError::from(e)),
        }
    }

    /// Set a value in the kv store.
    ///
    /// # Errors
    /// Query failure.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adherence::AdherenceEngine;
    use crate::tracker::MetricKind;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 12, 0, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn sample_state() -> WellnessState {
        let engine = AdherenceEngine::new();
        let mut state = WellnessState::new();
        let a = state.add_item("Meditate", Category::Mindfulness, now()).unwrap();
        let b = state.add_item("Run", Category::Fitness, now()).unwrap();
        for d in [9, 7, 10] {
            state.toggle(&a, day(d), now(), day(10), &engine).unwrap();
        }
        state.toggle(&b, day(10), now(), day(10), &engine).unwrap();
        state
            .log(Record::Metric { date: day(10), metric: MetricKind::Steps, value: 9500.0, logged_at: now() })
            .unwrap();
        state
            .log(Record::Sleep { date: day(9), hours: 7.25, quality: 4, logged_at: now() })
            .unwrap();
        state
    }

    #[test]
    fn empty_database_loads_empty_state() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.load_state().unwrap(), WellnessState::new());
    }

    #[test]
    fn snapshot_roundtrip_preserves_order() {
        let db = Database::open_memory().unwrap();
        let state = sample_state();
        db.save_state(&state).unwrap();

        let mut loaded = db.load_state().unwrap();
        loaded.refresh(day(10), &AdherenceEngine::new());
        assert_eq!(loaded, state);
        let dates: Vec<_> = loaded.items[0].records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(9), day(7), day(10)]);
    }

    #[test]
    fn save_replaces_previous_snapshot() {
        let db = Database::open_memory().unwrap();
        let mut state = sample_state();
        db.save_state(&state).unwrap();

        let id = state.items[1].id.clone();
        state.delete_item(&id).unwrap();
        state.journal.clear();
        db.save_state(&state).unwrap();

        let loaded = db.load_state().unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert!(loaded.journal.is_empty());
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wellnest.db");
        let state = sample_state();
        Database::open_at(&path).unwrap().save_state(&state).unwrap();

        let loaded = Database::open_at(&path).unwrap().load_state().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.journal, state.journal);
    }

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
    }
}
