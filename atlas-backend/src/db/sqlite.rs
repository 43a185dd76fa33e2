//! SQLite backing store: connection pool, schema, and units of work.
//!
//! Table-specific operations live in `db::tables`, each as an `impl Database`
//! block plus connection-level helpers that can run inside a transaction.

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::{Transaction, TransactionBehavior};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

pub type DbConn = PooledConnection<SqliteConnectionManager>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(database_url: &str, pool_size: u32) -> DbResult<Self> {
        if let Some(parent) = Path::new(database_url).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    log::warn!("[DB] Could not create {}: {}", parent.display(), e);
                }
            }
        }

        let manager = SqliteConnectionManager::file(database_url).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
        });
        let pool = Pool::builder().max_size(pool_size).build(manager)?;

        let db = Self { pool };
        db.init()?;
        log::info!("[DB] Ready at {} (pool size {})", database_url, pool_size);
        Ok(db)
    }

    pub fn conn(&self) -> DbResult<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run a write unit of work: commit on `Ok`, roll back on `Err`.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`) so a unit that
    /// reads before it writes waits on `busy_timeout` behind other writers
    /// instead of failing its lock upgrade. The transaction rolls back when
    /// dropped uncommitted and the pooled connection is returned on drop.
    pub fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        self.run_transaction(TransactionBehavior::Immediate, f)
    }

    /// Run several reads against one snapshot.
    pub fn with_read_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        self.run_transaction(TransactionBehavior::Deferred, f)
    }

    fn run_transaction<T, E, F>(&self, behavior: TransactionBehavior, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.conn().map_err(E::from)?;
        let tx = conn
            .transaction_with_behavior(behavior)
            .map_err(|e| E::from(DbError::from(e)))?;
        let value = f(&tx)?;
        tx.commit().map_err(|e| E::from(DbError::from(e)))?;
        Ok(value)
    }

    fn init(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS object_types (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    creator_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    icon TEXT NOT NULL DEFAULT 'file',
    fields TEXT NOT NULL DEFAULT '[]',          -- JSON array of field definitions
    is_public INTEGER NOT NULL DEFAULT 1,
    measure_field TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_object_types_org ON object_types(org_id, created_at);

CREATE TABLE IF NOT EXISTS obj_type_access (
    creator_id TEXT NOT NULL,
    obj_type_id TEXT NOT NULL REFERENCES object_types(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    PRIMARY KEY (creator_id, obj_type_id)
);
CREATE INDEX IF NOT EXISTS idx_obj_type_access_type ON obj_type_access(obj_type_id);

CREATE TABLE IF NOT EXISTS objects (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    creator_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    business_key TEXT NOT NULL DEFAULT '',
    aliases TEXT NOT NULL DEFAULT '[]',         -- JSON array of strings
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_objects_org ON objects(org_id, created_at);

CREATE TABLE IF NOT EXISTS obj_type_values (
    id TEXT PRIMARY KEY,
    obj_id TEXT NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
    type_id TEXT NOT NULL REFERENCES object_types(id),
    type_values TEXT NOT NULL,                  -- JSON object
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_obj_type_values_obj ON obj_type_values(obj_id);
CREATE INDEX IF NOT EXISTS idx_obj_type_values_type ON obj_type_values(type_id);

CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    creator_id TEXT NOT NULL,
    text TEXT NOT NULL,
    location TEXT NOT NULL DEFAULT '',
    happened_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS note_records (
    note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    record_id TEXT NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
    PRIMARY KEY (note_id, record_id)
);
CREATE INDEX IF NOT EXISTS idx_note_records_record ON note_records(record_id);

-- Owned by external collaborators; read by the record detail view
CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    name TEXT NOT NULL,
    color TEXT NOT NULL DEFAULT ''
);
CREATE TABLE IF NOT EXISTS record_tags (
    record_id TEXT NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
    tag_id TEXT NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (record_id, tag_id)
);
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    content TEXT NOT NULL,
    deadline TEXT,
    status TEXT NOT NULL DEFAULT 'todo',
    assigned_id TEXT,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);
CREATE TABLE IF NOT EXISTS task_records (
    task_id TEXT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    record_id TEXT NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
    PRIMARY KEY (task_id, record_id)
);
CREATE TABLE IF NOT EXISTS funnels (
    id TEXT PRIMARY KEY,
    org_id TEXT NOT NULL,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS steps (
    id TEXT PRIMARY KEY,
    funnel_id TEXT NOT NULL REFERENCES funnels(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    step_order INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS record_steps (
    id TEXT PRIMARY KEY,
    record_id TEXT NOT NULL REFERENCES objects(id) ON DELETE CASCADE,
    step_id TEXT NOT NULL REFERENCES steps(id) ON DELETE CASCADE,
    sub_status INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    deleted_at TEXT
);

-- Full-text indexes, maintained in the same transaction as their source rows
CREATE VIRTUAL TABLE IF NOT EXISTS records_fts USING fts5(
    record_id UNINDEXED,
    name,
    description,
    aliases,
    tokenize='porter unicode61'
);
CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
    note_id UNINDEXED,
    text,
    tokenize='porter unicode61'
);
CREATE VIRTUAL TABLE IF NOT EXISTS type_values_fts USING fts5(
    value_id UNINDEXED,
    body,
    tokenize='porter unicode61'
);
"#;

/// Fixed-width UTC timestamp so lexical order equals chronological order.
pub fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time truncated to the stored precision.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::parse_from_rfc3339(&timestamp(&now))
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now)
}

pub(crate) fn parse_timestamp(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn parse_opt_timestamp(
    idx: usize,
    s: Option<String>,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    s.map(|s| parse_timestamp(idx, &s)).transpose()
}

pub(crate) fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read column `idx` as a UUID.
pub(crate) fn get_uuid(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    parse_uuid(idx, &s)
}

pub(crate) fn get_opt_uuid(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|s| parse_uuid(idx, &s)).transpose()
}

/// Read column `idx` as a timestamp.
pub(crate) fn get_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_timestamp(idx, &s)
}


#[cfg(test)]
mod tests {
    use super::testing::test_db;
    use super::*;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let b = DateTime::parse_from_rfc3339("2024-01-01T00:00:00.5Z").unwrap().with_timezone(&Utc);
        assert_eq!(timestamp(&a), "2024-01-01T00:00:00.000000Z");
        assert_eq!(timestamp(&b), "2024-01-01T00:00:00.500000Z");
        assert!(timestamp(&a) < timestamp(&b));
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let (_dir, db) = test_db();

        let result: DbResult<()> = db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO tags (id, org_id, name) VALUES (?1, ?2, 'vip')",
                [Uuid::new_v4().to_string(), Uuid::new_v4().to_string()],
            )?;
            Err(DbError::Corrupt("forced".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let (dir, db) = test_db();
        drop(db);
        let path = dir.path().join("test.db");
        assert!(Database::new(path.to_str().unwrap(), 2).is_ok());
    }
}
