use chrono::{DateTime, Local};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::app_dirs::AppDirs;

/// Keys of the persisted statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum StatKey {
    BestGameCorrect,
    BestGameTotal,
    BestGameDate,
    TotalCorrectAnswers,
    TotalQuestions,
    GamesCount,
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("statistics database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to prepare statistics directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored value for `{key}` is not a valid timestamp: {value}")]
    InvalidTimestamp { key: StatKey, value: String },
    #[error("statistics storage unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, StatsError>;

/// Reads and writes available inside a storage transaction
pub trait KeyValueTxn {
    fn integer(&self, key: StatKey) -> Result<i64>;
    fn timestamp(&self, key: StatKey) -> Result<Option<DateTime<Local>>>;
    fn set_integer(&mut self, key: StatKey, value: i64) -> Result<()>;
    fn set_timestamp(&mut self, key: StatKey, value: DateTime<Local>) -> Result<()>;
}

/// Durable key-value storage for statistics.
///
/// Missing integers read as 0, missing timestamps as `None`. `transact` runs
/// the closure as one critical section: either every write lands or none does.
pub trait KeyValueStorage {
    fn integer(&self, key: StatKey) -> Result<i64>;
    fn timestamp(&self, key: StatKey) -> Result<Option<DateTime<Local>>>;
    fn transact(&mut self, f: &mut dyn FnMut(&mut dyn KeyValueTxn) -> Result<()>) -> Result<()>;
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS statistics (
        key TEXT PRIMARY KEY,
        int_value INTEGER,
        text_value TEXT,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    )
"#;

/// SQLite-backed storage, one row per key
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::with_connection(Connection::open(path)?)
    }

    /// Opens the database in the platform state directory
    pub fn open_default() -> Result<Self> {
        let path = AppDirs::db_path().ok_or_else(|| {
            StatsError::Unavailable("no home or data directory available".to_string())
        })?;
        Self::open(path)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(SCHEMA, [])?;
        Ok(Self { conn })
    }
}

fn read_integer(conn: &Connection, key: StatKey) -> Result<i64> {
    let value: Option<Option<i64>> = conn
        .query_row(
            "SELECT int_value FROM statistics WHERE key = ?1",
            [key.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.flatten().unwrap_or(0))
}

fn read_timestamp(conn: &Connection, key: StatKey) -> Result<Option<DateTime<Local>>> {
    let value: Option<Option<String>> = conn
        .query_row(
            "SELECT text_value FROM statistics WHERE key = ?1",
            [key.to_string()],
            |row| row.get(0),
        )
        .optional()?;

    match value.flatten() {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Some(dt.with_timezone(&Local)))
            .map_err(|_| StatsError::InvalidTimestamp { key, value: raw }),
    }
}

struct SqliteTxn<'a> {
    conn: &'a Connection,
}

impl KeyValueTxn for SqliteTxn<'_> {
    fn integer(&self, key: StatKey) -> Result<i64> {
        read_integer(self.conn, key)
    }

    fn timestamp(&self, key: StatKey) -> Result<Option<DateTime<Local>>> {
        read_timestamp(self.conn, key)
    }

    fn set_integer(&mut self, key: StatKey, value: i64) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO statistics (key, int_value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET int_value = excluded.int_value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key.to_string(), value],
        )?;
        Ok(())
    }

    fn set_timestamp(&mut self, key: StatKey, value: DateTime<Local>) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO statistics (key, text_value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET text_value = excluded.text_value, updated_at = CURRENT_TIMESTAMP
            "#,
            params![key.to_string(), value.to_rfc3339()],
        )?;
        Ok(())
    }
}

impl KeyValueStorage for SqliteStorage {
    fn integer(&self, key: StatKey) -> Result<i64> {
        read_integer(&self.conn, key)
    }

    fn timestamp(&self, key: StatKey) -> Result<Option<DateTime<Local>>> {
        read_timestamp(&self.conn, key)
    }

    fn transact(&mut self, f: &mut dyn FnMut(&mut dyn KeyValueTxn) -> Result<()>) -> Result<()> {
        // IMMEDIATE takes the write lock up front so read-modify-write can't interleave
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        {
            let mut txn = SqliteTxn { conn: &tx };
            f(&mut txn)?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Integer(i64),
    Timestamp(DateTime<Local>),
}

/// Process-local storage, used when no database is wanted and in tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<StatKey, StoredValue>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn map_integer(values: &HashMap<StatKey, StoredValue>, key: StatKey) -> i64 {
    match values.get(&key) {
        Some(StoredValue::Integer(v)) => *v,
        _ => 0,
    }
}

fn map_timestamp(values: &HashMap<StatKey, StoredValue>, key: StatKey) -> Option<DateTime<Local>> {
    match values.get(&key) {
        Some(StoredValue::Timestamp(t)) => Some(*t),
        _ => None,
    }
}

struct MemoryTxn {
    values: HashMap<StatKey, StoredValue>,
}

impl KeyValueTxn for MemoryTxn {
    fn integer(&self, key: StatKey) -> Result<i64> {
        Ok(map_integer(&self.values, key))
    }

    fn timestamp(&self, key: StatKey) -> Result<Option<DateTime<Local>>> {
        Ok(map_timestamp(&self.values, key))
    }

    fn set_integer(&mut self, key: StatKey, value: i64) -> Result<()> {
        self.values.insert(key, StoredValue::Integer(value));
        Ok(())
    }

    fn set_timestamp(&mut self, key: StatKey, value: DateTime<Local>) -> Result<()> {
        self.values.insert(key, StoredValue::Timestamp(value));
        Ok(())
    }
}

impl KeyValueStorage for MemoryStorage {
    fn integer(&self, key: StatKey) -> Result<i64> {
        Ok(map_integer(&self.values, key))
    }

    fn timestamp(&self, key: StatKey) -> Result<Option<DateTime<Local>>> {
        Ok(map_timestamp(&self.values, key))
    }

    fn transact(&mut self, f: &mut dyn FnMut(&mut dyn KeyValueTxn) -> Result<()>) -> Result<()> {
        let mut txn = MemoryTxn {
            values: self.values.clone(),
        };
        f(&mut txn)?;
        self.values = txn.values;
        Ok(())
    }
}
