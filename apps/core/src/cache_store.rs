use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use crate::model::CanonicalRecord;
use crate::normalize::Normalizer;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Sqlite(rusqlite::Error),
    Payload(serde_json::Error),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "io error: {error}"),
            Self::Sqlite(error) => write!(f, "sqlite error: {error}"),
            Self::Payload(error) => write!(f, "invalid cache payload: {error}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Payload(value)
    }
}

/// Local key-value store backing the persisted dataset.
pub trait CacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCacheStore {
    entries: HashMap<String, String>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

pub struct SqliteCacheStore {
    db: Connection,
}

impl SqliteCacheStore {
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    pub fn open_file(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn with_connection(db: Connection) -> Result<Self, StoreError> {
        db.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { db })
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.db.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.db.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// Reads a cached dataset. `Ok(None)` when no entry exists; an unreadable
/// payload is an error the caller treats as "no cache".
pub fn read_dataset(
    store: &dyn CacheStore,
    key: &str,
    normalizer: &Normalizer,
) -> Result<Option<Vec<CanonicalRecord>>, StoreError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let cached: Vec<CanonicalRecord> = serde_json::from_str(&raw)?;
    Ok(Some(
        cached
            .into_iter()
            .map(|record| record.rehydrate(normalizer))
            .collect(),
    ))
}

pub fn write_dataset(
    store: &mut dyn CacheStore,
    key: &str,
    records: &[CanonicalRecord],
) -> Result<(), StoreError> {
    let payload = serde_json::to_string(records)?;
    store.set(key, &payload)
}
