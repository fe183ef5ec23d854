//! Durable storage for the conversation thread identifier.
//!
//! There's a single slot keyed by `chat_thread_id`. `ThreadSlot` reads
//! it once at startup and writes through on every set and clear so the
//! in-memory value and the stored value never drift.
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};

pub const THREAD_ID_KEY: &str = "chat_thread_id";

pub trait ThreadStore: Send {
    fn load(&self) -> Result<Option<String>, Error>;
    fn save(&self, thread_id: &str) -> Result<(), Error>;
    fn clear(&self) -> Result<(), Error>;
}

/// SQLite backed key-value slot.
pub struct SqliteThreadStore {
    conn: Connection,
}

impl SqliteThreadStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn with_connection(conn: Connection) -> Result<Self, Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl ThreadStore for SqliteThreadStore {
    fn load(&self) -> Result<Option<String>, Error> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                params![THREAD_ID_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, thread_id: &str) -> Result<(), Error> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![THREAD_ID_KEY, thread_id],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![THREAD_ID_KEY])?;
        Ok(())
    }
}

/// In-memory store. Clones share the same slot, which lets a test keep
/// a handle to inspect what was persisted.
#[derive(Clone, Default)]
pub struct MemoryThreadStore(Arc<Mutex<Option<String>>>);

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(thread_id: &str) -> Self {
        Self(Arc::new(Mutex::new(Some(thread_id.to_string()))))
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().ok().and_then(|v| v.clone())
    }
}

impl ThreadStore for MemoryThreadStore {
    fn load(&self) -> Result<Option<String>, Error> {
        Ok(self.get())
    }

    fn save(&self, thread_id: &str) -> Result<(), Error> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("Thread slot lock poisoned"))?;
        *slot = Some(thread_id.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<(), Error> {
        let mut slot = self
            .0
            .lock()
            .map_err(|_| anyhow::anyhow!("Thread slot lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}

/// The one-time latch around the thread identifier.
pub struct ThreadSlot {
    value: Option<String>,
    store: Box<dyn ThreadStore>,
}

impl ThreadSlot {
    pub fn new(store: Box<dyn ThreadStore>) -> Self {
        let value = store.load().unwrap_or_else(|e| {
            tracing::warn!("Failed to read stored thread id: {}", e);
            None
        });
        if let Some(id) = &value {
            tracing::debug!("Resuming thread {}", id);
        }
        Self { value, store }
    }

    pub fn get(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Set the identifier unless one is already held. Returns whether
    /// the value was taken.
    pub fn set(&mut self, thread_id: &str) -> bool {
        if self.value.is_some() {
            return false;
        }
        self.value = Some(thread_id.to_string());
        if let Err(e) = self.store.save(thread_id) {
            tracing::warn!("Failed to persist thread id {}: {}", thread_id, e);
        }
        true
    }

    pub fn clear(&mut self) {
        self.value = None;
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored thread id: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.db");

        let store = SqliteThreadStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.save("thread-1").unwrap();
        store.save("thread-2").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("thread-2"));

        // Survives reopening the file
        drop(store);
        let store = SqliteThreadStore::open(&path).unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("thread-2"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_slot_latches_first_value() {
        let store = MemoryThreadStore::new();
        let mut slot = ThreadSlot::new(Box::new(store.clone()));

        assert!(slot.set("abc"));
        assert!(!slot.set("xyz"));
        assert_eq!(slot.get(), Some("abc"));
        assert_eq!(store.get().as_deref(), Some("abc"));
    }

    #[test]
    fn test_slot_reads_stored_value_at_init() {
        let store = MemoryThreadStore::with_value("persisted");
        let mut slot = ThreadSlot::new(Box::new(store));
        assert_eq!(slot.get(), Some("persisted"));
        assert!(!slot.set("other"));
    }

    #[test]
    fn test_slot_clear_writes_through() {
        let store = MemoryThreadStore::with_value("persisted");
        let mut slot = ThreadSlot::new(Box::new(store.clone()));
        slot.clear();
        assert_eq!(slot.get(), None);
        assert_eq!(store.get(), None);

        assert!(slot.set("fresh"));
        assert_eq!(store.get().as_deref(), Some("fresh"));
    }
}
