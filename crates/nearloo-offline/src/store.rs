//! SQLite storage for named response caches.

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::types::CachedResponse;

const ACTIVE_VERSION_KEY: &str = "active_version";

/// Named caches of responses keyed by URL.
pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS caches (
                name TEXT PRIMARY KEY,
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS entries (
                cache_name TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                content_type TEXT,
                body BLOB NOT NULL,
                cached_at INTEGER NOT NULL,
                PRIMARY KEY (cache_name, url)
            );

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_entries_cache ON entries(cache_name);
            "#,
        )?;
        Ok(())
    }

    /// Create the named cache if it does not exist yet.
    pub fn open_cache(&self, name: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
            params![name, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    /// Names of every cache, sorted.
    pub fn cache_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM caches ORDER BY name ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("Failed to read cache names: {}", e))
    }

    /// Delete a cache and all its entries. Returns whether it existed.
    pub fn delete_cache(&self, name: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entries WHERE cache_name = ?1", params![name])?;
        let removed = tx.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Store a response, replacing any previous entry for the URL.
    pub fn put(&self, cache: &str, url: &str, response: &CachedResponse) -> Result<()> {
        self.open_cache(cache)?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO entries
            (cache_name, url, status, content_type, body, cached_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                cache,
                url,
                response.status,
                response.content_type,
                response.body,
                response.cached_at.timestamp_millis(),
            ],
        )?;
        Ok(())
    }

    /// Look up the response stored for a URL.
    pub fn get(&self, cache: &str, url: &str) -> Result<Option<CachedResponse>> {
        let entry = self
            .conn
            .query_row(
                "SELECT status, content_type, body, cached_at FROM entries WHERE cache_name = ?1 AND url = ?2",
                params![cache, url],
                Self::row_to_response,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn entry_count(&self, cache: &str) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
            params![cache],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Version currently in control, as recorded by the last activation.
    pub fn active_version(&self) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM meta WHERE key = ?1",
                params![ACTIVE_VERSION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_active_version(&self, version: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
            params![ACTIVE_VERSION_KEY, version],
        )?;
        Ok(())
    }

    fn row_to_response(row: &rusqlite::Row) -> rusqlite::Result<CachedResponse> {
        let cached_ms: i64 = row.get(3)?;
        Ok(CachedResponse {
            status: row.get(0)?,
            content_type: row.get(1)?,
            body: row.get(2)?,
            cached_at: DateTime::from_timestamp_millis(cached_ms).unwrap_or_default(),
        })
    }
}
