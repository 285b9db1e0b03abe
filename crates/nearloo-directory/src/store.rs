//! SQLite-based directory storage.
//!
//! Places and reviews carry a monotonically increasing `seq` so "newest first" survives
//! identical timestamps and re-inserts.

use std::path::Path;

use chrono::{DateTime, Utc};
use nearloo_core::{DirectoryError, RusqliteErrorExt, ValidationError};
use rusqlite::{params, Connection};

use crate::backend::{DirectoryBackend, DirectoryResult};
use crate::record::{DirectoryPlace, Review};

pub const DEFAULT_MAX_PLACES: usize = 300;
pub const DEFAULT_MAX_REVIEWS_PER_PLACE: usize = 200;

/// SQLite-based place and review storage.
pub struct SqliteDirectoryStore {
    conn: Connection,
    max_places: usize,
    max_reviews: usize,
}

impl SqliteDirectoryStore {
    /// Open (or create) a store at the given path.
    pub fn new<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store (for testing).
    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> anyhow::Result<Self> {
        let store = Self {
            conn,
            max_places: DEFAULT_MAX_PLACES,
            max_reviews: DEFAULT_MAX_REVIEWS_PER_PLACE,
        };
        store.init_schema()?;
        Ok(store)
    }

    pub fn with_limits(mut self, max_places: usize, max_reviews: usize) -> Self {
        self.max_places = max_places.max(1);
        self.max_reviews = max_reviews.max(1);
        self
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS places (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                address TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                date_iso TEXT NOT NULL,
                photo_base64 TEXT NOT NULL DEFAULT '',
                lat REAL NOT NULL,
                lon REAL NOT NULL,
                created_at TEXT NOT NULL,
                seq INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS reviews (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL,
                place_id TEXT NOT NULL,
                place_name TEXT NOT NULL DEFAULT '',
                stars INTEGER NOT NULL,
                text TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_places_seq ON places(seq DESC);
            CREATE INDEX IF NOT EXISTS idx_reviews_place_seq ON reviews(place_id, seq DESC);
            "#,
        )?;
        Ok(())
    }

    fn row_to_place(row: &rusqlite::Row) -> rusqlite::Result<DirectoryPlace> {
        let created_at_str: String = row.get(8)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok(DirectoryPlace {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            notes: row.get(3)?,
            date_iso: row.get(4)?,
            photo_base64: row.get(5)?,
            lat: row.get(6)?,
            lon: row.get(7)?,
            created_at,
        })
    }

    fn row_to_review(row: &rusqlite::Row) -> rusqlite::Result<Review> {
        let stars: i64 = row.get(3)?;
        Ok(Review {
            id: row.get(0)?,
            place_id: row.get(1)?,
            place_name: row.get(2)?,
            stars: stars.clamp(1, 5) as u8,
            text: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn query_places(&self) -> rusqlite::Result<Vec<DirectoryPlace>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, address, notes, date_iso, photo_base64, lat, lon, created_at
             FROM places
             ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_place)?;
        rows.collect()
    }

    fn query_reviews(&self, place_id: &str) -> rusqlite::Result<Vec<Review>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, place_id, place_name, stars, text, created_at
             FROM reviews
             WHERE place_id = ?1
             ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map(params![place_id], Self::row_to_review)?;
        rows.collect()
    }

    fn insert_place(&self, place: &DirectoryPlace) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute("DELETE FROM places WHERE id = ?1", params![place.id])?;
        tx.execute(
            r#"
            INSERT INTO places (id, name, address, notes, date_iso, photo_base64, lat, lon, created_at, seq)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                    (SELECT COALESCE(MAX(seq), 0) + 1 FROM places))
            "#,
            params![
                place.id,
                place.name,
                place.address,
                place.notes,
                place.date_iso,
                place.photo_base64,
                place.lat,
                place.lon,
                place.created_at.to_rfc3339(),
            ],
        )?;
        let evicted = tx.execute(
            "DELETE FROM places WHERE id NOT IN (SELECT id FROM places ORDER BY seq DESC LIMIT ?1)",
            params![self.max_places as i64],
        )?;

        tx.commit()?;
        if evicted > 0 {
            tracing::debug!("Evicted {} oldest places", evicted);
        }
        Ok(())
    }

    fn insert_review(&self, review: &Review) -> rusqlite::Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO reviews (id, place_id, place_name, stars, text, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                review.id,
                review.place_id,
                review.place_name,
                review.stars,
                review.text,
                review.created_at,
            ],
        )?;
        tx.execute(
            "DELETE FROM reviews
             WHERE place_id = ?1
               AND seq NOT IN (SELECT seq FROM reviews WHERE place_id = ?1 ORDER BY seq DESC LIMIT ?2)",
            params![review.place_id, self.max_reviews as i64],
        )?;

        tx.commit()
    }
}

impl DirectoryBackend for SqliteDirectoryStore {
    fn list_places(&self) -> DirectoryResult<Vec<DirectoryPlace>> {
        self.query_places().map_err(|e| e.into_directory_error())
    }

    fn add_place(&self, place: DirectoryPlace) -> DirectoryResult<Vec<DirectoryPlace>> {
        self.insert_place(&place)
            .map_err(|e| e.into_directory_error())?;
        tracing::debug!("Stored place: {}", place.id);
        self.list_places()
    }

    fn delete_place(&self, id: &str) -> DirectoryResult<Vec<DirectoryPlace>> {
        let removed = self
            .conn
            .execute("DELETE FROM places WHERE id = ?1", params![id])
            .map_err(|e| e.into_directory_error())?;
        tracing::debug!("Deleted place {} ({} rows)", id, removed);
        self.list_places()
    }

    fn list_reviews(&self, place_id: &str) -> DirectoryResult<Vec<Review>> {
        self.query_reviews(place_id)
            .map_err(|e| e.into_directory_error())
    }

    fn add_review(&self, review: Review) -> DirectoryResult<Vec<Review>> {
        if review.place_id.is_empty() {
            return Err(DirectoryError::Validation(ValidationError::new(
                "placeId",
                "placeId missing",
            )));
        }
        self.insert_review(&review)
            .map_err(|e| e.into_directory_error())?;
        self.list_reviews(&review.place_id)
    }

    fn count_places(&self) -> DirectoryResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM places", [], |row| row.get(0))
            .map_err(|e| e.into_directory_error())?;
        Ok(count as usize)
    }
}
