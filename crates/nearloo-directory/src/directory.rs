//! Unified place directory supporting local and remote backends.

use std::sync::Arc;

use nearloo_core::{Config, DirectoryError};
use nearloo_search::Place;
use parking_lot::Mutex;

use crate::backend::{DirectoryBackend, DirectoryResult};
use crate::client::DirectoryClient;
use crate::record::{DirectoryPlace, Review};
use crate::store::SqliteDirectoryStore;

/// Async handle over the user-submitted place directory.
#[derive(Clone)]
pub enum PlaceDirectory {
    /// Local SQLite storage.
    Sqlite(Arc<Mutex<SqliteDirectoryStore>>),

    /// Remote directory API.
    Http(Arc<DirectoryClient>),
}

impl PlaceDirectory {
    pub fn sqlite(store: SqliteDirectoryStore) -> Self {
        Self::Sqlite(Arc::new(Mutex::new(store)))
    }

    pub fn http(client: DirectoryClient) -> Self {
        Self::Http(Arc::new(client))
    }

    /// Local store when `directory.local` is set, remote API otherwise.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        if config.directory.local {
            Self::open_local(config)
        } else {
            let client = DirectoryClient::new(&config.directory.base_url)?;
            Ok(Self::http(client))
        }
    }

    /// Always the local SQLite store, regardless of `directory.local`.
    pub fn open_local(config: &Config) -> anyhow::Result<Self> {
        let path = config.directory_store_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = SqliteDirectoryStore::new(&path)?.with_limits(
            config.directory.max_places,
            config.directory.max_reviews_per_place,
        );
        tracing::info!("Opened place directory at {}", path.display());
        Ok(Self::sqlite(store))
    }

    pub fn is_sqlite(&self) -> bool {
        matches!(self, Self::Sqlite(_))
    }

    async fn blocking<T, F>(store: &Arc<Mutex<SqliteDirectoryStore>>, op: F) -> DirectoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteDirectoryStore) -> DirectoryResult<T> + Send + 'static,
    {
        let store = store.clone();
        tokio::task::spawn_blocking(move || op(&store.lock()))
            .await
            .map_err(|e| DirectoryError::storage(format!("directory task failed: {}", e)))?
    }

    /// All places, newest first.
    pub async fn list_places(&self) -> DirectoryResult<Vec<DirectoryPlace>> {
        match self {
            Self::Sqlite(store) => Self::blocking(store, |s| s.list_places()).await,
            Self::Http(client) => client.list_places().await,
        }
    }

    pub async fn add_place(&self, place: DirectoryPlace) -> DirectoryResult<Vec<DirectoryPlace>> {
        match self {
            Self::Sqlite(store) => Self::blocking(store, move |s| s.add_place(place)).await,
            Self::Http(client) => client.add_place(&place).await,
        }
    }

    pub async fn delete_place(&self, id: &str) -> DirectoryResult<Vec<DirectoryPlace>> {
        match self {
            Self::Sqlite(store) => {
                let id = id.to_string();
                Self::blocking(store, move |s| s.delete_place(&id)).await
            }
            Self::Http(client) => client.delete_place(id).await,
        }
    }

    pub async fn list_reviews(&self, place_id: &str) -> DirectoryResult<Vec<Review>> {
        if place_id.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Sqlite(store) => {
                let place_id = place_id.to_string();
                Self::blocking(store, move |s| s.list_reviews(&place_id)).await
            }
            Self::Http(client) => client.list_reviews(place_id).await,
        }
    }

    pub async fn add_review(&self, review: Review) -> DirectoryResult<Vec<Review>> {
        match self {
            Self::Sqlite(store) => Self::blocking(store, move |s| s.add_review(review)).await,
            Self::Http(client) => client.add_review(&review).await,
        }
    }

    /// Stored places as search candidates.
    pub async fn places(&self) -> DirectoryResult<Vec<Place>> {
        let records = self.list_places().await?;
        Ok(records.iter().map(DirectoryPlace::to_place).collect())
    }
}

impl std::fmt::Debug for PlaceDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(_) => f.debug_tuple("PlaceDirectory::Sqlite").finish(),
            Self::Http(client) => f
                .debug_tuple("PlaceDirectory::Http")
                .field(&client.base_url())
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use nearloo_search::PlaceSource;

    fn create_sqlite_directory() -> PlaceDirectory {
        let store = SqliteDirectoryStore::in_memory().expect("Failed to create in-memory store");
        PlaceDirectory::sqlite(store)
    }

    fn place(id: &str) -> DirectoryPlace {
        DirectoryPlace {
            id: id.to_string(),
            name: "Bar Centrale".to_string(),
            address: "Via Roma 1".to_string(),
            notes: String::new(),
            date_iso: "2026-03-01".to_string(),
            photo_base64: String::new(),
            lat: 45.0,
            lon: 9.0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sqlite_add_and_list() {
        let directory = create_sqlite_directory();

        let items = directory.add_place(place("p1")).await.unwrap();
        assert_eq!(items.len(), 1);

        let places = directory.places().await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].source(), PlaceSource::UserSubmitted);
        assert_eq!(places[0].id, "p1");
    }

    #[tokio::test]
    async fn test_sqlite_delete() {
        let directory = create_sqlite_directory();
        directory.add_place(place("p1")).await.unwrap();

        let items = directory.delete_place("p1").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_reviews_without_place_id_are_empty() {
        let directory = create_sqlite_directory();
        assert!(directory.list_reviews("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sqlite_reviews() {
        let directory = create_sqlite_directory();
        let review = Review {
            id: "r1".to_string(),
            place_id: "p1".to_string(),
            place_name: "Bar Centrale".to_string(),
            stars: 3,
            text: String::new(),
            created_at: 1,
        };

        let items = directory.add_review(review.clone()).await.unwrap();
        assert_eq!(items, vec![review]);
    }

    #[test]
    fn test_backend_detection() {
        assert!(create_sqlite_directory().is_sqlite());
        let http = PlaceDirectory::http(DirectoryClient::new("http://localhost:8888/api").unwrap());
        assert!(!http.is_sqlite());
        assert!(format!("{:?}", http).contains("localhost:8888"));
    }
}
