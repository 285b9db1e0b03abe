//! Versioned cache lifecycle: open, install, activate.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use nearloo_core::{Config, OfflineConfig};
use parking_lot::Mutex;
use tokio_util::task::TaskTracker;
use url::Url;

use crate::error::OfflineError;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::route::Router;
use crate::store::CacheStore;
use crate::types::{cache_key, CacheRequest, CachedResponse};

/// Owns the `<version>-static` and `<version>-runtime` caches.
#[derive(Clone)]
pub struct CacheManager<F = HttpFetcher> {
    store: Arc<Mutex<CacheStore>>,
    pub(crate) fetcher: F,
    pub(crate) router: Router,
    version: String,
    static_cache: String,
    runtime_cache: String,
    pub(crate) shell: Url,
    pub(crate) offline_page: Url,
    pub(crate) fallback_asset: Url,
    precache: Vec<Url>,
    refreshes: TaskTracker,
}

impl CacheManager<HttpFetcher> {
    /// Open the on-disk store named by the configuration with a network fetcher.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let path = config.offline_db_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let store = CacheStore::new(&path)
            .with_context(|| format!("Failed to open offline cache at {}", path.display()))?;
        let fetcher = HttpFetcher::new()?;
        tracing::info!("Opened offline cache at {}", path.display());
        Self::open(&config.offline, store, fetcher)
    }
}

impl<F: Fetcher> CacheManager<F> {
    /// Create the two named caches for the configured version.
    pub fn open(config: &OfflineConfig, store: CacheStore, fetcher: F) -> anyhow::Result<Self> {
        let origin = Url::parse(&config.app_origin)
            .with_context(|| format!("Invalid app origin: {}", config.app_origin))?;
        let resolve = |path: &str| {
            origin
                .join(path)
                .with_context(|| format!("Invalid offline path: {}", path))
        };

        let version = config.cache_version.trim().to_string();
        let static_cache = format!("{}-static", version);
        let runtime_cache = format!("{}-runtime", version);
        store.open_cache(&static_cache)?;
        store.open_cache(&runtime_cache)?;

        Ok(Self {
            router: Router::new(&origin, &config.runtime_hosts),
            shell: resolve(&config.shell_path)?,
            offline_page: resolve(&config.offline_page)?,
            fallback_asset: resolve(&config.fallback_asset)?,
            precache: config
                .precache
                .iter()
                .map(|p| resolve(p))
                .collect::<anyhow::Result<Vec<_>>>()?,
            store: Arc::new(Mutex::new(store)),
            fetcher,
            version,
            static_cache,
            runtime_cache,
            refreshes: TaskTracker::new(),
        })
    }

    /// The same caches behind a different fetcher.
    pub fn with_fetcher<G: Fetcher>(self, fetcher: G) -> CacheManager<G> {
        CacheManager {
            store: self.store,
            fetcher,
            router: self.router,
            version: self.version,
            static_cache: self.static_cache,
            runtime_cache: self.runtime_cache,
            shell: self.shell,
            offline_page: self.offline_page,
            fallback_asset: self.fallback_asset,
            precache: self.precache,
            refreshes: self.refreshes,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn static_cache(&self) -> &str {
        &self.static_cache
    }

    pub fn runtime_cache(&self) -> &str {
        &self.runtime_cache
    }

    /// Fetch every precache URL and store them all in the static cache.
    ///
    /// Nothing is stored unless every URL answers with a 2xx.
    pub async fn install(&self) -> Result<usize, OfflineError> {
        let mut fetched = Vec::with_capacity(self.precache.len());
        for url in &self.precache {
            let response = self.fetcher.fetch(&CacheRequest::get(url.clone())).await?;
            if !response.is_ok() {
                return Err(OfflineError::Refresh(format!(
                    "precache {} answered {}",
                    url, response.status
                )));
            }
            fetched.push((cache_key(url), response));
        }

        let cache = self.static_cache.clone();
        let count = fetched.len();
        self.with_store(move |store| {
            for (url, response) in &fetched {
                store.put(&cache, url, response)?;
            }
            Ok(())
        })
        .await?;

        tracing::info!("Precached {} entries into {}", count, self.static_cache);
        Ok(count)
    }

    /// Delete every cache that belongs to another version, then take control.
    ///
    /// Returns the names of the deleted caches.
    pub async fn activate(&self) -> Result<Vec<String>, OfflineError> {
        let keep = [self.static_cache.clone(), self.runtime_cache.clone()];
        let version = self.version.clone();

        let deleted = self
            .with_store(move |store| {
                let mut deleted = Vec::new();
                for name in store.cache_names()? {
                    if !keep.contains(&name) && store.delete_cache(&name)? {
                        deleted.push(name);
                    }
                }
                store.set_active_version(&version)?;
                Ok(deleted)
            })
            .await?;

        for name in &deleted {
            tracing::info!("Deleted stale cache {}", name);
        }
        tracing::info!("Cache version {} is active", self.version);
        Ok(deleted)
    }

    pub async fn active_version(&self) -> Result<Option<String>, OfflineError> {
        self.with_store(|store| store.active_version()).await
    }

    pub async fn cache_names(&self) -> Result<Vec<String>, OfflineError> {
        self.with_store(|store| store.cache_names()).await
    }

    /// Return the cached copy at once and refresh it in the background; with nothing
    /// cached, wait for the refresh and hand back its result, error included.
    ///
    /// Only 2xx answers are stored. Background refreshes are tracked until [`Self::settle`].
    pub async fn stale_while_revalidate<Fut, E>(
        &self,
        key: &Url,
        refresh: Fut,
    ) -> Result<CachedResponse, E>
    where
        Fut: Future<Output = Result<CachedResponse, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let cached = self.lookup(&self.runtime_cache, key).await;

        let manager = self.clone();
        let owned_key = key.clone();
        let revalidate = async move {
            match refresh.await {
                Ok(response) => {
                    if response.is_ok() {
                        manager.put(&manager.runtime_cache, &owned_key, &response).await;
                    }
                    Ok(response)
                }
                Err(e) => {
                    tracing::debug!("Refresh of {} failed: {}", owned_key, e);
                    Err(e)
                }
            }
        };

        match cached {
            Some(hit) => {
                self.refreshes.spawn(revalidate);
                Ok(hit)
            }
            None => revalidate.await,
        }
    }

    /// Wait for background refreshes still in flight.
    pub async fn settle(&self) {
        let pending = self.refreshes.len();
        if pending > 0 {
            tracing::debug!("Waiting for {} cache refreshes", pending);
        }
        self.refreshes.close();
        self.refreshes.wait().await;
        self.refreshes.reopen();
    }

    /// Read an entry; storage failures read as a miss.
    pub(crate) async fn lookup(&self, cache: &str, url: &Url) -> Option<CachedResponse> {
        let cache = cache.to_string();
        let key = cache_key(url);
        match self.with_store(move |store| store.get(&cache, &key)).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", url, e);
                None
            }
        }
    }

    /// Write an entry; storage failures are logged and dropped.
    pub(crate) async fn put(&self, cache: &str, url: &Url, response: &CachedResponse) {
        let cache = cache.to_string();
        let key = cache_key(url);
        let response = response.clone();
        if let Err(e) = self
            .with_store(move |store| store.put(&cache, &key, &response))
            .await
        {
            tracing::warn!("Cache write failed for {}: {}", url, e);
        }
    }

    async fn with_store<T, Op>(&self, op: Op) -> Result<T, OfflineError>
    where
        T: Send + 'static,
        Op: FnOnce(&CacheStore) -> anyhow::Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(&store.lock()))
            .await
            .map_err(|e| OfflineError::Cache(format!("cache task failed: {}", e)))?
            .map_err(|e| OfflineError::Cache(e.to_string()))
    }
}

impl<F> std::fmt::Debug for CacheManager<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("version", &self.version)
            .field("shell", &self.shell.as_str())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(origin: &str, version: &str) -> OfflineConfig {
        OfflineConfig {
            cache_version: version.to_string(),
            app_origin: origin.to_string(),
            precache: vec!["/app/".to_string(), "/app/offline.html".to_string()],
            ..OfflineConfig::default()
        }
    }

    fn manager(origin: &str, version: &str, store: CacheStore) -> CacheManager {
        CacheManager::open(&config(origin, version), store, HttpFetcher::new().unwrap()).unwrap()
    }

    async fn mount_page(server: &MockServer, route: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_open_creates_versioned_caches() {
        let manager = manager("http://localhost:8888", "v1", CacheStore::in_memory().unwrap());
        assert_eq!(manager.static_cache(), "v1-static");
        assert_eq!(manager.runtime_cache(), "v1-runtime");
        assert_eq!(manager.cache_names().await.unwrap(), vec!["v1-runtime", "v1-static"]);
        assert_eq!(manager.shell.as_str(), "http://localhost:8888/app/");
    }

    #[tokio::test]
    async fn test_open_rejects_bad_origin() {
        let result = CacheManager::open(
            &config("not an origin", "v1"),
            CacheStore::in_memory().unwrap(),
            HttpFetcher::new().unwrap(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_install_precaches() {
        let server = MockServer::start().await;
        mount_page(&server, "/app/", 200, "<shell>").await;
        mount_page(&server, "/app/offline.html", 200, "<offline>").await;

        let manager = manager(&server.uri(), "v1", CacheStore::in_memory().unwrap());
        assert_eq!(manager.install().await.unwrap(), 2);

        let hit = manager.lookup("v1-static", &manager.offline_page).await.unwrap();
        assert_eq!(hit.text(), "<offline>");
    }

    #[tokio::test]
    async fn test_install_is_all_or_nothing() {
        let server = MockServer::start().await;
        mount_page(&server, "/app/", 200, "<shell>").await;
        mount_page(&server, "/app/offline.html", 404, "").await;

        let manager = manager(&server.uri(), "v1", CacheStore::in_memory().unwrap());
        assert!(manager.install().await.is_err());
        assert!(manager.lookup("v1-static", &manager.shell).await.is_none());
    }

    #[tokio::test]
    async fn test_activate_rotates_versions() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("offline.db");

        let old = manager("http://localhost:8888", "v1", CacheStore::new(&db).unwrap());
        old.put(old.runtime_cache(), &old.shell, &CachedResponse::empty_results())
            .await;
        old.activate().await.unwrap();
        assert_eq!(old.active_version().await.unwrap().as_deref(), Some("v1"));

        let new = manager("http://localhost:8888", "v2", CacheStore::new(&db).unwrap());
        let mut deleted = new.activate().await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["v1-runtime", "v1-static"]);
        assert_eq!(new.cache_names().await.unwrap(), vec!["v2-runtime", "v2-static"]);
        assert_eq!(new.active_version().await.unwrap().as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_swr_miss_with_failed_refresh_is_the_refresh_error() {
        let manager = manager("http://localhost:8888", "v1", CacheStore::in_memory().unwrap());
        let key = Url::parse("https://overpass-api.de/api/interpreter?q=1").unwrap();

        let result = manager
            .stale_while_revalidate(&key, async {
                Err::<CachedResponse, _>(OfflineError::Refresh("offline".to_string()))
            })
            .await;

        assert!(matches!(result, Err(OfflineError::Refresh(_))));
        assert!(manager.lookup("v1-runtime", &key).await.is_none());
    }

    #[tokio::test]
    async fn test_swr_serves_stale_then_refreshes() {
        let manager = manager("http://localhost:8888", "v1", CacheStore::in_memory().unwrap());
        let key = Url::parse("http://localhost:8888/api/places").unwrap();

        let first = manager
            .stale_while_revalidate(&key, async { CachedResponse::json(200, &json!({"items": [1]})) })
            .await
            .unwrap();
        assert_eq!(first.body_json::<Value>().unwrap()["items"], json!([1]));

        let second = manager
            .stale_while_revalidate(&key, async { CachedResponse::json(200, &json!({"items": [2]})) })
            .await
            .unwrap();
        assert_eq!(second.body_json::<Value>().unwrap()["items"], json!([1]));

        manager.settle().await;
        let hit = manager.lookup("v1-runtime", &key).await.unwrap();
        assert_eq!(hit.body_json::<Value>().unwrap()["items"], json!([2]));
    }

    #[tokio::test]
    async fn test_settle_waits_for_slow_refresh() {
        let manager = manager("http://localhost:8888", "v1", CacheStore::in_memory().unwrap());
        let key = Url::parse("http://localhost:8888/api/places").unwrap();
        manager
            .put("v1-runtime", &key, &CachedResponse::json(200, &json!({"items": [1]})).unwrap())
            .await;

        let stale = manager
            .stale_while_revalidate(&key, async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                CachedResponse::json(200, &json!({"items": [1, 2]}))
            })
            .await
            .unwrap();
        assert_eq!(stale.body_json::<Value>().unwrap()["items"], json!([1]));

        manager.settle().await;
        let hit = manager.lookup("v1-runtime", &key).await.unwrap();
        assert_eq!(hit.body_json::<Value>().unwrap()["items"], json!([1, 2]));

        // the tracker takes new refreshes after settling
        manager
            .stale_while_revalidate(&key, async { CachedResponse::json(200, &json!({"items": [3]})) })
            .await
            .unwrap();
        manager.settle().await;
        let hit = manager.lookup("v1-runtime", &key).await.unwrap();
        assert_eq!(hit.body_json::<Value>().unwrap()["items"], json!([3]));
    }

    #[tokio::test]
    async fn test_swr_does_not_cache_errors() {
        let manager = manager("http://localhost:8888", "v1", CacheStore::in_memory().unwrap());
        let key = Url::parse("http://localhost:8888/api/places").unwrap();

        let response = manager
            .stale_while_revalidate(&key, async {
                Ok::<_, OfflineError>(CachedResponse::new(500, None, b"boom".to_vec()))
            })
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert!(manager.lookup("v1-runtime", &key).await.is_none());
    }
}
