//! Search orchestration: position, remote search, directory, merge.

use std::sync::Arc;

use anyhow::Result;
use nearloo_core::{AppError, Config, ConfigError};
use nearloo_directory::{DirectoryPlace, PlaceDirectory};
use nearloo_offline::{CacheManager, CachedResponse};
use nearloo_search::{
    locate, merge, FixedPosition, GeoProvider, Place, Position, PositionOptions, RankedList,
    RemoteSearchClient, SearchOptions, SearchRequest,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Body of a cached runtime response; the offline placeholder reads as no items.
#[derive(Debug, Deserialize)]
struct CachedItems<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

/// Ties the geolocation provider, remote search, place directory and offline cache
/// together into one ranked search.
pub struct Finder<P = FixedPosition> {
    config: Arc<Config>,
    geo: P,
    search: RemoteSearchClient,
    directory: PlaceDirectory,
    cache: Option<CacheManager>,
}

impl<P: GeoProvider> Finder<P> {
    /// Build every collaborator from configuration.
    pub fn new(config: Config, geo: P) -> Result<Self> {
        let search = RemoteSearchClient::new(SearchOptions::from_config(&config.search))?;
        let directory = PlaceDirectory::from_config(&config)?;
        let cache = if config.offline.enabled {
            Some(CacheManager::from_config(&config)?)
        } else {
            None
        };
        Ok(Self::with_parts(config, geo, search, directory, cache))
    }

    pub fn with_parts(
        config: Config,
        geo: P,
        search: RemoteSearchClient,
        directory: PlaceDirectory,
        cache: Option<CacheManager>,
    ) -> Self {
        tracing::info!(
            "Finder ready ({} mirrors, directory {:?}, offline cache {})",
            search.options().endpoints.len(),
            directory,
            if cache.is_some() { "on" } else { "off" }
        );
        Self {
            config: Arc::new(config),
            geo,
            search,
            directory,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn directory(&self) -> &PlaceDirectory {
        &self.directory
    }

    pub fn cache(&self) -> Option<&CacheManager> {
        self.cache.as_ref()
    }

    /// Current position, from the configured origin with the configured options.
    pub async fn locate(&self) -> Result<Position, AppError> {
        let geo = &self.config.geo;
        let origin = Url::parse(&geo.origin).map_err(|e| {
            ConfigError::Invalid(format!("geo.origin '{}': {}", geo.origin, e))
        })?;
        let options = PositionOptions {
            timeout: Duration::from_millis(geo.timeout_ms),
            high_accuracy: geo.high_accuracy,
        };
        Ok(locate(&self.geo, &origin, &options).await?)
    }

    /// Locate, then search around the position.
    pub async fn find(
        &self,
        radius_meters: f64,
        include_likely: bool,
        emergency: bool,
    ) -> Result<RankedList, AppError> {
        let position = self.locate().await?;
        let request = SearchRequest::new(position.coordinate, radius_meters, include_likely)?
            .with_emergency(emergency);
        self.find_at(&request).await
    }

    /// Ranked places for a request: remote results merged with the directory.
    ///
    /// A failing directory is logged and contributes nothing.
    pub async fn find_at(&self, request: &SearchRequest) -> Result<RankedList, AppError> {
        let remote = self.remote_places(request).await?;
        let directory = match self.directory_places().await {
            Ok(places) => places,
            Err(e) => {
                tracing::warn!("Place directory unavailable, ranking remote results only: {}", e);
                Vec::new()
            }
        };

        let ranked = merge(request.coordinate(), &remote, &directory);
        tracing::info!(
            "Ranked {} places ({} remote, {} from the directory)",
            ranked.len(),
            remote.len(),
            directory.len()
        );
        Ok(ranked)
    }

    async fn remote_places(&self, request: &SearchRequest) -> Result<Vec<Place>, AppError> {
        let (Some(cache), Some(key)) = (&self.cache, self.search_key(request)) else {
            return Ok(self.search.search(request).await?);
        };

        // a miss with a failed search surfaces the search error itself
        let client = self.search.clone();
        let request = *request;
        let response = cache
            .stale_while_revalidate(&key, async move {
                let places = client.search(&request).await?;
                cache_items(&serde_json::json!({ "items": places }))
            })
            .await?;
        Ok(read_items(&response, &key))
    }

    async fn directory_places(&self) -> Result<Vec<Place>, AppError> {
        let cache = match (&self.cache, &self.directory) {
            (Some(cache), PlaceDirectory::Http(client)) => Some((cache, client.clone())),
            _ => None,
        };
        let Some((cache, client)) = cache else {
            return Ok(self.directory.places().await?);
        };

        let key = Url::parse(&format!("{}/places", client.base_url()))
            .map_err(|e| ConfigError::Invalid(format!("directory.base_url: {}", e)))?;
        let response = cache
            .stale_while_revalidate(&key, async move {
                let records = client.list_places().await?;
                cache_items(&serde_json::json!({ "ok": true, "items": records }))
            })
            .await?;
        let records: Vec<DirectoryPlace> = read_items(&response, &key);
        Ok(records.iter().map(DirectoryPlace::to_place).collect())
    }

    /// Wait for cache refreshes started by earlier searches.
    pub async fn settle(&self) {
        if let Some(cache) = &self.cache {
            cache.settle().await;
        }
    }

    /// Cache identity of a search: first mirror plus the rounded request parameters.
    fn search_key(&self, request: &SearchRequest) -> Option<Url> {
        let mut key = self.search.options().endpoints.first()?.clone();
        let coordinate = request.coordinate();
        key.query_pairs_mut()
            .clear()
            .append_pair("lat", &format!("{:.5}", coordinate.latitude()))
            .append_pair("lon", &format!("{:.5}", coordinate.longitude()))
            .append_pair("radius", &format!("{:.0}", request.radius_meters()))
            .append_pair("likely", if request.include_likely() { "1" } else { "0" });
        Some(key)
    }
}

fn cache_items(body: &serde_json::Value) -> Result<CachedResponse, AppError> {
    CachedResponse::json(200, body).map_err(|e| AppError::Other(e.into()))
}

fn read_items<T: DeserializeOwned>(response: &CachedResponse, key: &Url) -> Vec<T> {
    if !response.is_ok() {
        tracing::warn!("{} answered {}, treating as no results", key, response.status);
        return Vec::new();
    }
    match response.body_json::<CachedItems<T>>() {
        Ok(body) => body.items,
        Err(e) => {
            tracing::warn!("Unreadable cached response for {}: {}", key, e);
            Vec::new()
        }
    }
}
