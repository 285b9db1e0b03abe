//! Per-route response policies.

use tracing::instrument;

use crate::error::OfflineError;
use crate::fetch::Fetcher;
use crate::manager::CacheManager;
use crate::route::Route;
use crate::types::{CacheRequest, CachedResponse};

impl<F: Fetcher> CacheManager<F> {
    /// Answer a request through the cache policy that its route selects.
    #[instrument(skip(self, request), fields(url = %request.url), level = "debug")]
    pub async fn respond(&self, request: CacheRequest) -> Result<CachedResponse, OfflineError> {
        let route = self.router.classify(&request);
        tracing::debug!("Route {:?}", route);

        match route {
            Route::Passthrough => self.fetcher.fetch(&request).await,
            Route::Navigate => self.network_first(&request).await,
            Route::Runtime => Ok(self.revalidate(request).await),
            Route::Static => self.cache_first(&request).await,
            Route::Network => self.network_or_runtime(&request).await,
        }
    }

    /// Network first; a successful page refreshes the shell, a failure serves the offline page.
    async fn network_first(&self, request: &CacheRequest) -> Result<CachedResponse, OfflineError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.put(self.static_cache(), &self.shell, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::info!("Navigation to {} failed, serving offline page: {}", request.url, e);
                self.lookup(self.static_cache(), &self.offline_page)
                    .await
                    .ok_or_else(|| OfflineError::Unavailable(request.url.to_string()))
            }
        }
    }

    /// Stale-while-revalidate; with nothing cached and no network, the empty-result placeholder.
    async fn revalidate(&self, request: CacheRequest) -> CachedResponse {
        let fetcher = self.fetcher.clone();
        let key = request.url.clone();
        self.stale_while_revalidate(&key, async move { fetcher.fetch(&request).await })
            .await
            .unwrap_or_else(|e| {
                tracing::info!("Nothing cached for {}, serving empty results: {}", key, e);
                CachedResponse::empty_results()
            })
    }

    /// Cache first; populate on a miss, fall back to the pinned asset when offline.
    async fn cache_first(&self, request: &CacheRequest) -> Result<CachedResponse, OfflineError> {
        if let Some(hit) = self.lookup(self.static_cache(), &request.url).await {
            return Ok(hit);
        }

        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.put(self.static_cache(), &request.url, &response).await;
                }
                Ok(response)
            }
            Err(e) => {
                tracing::debug!("Asset {} unavailable: {}", request.url, e);
                self.lookup(self.static_cache(), &self.fallback_asset)
                    .await
                    .ok_or_else(|| OfflineError::Unavailable(request.url.to_string()))
            }
        }
    }

    async fn network_or_runtime(
        &self,
        request: &CacheRequest,
    ) -> Result<CachedResponse, OfflineError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                tracing::debug!("Fetch of {} failed, trying runtime cache: {}", request.url, e);
                self.lookup(self.runtime_cache(), &request.url)
                    .await
                    .ok_or(e)
            }
        }
    }
}
