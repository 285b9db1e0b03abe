//! Network access behind the cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use nearloo_core::ReqwestErrorExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::instrument;

use crate::error::OfflineError;
use crate::types::{CacheRequest, CachedResponse};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Performs requests on behalf of the cache.
///
/// Any HTTP answer is `Ok`, whatever its status; `Err` means no answer at all.
pub trait Fetcher: Clone + Send + Sync + 'static {
    fn fetch(
        &self,
        request: &CacheRequest,
    ) -> impl Future<Output = Result<CachedResponse, OfflineError>> + Send;
}

/// `reqwest`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Arc<Client>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, OfflineError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| OfflineError::Network(e.into_network_error()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}

impl Fetcher for HttpFetcher {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url), level = "debug")]
    async fn fetch(&self, request: &CacheRequest) -> Result<CachedResponse, OfflineError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| OfflineError::Network(e.into_network_error()))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| OfflineError::Network(e.into_network_error()))?;

        tracing::debug!("Fetched {} ({})", request.url, status);
        Ok(CachedResponse::new(status, content_type, body.to_vec()))
    }
}
