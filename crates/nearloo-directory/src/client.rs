//! HTTP client for a remote place directory.

use std::sync::Arc;
use std::time::Duration;

use nearloo_core::{DirectoryError, NetworkError, ReqwestErrorExt, ValidationError};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::instrument;

use crate::record::{ApiResponse, DirectoryPlace, Review};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for the `places` and `reviews` endpoints.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Arc<Client>,
    base_url: String,
}

impl DirectoryClient {
    /// Create a client for an API rooted at `base_url` (e.g. `https://example.org/api`).
    pub fn new(base_url: &str) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DirectoryError::Network(e.into_network_error()))?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    #[instrument(skip(self), level = "info")]
    pub async fn list_places(&self) -> Result<Vec<DirectoryPlace>, DirectoryError> {
        let response = self
            .client
            .get(self.url("places"))
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.into_network_error()))?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, place), fields(id = %place.id), level = "info")]
    pub async fn add_place(&self, place: &DirectoryPlace) -> Result<Vec<DirectoryPlace>, DirectoryError> {
        self.post("places/add", &serde_json::json!({ "place": place }))
            .await
    }

    #[instrument(skip(self), level = "info")]
    pub async fn delete_place(&self, id: &str) -> Result<Vec<DirectoryPlace>, DirectoryError> {
        self.post("places/delete", &serde_json::json!({ "id": id }))
            .await
    }

    #[instrument(skip(self), level = "info")]
    pub async fn list_reviews(&self, place_id: &str) -> Result<Vec<Review>, DirectoryError> {
        let response = self
            .client
            .get(self.url("reviews"))
            .query(&[("placeId", place_id)])
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.into_network_error()))?;

        self.handle_response(response).await
    }

    #[instrument(skip(self, review), fields(place_id = %review.place_id), level = "info")]
    pub async fn add_review(&self, review: &Review) -> Result<Vec<Review>, DirectoryError> {
        self.post("reviews/add", review).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<Vec<T>, DirectoryError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| DirectoryError::Network(e.into_network_error()))?;

        self.handle_response(response).await
    }

    /// Map the `{ok, items}` / `{ok: false, error}` envelope and status codes.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<T>, DirectoryError> {
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| DirectoryError::Network(e.into_network_error()))?;
        let envelope = serde_json::from_str::<ApiResponse<T>>(&text);

        if status.is_success() {
            return match envelope {
                Ok(ApiResponse { ok: true, items, .. }) => Ok(items.unwrap_or_default()),
                Ok(ApiResponse { error, .. }) => Err(DirectoryError::Server {
                    status: status.as_u16(),
                    message: error.unwrap_or_else(|| "request failed".to_string()),
                }),
                Err(e) => Err(DirectoryError::Network(NetworkError::InvalidResponse(
                    e.to_string(),
                ))),
            };
        }

        let message = envelope
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| text.chars().take(120).collect());

        match status {
            StatusCode::BAD_REQUEST => Err(DirectoryError::Validation(ValidationError::new(
                "request", message,
            ))),
            StatusCode::NOT_FOUND => Err(DirectoryError::NotFound(message)),
            _ => Err(DirectoryError::Server {
                status: status.as_u16(),
                message,
            }),
        }
    }
}
