//! Requests and cached responses.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::OfflineError;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An outgoing request as seen by the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRequest {
    pub method: Method,
    pub url: Url,
    /// Top-level page load rather than a subresource fetch
    pub navigate: bool,
    pub body: Option<Vec<u8>>,
}

impl CacheRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            navigate: false,
            body: None,
        }
    }

    pub fn navigation(url: Url) -> Self {
        Self {
            navigate: true,
            ..Self::get(url)
        }
    }

    pub fn post(url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: Method::POST,
            url,
            navigate: false,
            body: Some(body.into()),
        }
    }

    /// Parse `url` into a GET request.
    pub fn parse(url: &str) -> Result<Self, OfflineError> {
        let url = Url::parse(url).map_err(|_| OfflineError::InvalidUrl(url.to_string()))?;
        Ok(Self::get(url))
    }

    pub fn key(&self) -> String {
        cache_key(&self.url)
    }
}

/// Cache key for a URL: everything but the fragment.
pub fn cache_key(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}

/// A response, either fresh from the network or read back from a cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub cached_at: DateTime<Utc>,
}

impl CachedResponse {
    pub fn new(status: u16, content_type: Option<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type,
            body,
            cached_at: Utc::now(),
        }
    }

    /// A JSON response with the given status.
    pub fn json<T: Serialize + ?Sized>(status: u16, value: &T) -> Result<Self, OfflineError> {
        let body = serde_json::to_vec(value).map_err(|e| OfflineError::Cache(e.to_string()))?;
        Ok(Self::new(status, Some(JSON_CONTENT_TYPE.to_string()), body))
    }

    /// Served for runtime calls when there is neither a cached copy nor a network answer.
    pub fn empty_results() -> Self {
        Self::new(
            200,
            Some(JSON_CONTENT_TYPE.to_string()),
            br#"{"items":[],"elements":[]}"#.to_vec(),
        )
    }

    /// 2xx status.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, OfflineError> {
        serde_json::from_slice(&self.body).map_err(|e| OfflineError::Cache(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_placeholder_shape() {
        let response = CachedResponse::empty_results();
        assert_eq!(response.status, 200);
        assert!(response.is_ok());
        assert_eq!(response.content_type.as_deref(), Some(JSON_CONTENT_TYPE));
        let body: Value = response.body_json().unwrap();
        assert_eq!(body, json!({"items": [], "elements": []}));
    }

    #[test]
    fn test_ok_range() {
        assert!(CachedResponse::new(204, None, Vec::new()).is_ok());
        assert!(!CachedResponse::new(304, None, Vec::new()).is_ok());
        assert!(!CachedResponse::new(503, None, Vec::new()).is_ok());
    }

    #[test]
    fn test_key_drops_fragment() {
        let request = CacheRequest::parse("http://localhost:8888/app/#map").unwrap();
        assert_eq!(request.key(), "http://localhost:8888/app/");
        assert!(!request.navigate);
        assert!(CacheRequest::navigation(request.url.clone()).navigate);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            CacheRequest::parse("not a url"),
            Err(OfflineError::InvalidUrl(_))
        ));
    }
}
