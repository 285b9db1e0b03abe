//! Which caching policy applies to a request.

use reqwest::Method;
use url::{Origin, Url};

use crate::types::CacheRequest;

const FUNCTIONS_PATH: &str = "/.netlify/functions/";
const API_PREFIX: &str = "/api/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Not a GET: straight to the network, never cached.
    Passthrough,
    /// Page load: network first, offline page on failure.
    Navigate,
    /// Search and directory calls: stale-while-revalidate.
    Runtime,
    /// Same-origin asset: cache first.
    Static,
    /// Anything else: network, runtime cache on failure.
    Network,
}

#[derive(Debug, Clone)]
pub struct Router {
    origin: Origin,
    runtime_hosts: Vec<String>,
}

impl Router {
    pub fn new(app_origin: &Url, runtime_hosts: &[String]) -> Self {
        Self {
            origin: app_origin.origin(),
            runtime_hosts: runtime_hosts
                .iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn classify(&self, request: &CacheRequest) -> Route {
        if request.method != Method::GET {
            return Route::Passthrough;
        }
        if request.navigate {
            return Route::Navigate;
        }
        if self.is_runtime(&request.url) {
            return Route::Runtime;
        }
        if self.is_same_origin(&request.url) {
            return Route::Static;
        }
        Route::Network
    }

    pub fn is_same_origin(&self, url: &Url) -> bool {
        url.origin() == self.origin
    }

    fn is_runtime(&self, url: &Url) -> bool {
        let path = url.path();
        self.is_runtime_host(url)
            || path.contains(FUNCTIONS_PATH)
            || (self.is_same_origin(url) && path.starts_with(API_PREFIX))
    }

    fn is_runtime_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.runtime_hosts
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{}", h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        let hosts = vec![
            "overpass-api.de".to_string(),
            "overpass.kumi.systems".to_string(),
        ];
        Router::new(&Url::parse("http://localhost:8888").unwrap(), &hosts)
    }

    fn get(url: &str) -> CacheRequest {
        CacheRequest::parse(url).unwrap()
    }

    #[test]
    fn test_non_get_passes_through() {
        let url = Url::parse("http://localhost:8888/api/places/add").unwrap();
        assert_eq!(router().classify(&CacheRequest::post(url, "{}")), Route::Passthrough);
    }

    #[test]
    fn test_navigation_wins_over_origin() {
        let request = CacheRequest::navigation(Url::parse("http://localhost:8888/app/").unwrap());
        assert_eq!(router().classify(&request), Route::Navigate);
    }

    #[test]
    fn test_runtime_calls() {
        let router = router();
        assert_eq!(
            router.classify(&get("https://overpass-api.de/api/interpreter")),
            Route::Runtime
        );
        assert_eq!(
            router.classify(&get("https://lz4.overpass-api.de/api/interpreter")),
            Route::Runtime
        );
        assert_eq!(
            router.classify(&get("https://OVERPASS.kumi.systems/api/interpreter")),
            Route::Runtime
        );
        assert_eq!(
            router.classify(&get("http://localhost:8888/api/places")),
            Route::Runtime
        );
        assert_eq!(
            router.classify(&get("https://elsewhere.example/.netlify/functions/places")),
            Route::Runtime
        );
    }

    #[test]
    fn test_api_prefix_needs_same_origin() {
        assert_eq!(
            router().classify(&get("https://elsewhere.example/api/places")),
            Route::Network
        );
    }

    #[test]
    fn test_static_and_network() {
        let router = router();
        assert_eq!(
            router.classify(&get("http://localhost:8888/app/assets/icon.png")),
            Route::Static
        );
        // different port, different origin
        assert_eq!(
            router.classify(&get("http://localhost:9999/app/assets/icon.png")),
            Route::Network
        );
        assert_eq!(
            router.classify(&get("https://tiles.example/1/2/3.png")),
            Route::Network
        );
    }

    #[test]
    fn test_lookalike_host_is_not_runtime() {
        assert_eq!(
            router().classify(&get("https://notoverpass-api.de/api/interpreter")),
            Route::Network
        );
    }
}
