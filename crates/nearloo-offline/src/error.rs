//! Offline cache error types.

use nearloo_core::NetworkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Nothing cached for {0}")]
    Unavailable(String),

    #[error("Refresh failed: {0}")]
    Refresh(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl OfflineError {
    /// User-friendly error message for UI display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::Unavailable(_) => "You are offline and this page is not saved yet.".to_string(),
            Self::Refresh(msg) => format!("Could not refresh: {}", msg),
            Self::Cache(_) => "Local cache error".to_string(),
            Self::InvalidUrl(url) => format!("Invalid address: {}", url),
        }
    }

    /// Whether trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Unavailable(_) | Self::Refresh(_))
    }
}
