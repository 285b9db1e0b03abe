//! Centralized error types for nearloo.
//!
//! This module provides a typed error hierarchy that:
//! - Separates input, remote, geolocation and directory failures
//! - Provides user-friendly messages suitable for UI display
//! - Preserves full error context for debugging/logging

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a UI-appropriate message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Search error: {0}")]
    Search(#[from] SearchError),

    #[error("Location error: {0}")]
    Geo(#[from] GeoError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for display in the UI.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Search(e) => e.user_message(),
            AppError::Geo(e) => e.user_message(),
            AppError::Directory(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Network(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// Whether retrying the same operation later can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Search(e) => e.is_retryable(),
            AppError::Geo(e) => e.is_retryable(),
            AppError::Directory(e) => e.is_retryable(),
            AppError::Network(_) => true,
            _ => false,
        }
    }
}

/// Proximity search errors.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Bad coordinates or radius, rejected before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Every mirror and every scheduled attempt failed.
    #[error("Remote search unavailable: {reason}")]
    RemoteUnavailable { reason: String },
}

impl SearchError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            SearchError::InvalidInput(_) => "Invalid position or radius. Check and try again.",
            SearchError::RemoteUnavailable { .. } => {
                "The map service is busy right now. Please try again in a moment."
            }
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, SearchError::RemoteUnavailable { .. })
    }
}

/// Geolocation errors, each with its own user guidance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location request timed out")]
    Timeout,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Geolocation requires a secure context, got origin {0}")]
    InsecureContext(String),

    #[error("Geolocation not supported")]
    Unsupported,
}

impl GeoError {
    pub fn user_message(&self) -> &'static str {
        match self {
            GeoError::PermissionDenied => {
                "Permission denied. Allow location access in your browser settings."
            }
            GeoError::Timeout => "GPS timed out. Move outdoors and try again.",
            GeoError::PositionUnavailable => "Position unavailable. Please try again shortly.",
            GeoError::InsecureContext(_) => "Location needs a secure (https) connection.",
            GeoError::Unsupported => "Location is not supported on this device.",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, GeoError::Timeout | GeoError::PositionUnavailable)
    }
}

/// A malformed CRUD payload, rejected at the boundary with a 400-equivalent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Place directory (CRUD collaborator) errors.
///
/// Non-fatal for the search flow: callers keep their prior state.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Directory server error: {status} - {message}")]
    Server { status: u16, message: String },
}

impl DirectoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            DirectoryError::Validation(_) => "Some fields are missing or invalid.",
            DirectoryError::NotFound(_) => "That place no longer exists.",
            DirectoryError::Storage(_) => "Saved places are unavailable right now.",
            DirectoryError::Network(e) => e.user_message(),
            DirectoryError::Server { status, .. } if *status >= 500 => {
                "The places service is experiencing issues. Please try again later."
            }
            DirectoryError::Server { .. } => "The places request failed. Please try again.",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Network(_) => true,
            DirectoryError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Clone, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::Timeout => "The request timed out. Please try again.",
            NetworkError::Status { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            NetworkError::Status { .. } => "The request failed. Please try again.",
            NetworkError::InvalidResponse(_) => {
                "Received an unexpected response. Please try again."
            }
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            NetworkError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::NotFound(_) => "Configuration not found. Using defaults.",
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_network_error(self) -> NetworkError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_network_error(self) -> NetworkError {
        if self.is_timeout() {
            NetworkError::Timeout
        } else if self.is_connect() {
            NetworkError::ConnectionFailed(self.to_string())
        } else if let Some(status) = self.status() {
            NetworkError::Status {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else if self.is_decode() {
            NetworkError::InvalidResponse(self.to_string())
        } else {
            NetworkError::ConnectionFailed(self.to_string())
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_directory_error(self) -> DirectoryError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_directory_error(self) -> DirectoryError {
        DirectoryError::Storage(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_errors_have_distinct_guidance() {
        let messages = [
            GeoError::PermissionDenied.user_message(),
            GeoError::Timeout.user_message(),
            GeoError::PositionUnavailable.user_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
        assert_ne!(messages[0], messages[2]);
    }

    #[test]
    fn test_remote_unavailable_is_retryable() {
        let err: AppError = SearchError::unavailable("HTTP 504").into();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("HTTP 504"));

        let err: AppError = SearchError::invalid_input("latitude is NaN").into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_validation_error_converts_to_directory_error() {
        let err: DirectoryError = ValidationError::new("id", "Missing id").into();
        assert!(matches!(err, DirectoryError::Validation(ref v) if v.field == "id"));
        assert_eq!(err.user_message(), "Some fields are missing or invalid.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_directory_server_errors() {
        let err = DirectoryError::Server {
            status: 503,
            message: "down".into(),
        };
        assert!(err.is_retryable());
        assert!(err.user_message().contains("experiencing issues"));

        let err = DirectoryError::Server {
            status: 404,
            message: "nope".into(),
        };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_user_message_propagation() {
        let app_err = AppError::Geo(GeoError::PermissionDenied);
        assert_eq!(
            app_err.user_message(),
            "Permission denied. Allow location access in your browser settings."
        );
    }
}
