//! Geolocation contract.
//!
//! Platforms plug in a [`GeoProvider`]; [`locate`] applies the secure-context check,
//! the timeout and coordinate validation around it.

use std::future::Future;

use nearloo_core::GeoError;
use url::Url;

use crate::types::{Coordinate, Position, PositionOptions};

/// Source of the device position.
pub trait GeoProvider: Send + Sync {
    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> impl Future<Output = Result<Position, GeoError>> + Send;
}

/// Provider answering with a fixed coordinate (CLI flags, tests).
///
/// [`FixedPosition::unsupported`] stands for a device without positioning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedPosition {
    position: Option<Position>,
}

impl FixedPosition {
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            position: Some(Position {
                coordinate,
                accuracy_meters: None,
            }),
        }
    }

    pub fn unsupported() -> Self {
        Self { position: None }
    }

    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        if let Some(position) = &mut self.position {
            position.accuracy_meters = Some(accuracy_meters);
        }
        self
    }
}

impl GeoProvider for FixedPosition {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, GeoError> {
        self.position.ok_or(GeoError::Unsupported)
    }
}

/// https, or plain http on the local machine.
pub fn is_secure_origin(origin: &Url) -> bool {
    match origin.scheme() {
        "https" => true,
        "http" => matches!(origin.host_str(), Some("localhost") | Some("127.0.0.1")),
        _ => false,
    }
}

/// Ask `provider` for a position fix.
///
/// # Errors
/// - `InsecureContext` before the provider is called when `origin` is not secure
/// - `Timeout` when the provider does not answer within `options.timeout`
/// - `PositionUnavailable` when the reported coordinate is not usable
pub async fn locate<P: GeoProvider>(
    provider: &P,
    origin: &Url,
    options: &PositionOptions,
) -> Result<Position, GeoError> {
    if !is_secure_origin(origin) {
        tracing::warn!("Refusing geolocation from insecure origin {}", origin);
        return Err(GeoError::InsecureContext(origin.to_string()));
    }

    let position = tokio::time::timeout(options.timeout, provider.current_position(options))
        .await
        .map_err(|_| GeoError::Timeout)??;

    if !position.coordinate.is_valid() {
        tracing::debug!("Provider reported unusable coordinate {:?}", position.coordinate);
        return Err(GeoError::PositionUnavailable);
    }

    Ok(position)
}
