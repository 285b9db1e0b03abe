use std::time::Duration;

use nearloo_core::SearchError;
use serde::{Deserialize, Serialize};

/// Smallest search radius accepted by the remote service.
pub const MIN_RADIUS_METERS: f64 = 50.0;
/// Largest search radius accepted by the remote service.
pub const MAX_RADIUS_METERS: f64 = 5000.0;
/// Radius cap applied in emergency mode.
pub const EMERGENCY_RADIUS_METERS: f64 = 300.0;

/// Geographic position in decimal degrees.
///
/// Fields are private so a coordinate cannot change once read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(rename = "lat")]
    latitude: f64,
    #[serde(rename = "lon")]
    longitude: f64,
}

impl Coordinate {
    /// Build a coordinate without range checks.
    ///
    /// Non-finite values are allowed here and surface as a `NaN` distance.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self, SearchError> {
        let coordinate = Self::new(latitude, longitude);
        if coordinate.is_valid() {
            Ok(coordinate)
        } else {
            Err(SearchError::invalid_input(format!(
                "invalid coordinates ({}, {})",
                latitude, longitude
            )))
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Finite and within [-90, 90] x [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Where a place came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaceSource {
    #[serde(rename = "remote-confirmed")]
    RemoteConfirmed,
    #[serde(rename = "remote-likely")]
    RemoteLikely,
    #[serde(rename = "user-submitted")]
    UserSubmitted,
}

impl PlaceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteConfirmed => "remote-confirmed",
            Self::RemoteLikely => "remote-likely",
            Self::UserSubmitted => "user-submitted",
        }
    }
}

impl std::fmt::Display for PlaceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific data of a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source")]
pub enum PlaceKind {
    /// Directly tagged as a public toilet.
    #[serde(rename = "remote-confirmed")]
    Confirmed,

    /// Related category that plausibly has a toilet.
    #[serde(rename = "remote-likely")]
    Likely { category: String },

    /// Added by a user through the place directory.
    #[serde(rename = "user-submitted")]
    UserSubmitted {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        photo_base64: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_iso: Option<String>,
    },
}

/// Optional descriptive tags, kept as reported by the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheelchair: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changing_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unisex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A candidate toilet, whatever its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub coordinate: Coordinate,
    pub kind: PlaceKind,
    #[serde(default)]
    pub attributes: Attributes,
}

const LIKELY_SUFFIX: &str = ":likely";

impl Place {
    pub fn source(&self) -> PlaceSource {
        match self.kind {
            PlaceKind::Confirmed => PlaceSource::RemoteConfirmed,
            PlaceKind::Likely { .. } => PlaceSource::RemoteLikely,
            PlaceKind::UserSubmitted { .. } => PlaceSource::UserSubmitted,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self.kind, PlaceKind::Confirmed)
    }

    pub fn is_likely(&self) -> bool {
        matches!(self.kind, PlaceKind::Likely { .. })
    }

    /// Identity of the underlying feature, shared by its confirmed and likely entries.
    pub fn base_identity(&self) -> &str {
        match self.kind {
            PlaceKind::Likely { .. } => self.id.strip_suffix(LIKELY_SUFFIX).unwrap_or(&self.id),
            _ => &self.id,
        }
    }

    /// Identity given to a remote feature: `osm:<type>/<id>`, plus `:likely` for likely places.
    pub fn remote_id(element_type: &str, element_id: i64, likely: bool) -> String {
        if likely {
            format!("osm:{}/{}{}", element_type, element_id, LIKELY_SUFFIX)
        } else {
            format!("osm:{}/{}", element_type, element_id)
        }
    }
}

/// Validated input of one proximity search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SearchRequest {
    coordinate: Coordinate,
    radius_meters: f64,
    include_likely: bool,
}

impl SearchRequest {
    /// Validate the coordinate and clamp the radius to [50, 5000].
    ///
    /// # Errors
    /// Returns `SearchError::InvalidInput` for non-finite or out-of-range coordinates.
    pub fn new(
        coordinate: Coordinate,
        radius_meters: f64,
        include_likely: bool,
    ) -> Result<Self, SearchError> {
        if !coordinate.is_valid() {
            return Err(SearchError::invalid_input(format!(
                "invalid coordinates ({}, {})",
                coordinate.latitude(),
                coordinate.longitude()
            )));
        }

        Ok(Self {
            coordinate,
            radius_meters: clamp_radius(radius_meters),
            include_likely,
        })
    }

    /// Emergency mode: never search further than 300 m.
    pub fn with_emergency(mut self, emergency: bool) -> Self {
        if emergency {
            self.radius_meters = self.radius_meters.min(EMERGENCY_RADIUS_METERS);
        }
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn include_likely(&self) -> bool {
        self.include_likely
    }
}

/// Clamp a radius to the accepted range; non-finite values fall back to the minimum.
pub fn clamp_radius(radius_meters: f64) -> f64 {
    if !radius_meters.is_finite() {
        return MIN_RADIUS_METERS;
    }
    radius_meters.clamp(MIN_RADIUS_METERS, MAX_RADIUS_METERS)
}

/// A place with its derived distance and utility score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlace {
    pub place: Place,
    pub distance_meters: f64,
    pub utility: f64,
}

/// Places ordered by distance, then utility, then name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedList {
    pub entries: Vec<RankedPlace>,
}

impl RankedList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nearest(&self) -> Option<&RankedPlace> {
        self.entries.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedPlace> {
        self.entries.iter()
    }

    /// First `n` entries (e.g. 8 in emergency mode, 30 otherwise).
    pub fn top(&self, n: usize) -> &[RankedPlace] {
        &self.entries[..n.min(self.entries.len())]
    }
}

impl IntoIterator for RankedList {
    type Item = RankedPlace;
    type IntoIter = std::vec::IntoIter<RankedPlace>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A position fix reported by a geolocation provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coordinate: Coordinate,
    pub accuracy_meters: Option<f64>,
}

/// Options for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub timeout: Duration,
    pub high_accuracy: bool,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(12_000),
            high_accuracy: true,
        }
    }
}
