//! Great-circle distance (haversine).

use crate::types::Coordinate;

pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Distance in meters between two coordinates.
///
/// Symmetric and non-negative. Non-finite inputs yield `NaN`; callers filter those out
/// before sorting.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let d_lat = (b.latitude() - a.latitude()).to_radians();
    let d_lon = (b.longitude() - a.longitude()).to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lon = (d_lon / 2.0).sin();

    let h = sin_d_lat * sin_d_lat + lat1.cos() * lat2.cos() * sin_d_lon * sin_d_lon;
    if h.is_nan() {
        return f64::NAN;
    }
    // rounding can push h marginally past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Human-readable distance: "350 m", "1.2 km", "12 km"; empty for non-finite input.
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() {
        return String::new();
    }
    if meters < 1000.0 {
        return format!("{} m", meters.round());
    }
    let km = meters / 1000.0;
    if km < 10.0 {
        format!("{:.1} km", km)
    } else {
        format!("{:.0} km", km)
    }
}
