//! Payload validation for directory writes.
//!
//! Payloads arrive as loose JSON; everything is checked here before it reaches a backend.

use chrono::{DateTime, Utc};
use nearloo_core::ValidationError;
use serde_json::Value;

use crate::record::{DirectoryPlace, Review};

/// Maximum characters kept from a review text.
pub const MAX_REVIEW_TEXT_CHARS: usize = 500;

pub const MIN_STARS: u8 = 1;
pub const MAX_STARS: u8 = 5;

fn required_string(object: &Value, field: &str) -> Result<String, ValidationError> {
    match object.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(ValidationError::new(field, format!("Missing {}", field))),
    }
}

fn finite_number(object: &Value, field: &str) -> Option<f64> {
    object
        .get(field)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}

/// Validate a `{place: {...}}` payload and build the record to store.
///
/// # Errors
/// Returns a `ValidationError` naming the first offending field.
pub fn parse_new_place(payload: &Value, now: DateTime<Utc>) -> Result<DirectoryPlace, ValidationError> {
    let place = match payload.get("place") {
        Some(place) if place.is_object() => place,
        _ => return Err(ValidationError::new("place", "Missing place")),
    };

    let id = required_string(place, "id")?;
    let name = required_string(place, "name")?;
    let address = required_string(place, "address")?;
    let date_iso = required_string(place, "dateISO")?;

    let (lat, lon) = match (finite_number(place, "lat"), finite_number(place, "lon")) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => return Err(ValidationError::new("lat", "Invalid coordinates")),
    };

    let photo_base64 = match place.get("photoBase64") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ValidationError::new("photoBase64", "Invalid photo")),
    };

    let notes = match place.get("notes") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(ValidationError::new("notes", "Invalid notes")),
    };

    Ok(DirectoryPlace {
        id,
        name: name.trim().to_string(),
        address: address.trim().to_string(),
        notes,
        date_iso,
        photo_base64,
        lat,
        lon,
        created_at: now,
    })
}

/// Validate a `{id}` delete payload.
pub fn parse_delete(payload: &Value) -> Result<String, ValidationError> {
    required_string(payload, "id")
}

/// Loose string coercion: strings as-is, numbers and booleans printed, anything else empty.
fn coerce_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    }
}

/// Loose numeric coercion; `None` when the value has no numeric reading.
fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        _ => None,
    }
}

/// Round and clamp to [1, 5]; anything non-numeric counts as 5.
pub fn clamp_stars(value: Option<&Value>) -> u8 {
    match coerce_number(value).filter(|n| n.is_finite()) {
        Some(n) => n.round().clamp(f64::from(MIN_STARS), f64::from(MAX_STARS)) as u8,
        None => MAX_STARS,
    }
}

/// Normalize a review payload.
///
/// `placeId` is required. Stars are clamped, the text is cut to 500 characters, and
/// `id`/`createdAt` default to values derived from `now`.
pub fn normalize_review(payload: &Value, now: DateTime<Utc>) -> Result<Review, ValidationError> {
    let place_id = coerce_string(payload.get("placeId"));
    if place_id.is_empty() {
        return Err(ValidationError::new("placeId", "placeId missing"));
    }

    let now_ms = now.timestamp_millis();
    let id = match coerce_string(payload.get("id")) {
        id if id.is_empty() => format!("r_{}", now_ms),
        id => id,
    };
    let created_at = coerce_number(payload.get("createdAt"))
        .filter(|n| n.is_finite() && *n != 0.0)
        .map(|n| n as i64)
        .unwrap_or(now_ms);

    Ok(Review {
        id,
        place_id,
        place_name: coerce_string(payload.get("placeName")),
        stars: clamp_stars(payload.get("stars")),
        text: coerce_string(payload.get("text"))
            .chars()
            .take(MAX_REVIEW_TEXT_CHARS)
            .collect(),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_place() -> Value {
        json!({"place": {
            "id": "p1", "name": " Bar Centrale ", "address": "Via Roma 1",
            "dateISO": "2026-03-01T10:00:00Z", "lat": 45.0, "lon": 9.0
        }})
    }

    #[test]
    fn test_valid_place() {
        let now = Utc::now();
        let place = parse_new_place(&valid_place(), now).unwrap();
        assert_eq!(place.name, "Bar Centrale");
        assert_eq!(place.notes, "");
        assert_eq!(place.photo_base64, "");
        assert_eq!(place.created_at, now);
    }

    #[test]
    fn test_missing_fields_rejected() {
        for field in ["id", "name", "address", "dateISO"] {
            let mut payload = valid_place();
            payload["place"][field] = json!("   ");
            let err = parse_new_place(&payload, Utc::now()).unwrap_err();
            assert_eq!(err.field, field);
            assert_eq!(err.message, format!("Missing {}", field));
        }

        let err = parse_new_place(&json!({}), Utc::now()).unwrap_err();
        assert_eq!(err.message, "Missing place");
    }

    #[test]
    fn test_invalid_coordinates_and_photo() {
        let mut payload = valid_place();
        payload["place"]["lat"] = json!("45.0");
        let err = parse_new_place(&payload, Utc::now()).unwrap_err();
        assert_eq!(err.message, "Invalid coordinates");

        let mut payload = valid_place();
        payload["place"]["photoBase64"] = json!(42);
        let err = parse_new_place(&payload, Utc::now()).unwrap_err();
        assert_eq!(err.message, "Invalid photo");

        let mut payload = valid_place();
        payload["place"]["photoBase64"] = Value::Null;
        assert!(parse_new_place(&payload, Utc::now()).is_ok());
    }

    #[test]
    fn test_delete_requires_id() {
        assert_eq!(parse_delete(&json!({"id": "p1"})).unwrap(), "p1");
        assert!(parse_delete(&json!({"id": ""})).is_err());
        assert!(parse_delete(&json!({})).is_err());
    }

    #[test]
    fn test_clamp_stars() {
        assert_eq!(clamp_stars(Some(&json!(3.6))), 4);
        assert_eq!(clamp_stars(Some(&json!(9))), 5);
        assert_eq!(clamp_stars(Some(&json!(-2))), 1);
        assert_eq!(clamp_stars(Some(&json!("2"))), 2);
        assert_eq!(clamp_stars(Some(&json!("great"))), 5);
        assert_eq!(clamp_stars(Some(&json!({"n": 1}))), 5);
        assert_eq!(clamp_stars(None), 5);
    }

    #[test]
    fn test_normalize_review() {
        let now = Utc::now();
        let review = normalize_review(
            &json!({"placeId": "osm:node/1", "stars": 4, "text": "x".repeat(600)}),
            now,
        )
        .unwrap();

        assert_eq!(review.id, format!("r_{}", now.timestamp_millis()));
        assert_eq!(review.place_id, "osm:node/1");
        assert_eq!(review.stars, 4);
        assert_eq!(review.text.chars().count(), MAX_REVIEW_TEXT_CHARS);
        assert_eq!(review.created_at, now.timestamp_millis());

        let review = normalize_review(
            &json!({"placeId": "p", "id": "r_1", "createdAt": 1700000000000_i64}),
            now,
        )
        .unwrap();
        assert_eq!(review.id, "r_1");
        assert_eq!(review.created_at, 1_700_000_000_000);
        assert_eq!(review.stars, 5);
    }

    #[test]
    fn test_review_requires_place_id() {
        let err = normalize_review(&json!({"stars": 3}), Utc::now()).unwrap_err();
        assert_eq!(err.field, "placeId");
    }
}
