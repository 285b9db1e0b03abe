//! Directory records and the JSON envelope shared by the endpoints and the HTTP client.

use chrono::{DateTime, Utc};
use nearloo_search::{Attributes, Coordinate, Place, PlaceKind};
use serde::{Deserialize, Serialize};

/// Name shown for a stored place whose name is blank.
pub const DEFAULT_PLACE_NAME: &str = "Added place";

/// A user-submitted place as stored by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryPlace {
    pub id: String,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub notes: String,
    #[serde(rename = "dateISO")]
    pub date_iso: String,
    /// Empty when the place has no photo.
    #[serde(default)]
    pub photo_base64: String,
    pub lat: f64,
    pub lon: f64,
    pub created_at: DateTime<Utc>,
}

impl DirectoryPlace {
    /// View of this record for the ranking core.
    pub fn to_place(&self) -> Place {
        let name = match self.name.trim() {
            "" => DEFAULT_PLACE_NAME.to_string(),
            name => name.to_string(),
        };

        Place {
            id: self.id.clone(),
            name,
            coordinate: Coordinate::new(self.lat, self.lon),
            kind: PlaceKind::UserSubmitted {
                photo_base64: non_empty(&self.photo_base64),
                date_iso: non_empty(&self.date_iso),
            },
            attributes: Attributes {
                address: non_empty(&self.address),
                notes: non_empty(&self.notes),
                ..Default::default()
            },
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// A star rating with optional text, attached to a place id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub place_id: String,
    #[serde(default)]
    pub place_name: String,
    /// 1 to 5.
    pub stars: u8,
    #[serde(default)]
    pub text: String,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// Mean star rating of `reviews`, `None` when there are none.
pub fn average_stars(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: u32 = reviews.iter().map(|r| u32::from(r.stars)).sum();
    Some(f64::from(sum) / reviews.len() as f64)
}

/// `{ok, items}` on success, `{ok: false, error}` on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<T>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn items(items: Vec<T>) -> Self {
        Self {
            ok: true,
            items: Some(items),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            items: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> DirectoryPlace {
        DirectoryPlace {
            id: "p1".to_string(),
            name: "  ".to_string(),
            address: "Via Roma 1".to_string(),
            notes: String::new(),
            date_iso: "2026-03-01".to_string(),
            photo_base64: String::new(),
            lat: 45.0,
            lon: 9.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_place_wire_names() {
        let json = serde_json::to_value(stored()).unwrap();
        assert!(json.get("dateISO").is_some());
        assert!(json.get("photoBase64").is_some());
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_to_place_defaults() {
        let place = stored().to_place();
        assert_eq!(place.name, DEFAULT_PLACE_NAME);
        assert_eq!(place.attributes.address.as_deref(), Some("Via Roma 1"));
        assert_eq!(place.attributes.notes, None);
        assert_eq!(
            place.kind,
            PlaceKind::UserSubmitted {
                photo_base64: None,
                date_iso: Some("2026-03-01".to_string()),
            }
        );
    }

    fn review(stars: u8) -> Review {
        Review {
            id: format!("r{}", stars),
            place_id: "p1".to_string(),
            place_name: String::new(),
            stars,
            text: String::new(),
            created_at: 0,
        }
    }

    #[test]
    fn test_average_stars() {
        assert_eq!(average_stars(&[]), None);
        assert_eq!(average_stars(&[review(4)]), Some(4.0));
        assert_eq!(average_stars(&[review(5), review(4), review(2)]), Some(11.0 / 3.0));
    }

    #[test]
    fn test_envelope_parses_without_optional_fields() {
        let failed: ApiResponse<Review> =
            serde_json::from_str(r#"{"ok":false,"error":"Missing id"}"#).unwrap();
        assert_eq!(failed.items, None);
        assert_eq!(failed.error.as_deref(), Some("Missing id"));

        let listed: ApiResponse<DirectoryPlace> = serde_json::from_str(r#"{"ok":true}"#).unwrap();
        assert!(listed.ok);
        assert_eq!(listed.items, None);
    }

    #[test]
    fn test_error_envelope_has_no_items() {
        let json = serde_json::to_string(&ApiResponse::<Review>::error("Missing id")).unwrap();
        assert_eq!(json, r#"{"ok":false,"error":"Missing id"}"#);
    }
}
