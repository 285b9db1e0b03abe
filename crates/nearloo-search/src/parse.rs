//! Overpass response parsing.
//!
//! Features are parsed one by one; a malformed feature is skipped without failing the batch.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::merge::dedupe;
use crate::query::{likely_label, QueryShape};
use crate::types::{Attributes, Coordinate, Place, PlaceKind};

/// Name given to a confirmed toilet without a `name` tag.
pub const DEFAULT_TOILET_NAME: &str = "Public toilet";

/// Raw Overpass response body.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    element_type: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<RawCenter>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawCenter {
    lat: Option<f64>,
    lon: Option<f64>,
}

impl RawElement {
    /// Direct position for nodes, `center` for ways and relations.
    fn center(&self) -> Option<Coordinate> {
        let lat = self.lat.or_else(|| self.center.as_ref().and_then(|c| c.lat))?;
        let lon = self.lon.or_else(|| self.center.as_ref().and_then(|c| c.lon))?;
        Coordinate::validated(lat, lon).ok()
    }

    fn tag(&self, key: &str) -> Option<String> {
        self.tags
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn classify(&self, shape: QueryShape) -> Option<PlaceKind> {
        if self.tags.get("amenity").map(|v| v.trim()) == Some("toilets") {
            return Some(PlaceKind::Confirmed);
        }
        if shape == QueryShape::WithLikely {
            return likely_label(&self.tags).map(|label| PlaceKind::Likely {
                category: label.to_string(),
            });
        }
        None
    }

    fn address(&self) -> Option<String> {
        if let Some(full) = self.tag("addr:full") {
            return Some(full);
        }
        let street = self.tag("addr:street")?;
        match self.tag("addr:housenumber") {
            Some(number) => Some(format!("{} {}", street, number)),
            None => Some(street),
        }
    }

    fn attributes(&self) -> Attributes {
        Attributes {
            opening_hours: self.tag("opening_hours"),
            fee: self.tag("fee"),
            access: self.tag("access"),
            wheelchair: self
                .tag("wheelchair")
                .or_else(|| self.tag("toilets:wheelchair")),
            changing_table: self.tag("changing_table"),
            unisex: self.tag("unisex"),
            address: self.address(),
            notes: self.tag("description"),
        }
    }

    fn into_place(self, shape: QueryShape) -> Option<Place> {
        let coordinate = self.center()?;
        let kind = self.classify(shape)?;

        let name = match &kind {
            PlaceKind::Likely { category } => self.tag("name").unwrap_or_else(|| category.clone()),
            _ => self
                .tag("name")
                .unwrap_or_else(|| DEFAULT_TOILET_NAME.to_string()),
        };
        let id = Place::remote_id(
            &self.element_type,
            self.id,
            matches!(kind, PlaceKind::Likely { .. }),
        );

        Some(Place {
            id,
            name,
            coordinate,
            attributes: self.attributes(),
            kind,
        })
    }
}

/// Turn raw features into places, deduplicated by identity in first-seen order.
pub fn parse_elements(elements: &[Value], shape: QueryShape) -> Vec<Place> {
    let places = elements
        .iter()
        .filter_map(|value| match RawElement::deserialize(value) {
            Ok(element) => element.into_place(shape),
            Err(e) => {
                tracing::trace!("Skipping malformed feature: {}", e);
                None
            }
        })
        .collect();

    dedupe(places)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PlaceSource;
    use serde_json::json;

    #[test]
    fn test_bare_toilet_node() {
        let elements = vec![json!({
            "type": "node", "id": 1, "lat": 45.001, "lon": 9.001,
            "tags": {"amenity": "toilets"}
        })];
        let places = parse_elements(&elements, QueryShape::ToiletsOnly);

        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, "osm:node/1");
        assert_eq!(places[0].name, DEFAULT_TOILET_NAME);
        assert_eq!(places[0].source(), PlaceSource::RemoteConfirmed);
        assert_eq!(places[0].attributes, Attributes::default());
    }

    #[test]
    fn test_way_uses_center() {
        let elements = vec![json!({
            "type": "way", "id": 77, "center": {"lat": 45.2, "lon": 9.2},
            "tags": {"amenity": "toilets", "name": "Giardini", "fee": "no",
                     "addr:street": "Via Palestro", "addr:housenumber": "16",
                     "toilets:wheelchair": "yes"}
        })];
        let places = parse_elements(&elements, QueryShape::ToiletsOnly);

        assert_eq!(places.len(), 1);
        let place = &places[0];
        assert_eq!(place.id, "osm:way/77");
        assert_eq!(place.name, "Giardini");
        assert_eq!(place.coordinate, Coordinate::new(45.2, 9.2));
        assert_eq!(place.attributes.fee.as_deref(), Some("no"));
        assert_eq!(place.attributes.wheelchair.as_deref(), Some("yes"));
        assert_eq!(place.attributes.address.as_deref(), Some("Via Palestro 16"));
    }

    #[test]
    fn test_features_without_position_or_malformed_are_skipped() {
        let elements = vec![
            json!({"type": "relation", "id": 5, "tags": {"amenity": "toilets"}}),
            json!({"type": "node", "id": 6, "lat": "north", "lon": 9.0, "tags": {"amenity": "toilets"}}),
            json!({"type": "node", "id": 7, "lat": 95.0, "lon": 9.0, "tags": {"amenity": "toilets"}}),
            json!("garbage"),
            json!({"type": "node", "id": 8, "lat": 45.0, "lon": 9.0, "tags": {"amenity": "toilets"}}),
        ];
        let places = parse_elements(&elements, QueryShape::ToiletsOnly);
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].id, "osm:node/8");
    }

    #[test]
    fn test_same_feature_twice_yields_one_place() {
        let element = json!({
            "type": "node", "id": 9, "lat": 45.0, "lon": 9.0,
            "tags": {"amenity": "toilets", "name": "First"}
        });
        let places = parse_elements(&[element.clone(), element], QueryShape::WithLikely);
        assert_eq!(places.len(), 1);
    }

    #[test]
    fn test_likely_features_only_in_likely_shape() {
        let elements = vec![
            json!({"type": "node", "id": 10, "lat": 45.0, "lon": 9.0,
                   "tags": {"amenity": "cafe", "name": "Bar Magenta"}}),
            json!({"type": "node", "id": 11, "lat": 45.0, "lon": 9.0,
                   "tags": {"shop": "supermarket"}}),
            json!({"type": "node", "id": 12, "lat": 45.0, "lon": 9.0,
                   "tags": {"amenity": "bench"}}),
        ];

        let likely = parse_elements(&elements, QueryShape::WithLikely);
        assert_eq!(likely.len(), 2);
        assert_eq!(likely[0].id, "osm:node/10:likely");
        assert_eq!(likely[0].name, "Bar Magenta");
        assert_eq!(
            likely[0].kind,
            PlaceKind::Likely {
                category: "Café".to_string()
            }
        );
        assert_eq!(likely[1].name, "Supermarket");

        let confirmed_only = parse_elements(&elements, QueryShape::ToiletsOnly);
        assert!(confirmed_only.is_empty());
    }
}
