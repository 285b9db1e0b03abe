//! Overpass QL query construction.

use std::collections::HashMap;
use std::fmt::Write;

use crate::types::SearchRequest;

/// Which features a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryShape {
    /// Public toilets plus the likely categories.
    WithLikely,
    /// Public toilets only.
    ToiletsOnly,
}

/// A feature category that plausibly has a usable toilet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikelyCategory {
    pub key: &'static str,
    pub value: &'static str,
    pub label: &'static str,
}

pub const LIKELY_CATEGORIES: &[LikelyCategory] = &[
    LikelyCategory { key: "amenity", value: "bar", label: "Bar" },
    LikelyCategory { key: "amenity", value: "cafe", label: "Café" },
    LikelyCategory { key: "amenity", value: "restaurant", label: "Restaurant" },
    LikelyCategory { key: "amenity", value: "fast_food", label: "Fast food" },
    LikelyCategory { key: "amenity", value: "bus_station", label: "Bus station" },
    LikelyCategory { key: "railway", value: "station", label: "Train station" },
    LikelyCategory { key: "aeroway", value: "aerodrome", label: "Airport" },
    LikelyCategory { key: "shop", value: "mall", label: "Shopping mall" },
    LikelyCategory { key: "shop", value: "supermarket", label: "Supermarket" },
];

/// Human label of the first likely category matching these tags.
pub fn likely_label(tags: &HashMap<String, String>) -> Option<&'static str> {
    LIKELY_CATEGORIES
        .iter()
        .find(|c| tags.get(c.key).map(|v| v.trim()) == Some(c.value))
        .map(|c| c.label)
}

/// Build the query for one attempt.
///
/// `timeout_secs` is the server-declared limit; the client enforces its own hard timeout.
pub fn build_query(shape: QueryShape, request: &SearchRequest, timeout_secs: u32) -> String {
    let around = format!(
        "around:{},{},{}",
        request.radius_meters(),
        request.coordinate().latitude(),
        request.coordinate().longitude()
    );

    let mut query = format!("[out:json][timeout:{}];\n(\n", timeout_secs);
    let _ = writeln!(query, "  nwr({})[\"amenity\"=\"toilets\"];", around);

    if shape == QueryShape::WithLikely {
        for category in LIKELY_CATEGORIES {
            let _ = writeln!(
                query,
                "  nwr({})[\"{}\"=\"{}\"];",
                around, category.key, category.value
            );
        }
    }

    query.push_str(");\nout center tags qt;\n");
    query
}
