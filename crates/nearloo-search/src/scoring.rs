//! Utility score: how practical a place is to use, independent of distance.
//!
//! Only a tie-break after distance; it never reorders places at different distances.

use crate::types::{Place, PlaceKind};

pub const MAX_SCORE: f64 = 6.0;

/// Names that carry no information beyond "there is a toilet here".
const GENERIC_NAMES: &[&str] = &["wc", "toilet", "toilets", "public toilets", "wc / toilet"];

fn norm(value: Option<&str>) -> String {
    value.map(|v| v.trim().to_lowercase()).unwrap_or_default()
}

fn is_yes(value: &str) -> bool {
    matches!(value, "yes" | "true" | "1")
}

fn is_no(value: &str) -> bool {
    matches!(value, "no" | "false" | "0")
}

/// Score in [0, 6]. All-missing attributes score 0.
pub fn score(place: &Place) -> f64 {
    let attrs = &place.attributes;
    let mut score: f64 = 0.0;

    match place.kind {
        PlaceKind::Confirmed => score += 3.0,
        PlaceKind::Likely { .. } | PlaceKind::UserSubmitted { .. } => {}
    }

    // customers-only still counts: usable, may need a purchase
    match norm(attrs.access.as_deref()).as_str() {
        "public" | "yes" => score += 1.2,
        "customers" => score += 0.3,
        "private" | "no" => score -= 0.8,
        _ => {}
    }

    let fee = norm(attrs.fee.as_deref());
    if is_no(&fee) {
        score += 1.0;
    } else if is_yes(&fee) {
        score -= 0.4;
    }

    if !norm(attrs.opening_hours.as_deref()).is_empty() {
        score += 0.5;
    }

    match norm(attrs.wheelchair.as_deref()).as_str() {
        "yes" => score += 0.6,
        "no" => score -= 0.2,
        _ => {}
    }

    if is_yes(&norm(attrs.changing_table.as_deref())) {
        score += 0.25;
    }
    if is_yes(&norm(attrs.unisex.as_deref())) {
        score += 0.15;
    }

    if !norm(attrs.address.as_deref()).is_empty() {
        score += 0.25;
    }

    let name = norm(Some(&place.name));
    if name.is_empty() || GENERIC_NAMES.contains(&name.as_str()) {
        score -= 0.1;
    }

    if !score.is_finite() {
        score = 0.0;
    }
    score.clamp(0.0, MAX_SCORE)
}
