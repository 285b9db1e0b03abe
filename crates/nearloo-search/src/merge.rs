//! Result merging: distance annotation, deduplication and ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::distance::distance;
use crate::scoring::score;
use crate::types::{Coordinate, Place, RankedList, RankedPlace};

trait AsPlace {
    fn place(&self) -> &Place;
}

impl AsPlace for Place {
    fn place(&self) -> &Place {
        self
    }
}

impl AsPlace for RankedPlace {
    fn place(&self) -> &Place {
        &self.place
    }
}

/// Keep the first entry per base identity; a confirmed entry replaces an earlier likely one
/// in its slot.
fn dedupe_by_identity<T: AsPlace>(items: Vec<T>) -> Vec<T> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<T> = Vec::with_capacity(items.len());

    for item in items {
        let identity = item.place().base_identity().to_string();
        match slots.get(&identity) {
            Some(&slot) => {
                if out[slot].place().is_likely() && item.place().is_confirmed() {
                    out[slot] = item;
                }
            }
            None => {
                slots.insert(identity, out.len());
                out.push(item);
            }
        }
    }

    out
}

/// Collapse duplicate identities in first-seen order.
pub fn dedupe(places: Vec<Place>) -> Vec<Place> {
    dedupe_by_identity(places)
}

fn compare(a: &RankedPlace, b: &RankedPlace) -> Ordering {
    a.distance_meters
        .total_cmp(&b.distance_meters)
        .then_with(|| b.utility.total_cmp(&a.utility))
        .then_with(|| {
            a.place
                .name
                .to_lowercase()
                .cmp(&b.place.name.to_lowercase())
        })
}

/// Rank remote and directory places around `user`.
///
/// Places whose distance is not finite are dropped. Inputs are not modified.
pub fn merge(user: Coordinate, remote: &[Place], directory: &[Place]) -> RankedList {
    let annotated: Vec<RankedPlace> = remote
        .iter()
        .chain(directory.iter())
        .filter_map(|place| {
            let distance_meters = distance(user, place.coordinate);
            if !distance_meters.is_finite() {
                return None;
            }
            Some(RankedPlace {
                place: place.clone(),
                distance_meters,
                utility: score(place),
            })
        })
        .collect();

    let mut entries = dedupe_by_identity(annotated);
    entries.sort_by(compare);

    RankedList { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attributes, PlaceKind};

    fn user() -> Coordinate {
        Coordinate::new(45.0, 9.0)
    }

    fn confirmed(id: &str, name: &str, lat: f64, lon: f64) -> Place {
        Place {
            id: id.to_string(),
            name: name.to_string(),
            coordinate: Coordinate::new(lat, lon),
            kind: PlaceKind::Confirmed,
            attributes: Attributes::default(),
        }
    }

    fn likely(id: &str, name: &str, lat: f64, lon: f64) -> Place {
        Place {
            kind: PlaceKind::Likely {
                category: "Bar".to_string(),
            },
            ..confirmed(id, name, lat, lon)
        }
    }

    fn submitted(id: &str, name: &str, lat: f64, lon: f64) -> Place {
        Place {
            kind: PlaceKind::UserSubmitted {
                photo_base64: None,
                date_iso: None,
            },
            ..confirmed(id, name, lat, lon)
        }
    }

    fn is_ordered(list: &RankedList) -> bool {
        list.entries
            .windows(2)
            .all(|w| compare(&w[0], &w[1]) != Ordering::Greater)
    }

    #[test]
    fn test_sorted_by_distance() {
        let remote = vec![
            confirmed("osm:node/1", "Far", 45.01, 9.0),
            confirmed("osm:node/2", "Near", 45.001, 9.0),
        ];
        let directory = vec![submitted("u1", "Middle", 45.005, 9.0)];

        let list = merge(user(), &remote, &directory);
        let names: Vec<_> = list.iter().map(|r| r.place.name.as_str()).collect();
        assert_eq!(names, vec!["Near", "Middle", "Far"]);
        assert!(list.nearest().unwrap().distance_meters > 0.0);
        assert!(is_ordered(&list));
    }

    #[test]
    fn test_ties_broken_by_score_then_name() {
        let remote = vec![
            submitted("u1", "beta", 45.001, 9.0),
            confirmed("osm:node/1", "Zeta", 45.001, 9.0),
            submitted("u2", "Alpha", 45.001, 9.0),
        ];

        let list = merge(user(), &remote, &[]);
        let names: Vec<_> = list.iter().map(|r| r.place.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "beta"]);
    }

    #[test]
    fn test_non_finite_places_dropped() {
        let remote = vec![
            confirmed("osm:node/1", "Broken", f64::NAN, 9.0),
            confirmed("osm:node/2", "Fine", 45.001, 9.0),
        ];
        let list = merge(user(), &remote, &[]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries[0].place.name, "Fine");
    }

    #[test]
    fn test_confirmed_replaces_likely_twin() {
        let remote = vec![
            likely("osm:node/5:likely", "Bar Sport", 45.001, 9.0),
            confirmed("osm:node/5", "Bar Sport WC", 45.001, 9.0),
            confirmed("osm:node/5", "Duplicate", 45.001, 9.0),
        ];

        let list = merge(user(), &remote, &[]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries[0].place.name, "Bar Sport WC");
        assert!(list.entries[0].place.is_confirmed());
    }

    #[test]
    fn test_likely_after_confirmed_is_dropped() {
        let places = dedupe(vec![
            confirmed("osm:way/9", "WC", 45.0, 9.0),
            likely("osm:way/9:likely", "Cafe", 45.0, 9.0),
        ]);
        assert_eq!(places.len(), 1);
        assert!(places[0].is_confirmed());
    }

    fn permutations(places: &[Place]) -> Vec<Vec<Place>> {
        if places.len() <= 1 {
            return vec![places.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..places.len() {
            let mut rest = places.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_order_holds_for_every_arrangement() {
        let tables: Vec<Vec<Place>> = vec![
            // same spot: score, then name decides
            vec![
                submitted("u1", "beta", 45.001, 9.0),
                confirmed("osm:node/1", "Zeta", 45.001, 9.0),
                submitted("u2", "Alpha", 45.001, 9.0),
                likely("osm:node/2:likely", "Cafe", 45.001, 9.0),
            ],
            // mixed distances with one tie
            vec![
                confirmed("osm:node/3", "Far", 45.01, 9.0),
                submitted("u3", "Near", 45.0005, 9.0),
                confirmed("osm:node/4", "Middle", 45.003, 9.0),
                likely("osm:node/5:likely", "Also middle", 45.003, 9.0),
                confirmed("osm:node/6", "Behind", 44.999, 9.0),
            ],
        ];

        for table in tables {
            let expected: Vec<String> = merge(user(), &table, &[])
                .iter()
                .map(|r| r.place.id.clone())
                .collect();
            assert_eq!(expected.len(), table.len());

            for arrangement in permutations(&table) {
                for split in 0..=arrangement.len() {
                    let (remote, directory) = arrangement.split_at(split);
                    let list = merge(user(), remote, directory);
                    assert!(is_ordered(&list), "unordered for {:?}", arrangement);
                    let ids: Vec<String> = list.iter().map(|r| r.place.id.clone()).collect();
                    assert_eq!(ids, expected);
                }
            }
        }
    }

    #[test]
    fn test_merge_is_idempotent_and_pure() {
        let remote = vec![
            confirmed("osm:node/1", "A", 45.002, 9.0),
            likely("osm:node/2:likely", "B", 45.002, 9.0),
        ];
        let directory = vec![submitted("u1", "C", 45.0005, 9.0)];
        let before = remote.clone();

        let first = merge(user(), &remote, &directory);
        let second = merge(user(), &remote, &directory);
        assert_eq!(first, second);
        assert_eq!(remote, before);
    }
}
