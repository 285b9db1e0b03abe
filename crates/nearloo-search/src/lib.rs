//! Proximity search for public toilets.
//!
//! Queries Overpass mirrors with retry and fallback, scores and ranks the results, and
//! merges them with user-submitted places.

pub mod client;
pub mod distance;
pub mod geo;
pub mod merge;
pub mod parse;
pub mod query;
pub mod retry;
pub mod schedule;
pub mod scoring;
pub mod types;

pub use client::{RemoteSearchClient, SearchOptions};
pub use distance::{distance, format_distance};
pub use geo::{is_secure_origin, locate, FixedPosition, GeoProvider};
pub use merge::merge;
pub use schedule::{AttemptSchedule, SearchPlan};
pub use scoring::score;
pub use types::*;
