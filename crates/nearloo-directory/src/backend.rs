//! Directory storage backend trait.
//!
//! This module defines the `DirectoryBackend` trait that abstracts over the local
//! SQLite store. The async `PlaceDirectory` handle wraps it for shared use.

use nearloo_core::DirectoryError;

use crate::record::{DirectoryPlace, Review};

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Synchronous CRUD over places and reviews.
///
/// Implementations don't need to be Sync; `PlaceDirectory` guards them with a mutex.
/// Every write returns the resulting list, as the HTTP endpoints do.
pub trait DirectoryBackend: Send {
    /// All places, newest first.
    fn list_places(&self) -> DirectoryResult<Vec<DirectoryPlace>>;

    /// Insert `place` as the newest entry, replacing any entry with the same id.
    ///
    /// The oldest places are evicted beyond the configured cap.
    fn add_place(&self, place: DirectoryPlace) -> DirectoryResult<Vec<DirectoryPlace>>;

    /// Remove a place. Removing an unknown id is not an error.
    fn delete_place(&self, id: &str) -> DirectoryResult<Vec<DirectoryPlace>>;

    /// Reviews of one place, newest first.
    fn list_reviews(&self, place_id: &str) -> DirectoryResult<Vec<Review>>;

    /// Prepend a review, keeping only the most recent ones of its place.
    fn add_review(&self, review: Review) -> DirectoryResult<Vec<Review>>;

    /// Number of stored places.
    fn count_places(&self) -> DirectoryResult<usize> {
        Ok(self.list_places()?.len())
    }
}
