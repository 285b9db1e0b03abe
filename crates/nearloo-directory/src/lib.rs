//! Directory of user-submitted places and their reviews.
//!
//! `PlaceDirectory` is the async handle used by the search flow and the CLI; `server`
//! exposes the same operations as JSON endpoints.

pub mod backend;
pub mod client;
pub mod directory;
pub mod record;
pub mod server;
pub mod store;
pub mod validate;

pub use backend::{DirectoryBackend, DirectoryResult};
pub use client::DirectoryClient;
pub use directory::PlaceDirectory;
pub use record::{average_stars, ApiResponse, DirectoryPlace, Review, DEFAULT_PLACE_NAME};
pub use store::SqliteDirectoryStore;
