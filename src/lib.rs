//! nearloo: find the nearest public toilet.
//!
//! The [`Finder`] runs one search end to end; the crates under `crates/` hold the
//! pieces it is built from.

pub mod finder;

pub use finder::Finder;
