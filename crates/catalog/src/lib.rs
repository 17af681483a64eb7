//! Instructor catalog crate for the Ratewise CLI.
//!
//! This crate owns the persisted data model (instructors, courses, reviews,
//! aspect-tagged review fragments), the SQLite store that serves it, and the
//! in-memory catalog index used for fuzzy name resolution.
//!
//! The store is populated by offline collaborators (the ratings fetcher and
//! the review classifier); during online serving everything here is
//! read-only, so concurrent queries need no coordination.

pub mod index;
pub mod store;
pub mod types;

// Re-export main types
pub use index::{Candidate, CatalogIndex};
pub use types::{Aspect, Course, Instructor, Review, ReviewFragment, Sentiment};
