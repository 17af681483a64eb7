//! Query-resolution pipeline for the Ratewise CLI.
//!
//! Turns a free-text question about an instructor into a grounded answer:
//!
//! ```text
//! text -> parse -> Intent -> resolve -> Instructor
//!      -> retrieve -> fragments -> synthesize -> Answer
//! ```
//!
//! Every stage can short-circuit with a typed outcome (not found,
//! ambiguous, no data) that the caller surfaces without invoking later
//! stages; the model call is the only suspension point.

pub mod outcome;
pub mod parse;
pub mod pipeline;
pub mod resolve;
pub mod retrieve;
pub mod synthesize;

// Re-export main types
pub use outcome::QueryOutcome;
pub use parse::{parse, Intent};
pub use pipeline::answer_query;
pub use resolve::{resolve, Resolution};
pub use retrieve::{retrieve, Retrieval};
pub use synthesize::{synthesize, Answer, Excerpt};
