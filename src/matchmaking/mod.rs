//! Matchmaking for pairwise comparisons
//!
//! Decides which two items are compared next.

pub mod selector;

pub use selector::{MatchSelector, Selection, SelectionConfig};
