//! Error types for the ranking core
//!
//! Application-level code uses anyhow for propagation; the rating core returns
//! the typed `RankerError` so callers can react to each failure explicitly.

use crate::types::SelectionMode;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Result type for core operations that fail with a typed `RankerError`
pub type RankerResult<T> = std::result::Result<T, RankerError>;

/// Custom error types for specific ranking scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RankerError {
    #[error("Not enough items to form a pair for {mode} mode: {eligible} eligible")]
    InsufficientPool { mode: SelectionMode, eligible: usize },

    #[error("Unknown item or not part of the current pair: {item_id}")]
    UnknownEntity { item_id: String },

    #[error("Nothing to undo")]
    EmptyUndo,

    #[error("Degenerate win probability: {detail}")]
    DegenerateProbability { detail: String },

    #[error("Persistence failed: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}
