//! Pairwise Ranker - Glicko-2 ratings from pairwise comparisons
//!
//! This crate rates a collection of items (typically images) from repeated
//! "which of these two is better" decisions. It provides the Glicko-2 rating
//! engine, uncertainty-driven pair selection, an undoable rating store, and
//! write-behind persistence per dataset.

pub mod config;
pub mod error;
pub mod matchmaking;
pub mod metrics;
pub mod rating;
pub mod session;
pub mod source;
pub mod store;
pub mod types;
pub mod utils;

// Re-export commonly used types and traits
pub use error::{RankerError, RankerResult, Result};
pub use types::*;

// Re-export key components
pub use matchmaking::{MatchSelector, Selection, SelectionConfig};
pub use rating::{Glicko2Config, Glicko2Engine, PersistenceGateway, RatingUpdate};
pub use session::RankingSession;
pub use store::{RankedView, RatingStore, StorePhase};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
