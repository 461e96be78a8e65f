//! Rating system built on Glicko-2
//!
//! This module provides the rating engine and the persistence interface used
//! to store item ratings between sessions.

pub mod glicko2;
pub mod storage;

// Re-export commonly used types
pub use glicko2::{update_ratings, Glicko2Config, Glicko2Engine, MatchResult, RatingUpdate};
pub use storage::{InMemoryGateway, JsonFileGateway, PersistenceGateway, RatingRecord};
