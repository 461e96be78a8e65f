//! Undoable rating state
//!
//! This module owns the pool of rated items, applies decisions, keeps the undo
//! history and queues changed items for persistence.

pub mod state;
pub mod undo;
pub mod writer;

pub use state::{RankedIter, RankedView, RatingStore, StorePhase};
pub use undo::{UndoEntry, UndoStack};
pub use writer::PersistenceWriter;
