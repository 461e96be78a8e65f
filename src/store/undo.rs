//! Undo history for rating decisions

use crate::types::{ItemPair, RankedItem};

/// Winner and loser exactly as they were before one decision
#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub winner: RankedItem,
    pub loser: RankedItem,
}

impl UndoEntry {
    /// The comparison this entry belongs to, winner first
    pub fn pair(&self) -> ItemPair {
        ItemPair::new(self.winner.id.clone(), self.loser.id.clone())
    }
}

/// LIFO stack of value snapshots, bounded only by memory
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    entries: Vec<UndoEntry>,
}

impl UndoStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: UndoEntry) {
        self.entries.push(entry);
    }

    pub fn pop(&mut self) -> Option<UndoEntry> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(winner: &str, loser: &str) -> UndoEntry {
        UndoEntry {
            winner: RankedItem::unrated(winner),
            loser: RankedItem::unrated(loser),
        }
    }

    #[test]
    fn test_lifo_order() {
        let mut stack = UndoStack::new();
        stack.push(entry("a", "b"));
        stack.push(entry("c", "d"));

        assert_eq!(stack.len(), 2);
        assert_eq!(stack.pop().unwrap().pair(), ItemPair::new("c", "d"));
        assert_eq!(stack.pop().unwrap().pair(), ItemPair::new("a", "b"));
        assert!(stack.pop().is_none());
    }

    #[test]
    fn test_clear() {
        let mut stack = UndoStack::new();
        stack.push(entry("a", "b"));
        stack.clear();
        assert!(stack.is_empty());
    }
}
