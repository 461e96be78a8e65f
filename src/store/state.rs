//! Rating store state machine
//!
//! The store owns the pool of rated items and moves between three phases:
//!
//! - `Idle`: no pair is on display (fresh pool, or too few items)
//! - `PairReady`: a pair has been selected and awaits a decision
//! - `Decided`: a decision was just committed; the store immediately selects
//!   the next pair and returns to `PairReady` (or `Idle`)
//!
//! Every decision pushes a snapshot of both items onto the undo stack and
//! queues both updated items for persistence.

use crate::error::{RankerError, RankerResult};
use crate::matchmaking::MatchSelector;
use crate::metrics::MetricsCollector;
use crate::rating::Glicko2Engine;
use crate::store::undo::{UndoEntry, UndoStack};
use crate::store::writer::PersistenceWriter;
use crate::types::{DecisionOutcome, ItemId, ItemPair, PlayerState, RankedItem, SelectionMode};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Phase of the rating store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePhase {
    Idle,
    PairReady,
    Decided,
}

/// Authoritative in-memory rating state for one dataset
pub struct RatingStore {
    /// Items in load order
    items: Vec<RankedItem>,
    /// Position of each item in `items`
    index: HashMap<ItemId, usize>,
    undo: UndoStack,
    current_pair: Option<ItemPair>,
    last_pair: Option<ItemPair>,
    phase: StorePhase,
    /// Mode reused when a decision triggers the next selection
    mode: SelectionMode,
    engine: Glicko2Engine,
    selector: MatchSelector,
    rng: StdRng,
    writer: Option<PersistenceWriter>,
    metrics: Arc<MetricsCollector>,
}

impl std::fmt::Debug for RatingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingStore")
            .field("items", &self.items.len())
            .field("undo_depth", &self.undo.len())
            .field("current_pair", &self.current_pair)
            .field("phase", &self.phase)
            .field("mode", &self.mode)
            .finish()
    }
}

impl Default for RatingStore {
    fn default() -> Self {
        Self::new(
            Glicko2Engine::default(),
            MatchSelector::default(),
            StdRng::from_entropy(),
        )
    }
}

impl RatingStore {
    /// Create an empty store
    pub fn new(engine: Glicko2Engine, selector: MatchSelector, rng: StdRng) -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            undo: UndoStack::new(),
            current_pair: None,
            last_pair: None,
            phase: StorePhase::Idle,
            mode: SelectionMode::Standard,
            engine,
            selector,
            rng,
            writer: None,
            metrics: Arc::new(MetricsCollector::default()),
        }
    }

    /// Create an empty store with a deterministic random source
    pub fn with_seed(seed: u64) -> Self {
        Self::new(
            Glicko2Engine::default(),
            MatchSelector::default(),
            StdRng::seed_from_u64(seed),
        )
    }

    /// Queue every changed item on `writer`
    pub fn with_writer(mut self, writer: PersistenceWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Detach the persistence writer so its task can drain
    pub fn take_writer(&mut self) -> Option<PersistenceWriter> {
        self.writer.take()
    }

    /// Replace the pool with `ids`, using stored stats when `lookup` has them
    ///
    /// Clears the undo history and any pair on display.
    pub fn initialize_pool<I, S, F>(&mut self, ids: I, mut lookup: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
        F: FnMut(&ItemId) -> Option<PlayerState>,
    {
        self.items.clear();
        self.index.clear();
        self.undo.clear();
        self.current_pair = None;
        self.last_pair = None;
        self.phase = StorePhase::Idle;

        let mut restored = 0;
        for id in ids {
            let id: ItemId = id.into();
            if self.index.contains_key(&id) {
                warn!("Duplicate item id '{}' ignored", id);
                continue;
            }

            let stats = match lookup(&id) {
                Some(stats) if stats.is_well_formed() => {
                    restored += 1;
                    stats
                }
                Some(stats) => {
                    warn!(
                        "Stored stats for '{}' are invalid (rd {}, vol {}), starting fresh",
                        id, stats.rd, stats.vol
                    );
                    PlayerState::default()
                }
                None => PlayerState::default(),
            };

            self.index.insert(id.clone(), self.items.len());
            self.items.push(RankedItem::new(id, stats));
        }

        info!(
            "Initialized pool with {} items ({} previously rated)",
            self.items.len(),
            restored
        );
        self.metrics.set_pool_size(self.items.len());
        self.metrics.set_undo_depth(0);
    }

    /// Select the next pair for `mode` and put it on display
    pub fn select_next(&mut self, mode: SelectionMode) -> RankerResult<ItemPair> {
        self.mode = mode;

        match self
            .selector
            .select(&self.items, mode, self.last_pair.as_ref(), &mut self.rng)
        {
            Ok(selection) => {
                if selection.fell_back() {
                    info!(
                        "Not enough items for {} mode, falling back to Standard",
                        selection.requested
                    );
                }
                self.metrics
                    .record_selection(selection.effective, selection.fell_back());

                let pair = selection.pair();
                self.current_pair = Some(pair.clone());
                self.last_pair = Some(pair.clone());
                self.phase = StorePhase::PairReady;
                Ok(pair)
            }
            Err(e) => {
                debug!("Selection failed: {}", e);
                if matches!(e, RankerError::InsufficientPool { .. }) {
                    self.metrics.record_insufficient_pool(mode);
                }
                self.current_pair = None;
                self.phase = StorePhase::Idle;
                Err(e)
            }
        }
    }

    /// Commit a decision on the current pair and select the next one
    pub fn record_decision(&mut self, winner_id: &str, loser_id: &str) -> RankerResult<DecisionOutcome> {
        let pair = self
            .current_pair
            .as_ref()
            .ok_or_else(|| RankerError::UnknownEntity {
                item_id: winner_id.to_string(),
            })?;

        for id in [winner_id, loser_id] {
            if !self.index.contains_key(id) || !pair.contains(id) {
                return Err(RankerError::UnknownEntity {
                    item_id: id.to_string(),
                });
            }
        }
        if !pair.is_decided_by(winner_id, loser_id) {
            return Err(RankerError::UnknownEntity {
                item_id: loser_id.to_string(),
            });
        }

        let winner_idx = self.index[winner_id];
        let loser_idx = self.index[loser_id];
        let winner_before = self.items[winner_idx].clone();
        let loser_before = self.items[loser_idx].clone();

        let timer = self.metrics.start_timer();
        let (winner_update, loser_update) = self
            .engine
            .update_ratings(&winner_before.stats, &loser_before.stats);
        self.metrics.record_rating_update(timer.stop());

        let mut winner_after = winner_update.apply_to(&winner_before.stats);
        winner_after.wins += 1;
        let mut loser_after = loser_update.apply_to(&loser_before.stats);
        loser_after.losses += 1;

        if !winner_after.is_well_formed() || !loser_after.is_well_formed() {
            return Err(RankerError::DegenerateProbability {
                detail: format!(
                    "{} vs {} produced winner {:?}, loser {:?}",
                    winner_id, loser_id, winner_update, loser_update
                ),
            });
        }

        self.undo.push(UndoEntry {
            winner: winner_before.clone(),
            loser: loser_before.clone(),
        });

        self.items[winner_idx].stats = winner_after;
        self.items[loser_idx].stats = loser_after;
        self.persist(self.items[winner_idx].clone());
        self.persist(self.items[loser_idx].clone());
        self.phase = StorePhase::Decided;

        let winner_delta = winner_after.rating - winner_before.stats.rating;
        let loser_delta = loser_after.rating - loser_before.stats.rating;
        info!(
            "'{}' beat '{}': {:+.1} / {:+.1}",
            winner_id, loser_id, winner_delta, loser_delta
        );
        self.metrics.record_decision();
        self.metrics.set_undo_depth(self.undo.len());

        let next_pair = match self.select_next(self.mode) {
            Ok(pair) => Some(pair),
            Err(RankerError::InsufficientPool { .. }) => None,
            Err(e) => return Err(e),
        };

        Ok(DecisionOutcome {
            winner: self.items[winner_idx].clone(),
            loser: self.items[loser_idx].clone(),
            winner_delta,
            loser_delta,
            next_pair,
        })
    }

    /// Roll back the most recent decision and show its pair again
    pub fn undo(&mut self) -> RankerResult<ItemPair> {
        let entry = self.undo.pop().ok_or(RankerError::EmptyUndo)?;

        for snapshot in [&entry.winner, &entry.loser] {
            let idx = *self
                .index
                .get(&snapshot.id)
                .ok_or_else(|| RankerError::Internal {
                    message: format!("Undo snapshot for '{}' has no pool entry", snapshot.id),
                })?;
            self.items[idx] = snapshot.clone();
            self.persist(snapshot.clone());
        }

        let pair = entry.pair();
        info!("Undid decision {}", pair);
        self.current_pair = Some(pair.clone());
        self.phase = StorePhase::PairReady;
        self.metrics.record_undo();
        self.metrics.set_undo_depth(self.undo.len());
        Ok(pair)
    }

    /// Items ordered by rating, highest first; ties keep load order
    pub fn ranked_view(&self) -> RankedView<'_> {
        RankedView { items: &self.items }
    }

    pub fn current_pair(&self) -> Option<&ItemPair> {
        self.current_pair.as_ref()
    }

    pub fn last_pair(&self) -> Option<&ItemPair> {
        self.last_pair.as_ref()
    }

    pub fn phase(&self) -> StorePhase {
        self.phase
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn get(&self, id: &str) -> Option<&RankedItem> {
        self.index.get(id).map(|&idx| &self.items[idx])
    }

    /// Items in load order
    pub fn items(&self) -> &[RankedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    fn persist(&self, item: RankedItem) {
        if let Some(writer) = &self.writer {
            writer.submit(item);
        }
    }
}

/// Read-only ranking of a pool; each `iter()` call sorts afresh
#[derive(Debug, Clone, Copy)]
pub struct RankedView<'a> {
    items: &'a [RankedItem],
}

impl<'a> RankedView<'a> {
    pub fn iter(&self) -> RankedIter<'a> {
        let items = self.items;
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by(|&a, &b| items[b].stats.rating.total_cmp(&items[a].stats.rating));
        RankedIter {
            items,
            order: order.into_iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for RankedView<'a> {
    type Item = &'a RankedItem;
    type IntoIter = RankedIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &RankedView<'a> {
    type Item = &'a RankedItem;
    type IntoIter = RankedIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a `RankedView`
#[derive(Debug)]
pub struct RankedIter<'a> {
    items: &'a [RankedItem],
    order: std::vec::IntoIter<usize>,
}

impl<'a> Iterator for RankedIter<'a> {
    type Item = &'a RankedItem;

    fn next(&mut self) -> Option<Self::Item> {
        self.order.next().map(|idx| &self.items[idx])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl ExactSizeIterator for RankedIter<'_> {}
