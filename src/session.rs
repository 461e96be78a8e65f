//! Ranking sessions
//!
//! A session binds one dataset namespace to one persistence gateway. Opening
//! it loads stored ratings for the dataset's items and starts the write-behind
//! task; closing it waits for queued writes to drain. The store sits behind a
//! mutex that is held only while in-memory state changes, so concurrent
//! callers are serialized and never wait on storage.

use crate::config::AppConfig;
use crate::error::{RankerError, RankerResult, Result};
use crate::matchmaking::MatchSelector;
use crate::metrics::MetricsCollector;
use crate::rating::storage::PersistenceGateway;
use crate::rating::Glicko2Engine;
use crate::store::{PersistenceWriter, RatingStore};
use crate::types::{DecisionOutcome, ItemId, ItemPair, PlayerState, RankedItem, SelectionMode};
use anyhow::Context;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// An open rating session for one dataset
pub struct RankingSession {
    namespace: String,
    store: Mutex<RatingStore>,
    writer_task: Option<JoinHandle<()>>,
    metrics: Arc<MetricsCollector>,
}

impl RankingSession {
    /// Open a session over `ids`, restoring stored stats from `gateway`
    pub async fn open<I, S>(
        namespace: impl Into<String>,
        ids: I,
        gateway: Arc<dyn PersistenceGateway>,
        config: &AppConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<ItemId>,
    {
        let namespace = namespace.into();
        let engine = Glicko2Engine::new(config.glicko2())?;
        let selector = MatchSelector::new(config.selection())?;
        let rng = match config.matchmaking.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let ids: Vec<ItemId> = ids.into_iter().map(Into::into).collect();
        let mut stored: HashMap<ItemId, PlayerState> = HashMap::new();
        for id in &ids {
            let found = gateway
                .lookup(id)
                .await
                .with_context(|| format!("Failed to look up stored rating for '{}'", id))?;
            if let Some(stats) = found {
                stored.insert(id.clone(), stats);
            }
        }

        let (writer, writer_task) = PersistenceWriter::spawn(gateway, metrics.clone());
        let mut store = RatingStore::new(engine, selector, rng)
            .with_metrics(metrics.clone())
            .with_writer(writer);
        store.initialize_pool(ids, |id| stored.get(id).copied());

        info!(
            "Opened session '{}' with {} items ({} stored)",
            namespace,
            store.len(),
            stored.len()
        );

        Ok(Self {
            namespace,
            store: Mutex::new(store),
            writer_task: Some(writer_task),
            metrics,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Select the next pair for `mode`
    pub fn select_next(&self, mode: SelectionMode) -> RankerResult<ItemPair> {
        self.lock()?.select_next(mode)
    }

    /// Commit a decision on the current pair
    pub fn record_decision(&self, winner_id: &str, loser_id: &str) -> RankerResult<DecisionOutcome> {
        self.lock()?.record_decision(winner_id, loser_id)
    }

    /// Roll back the most recent decision
    pub fn undo(&self) -> RankerResult<ItemPair> {
        self.lock()?.undo()
    }

    pub fn current_pair(&self) -> RankerResult<Option<ItemPair>> {
        Ok(self.lock()?.current_pair().cloned())
    }

    /// Both items of the current pair, in display order
    pub fn current_items(&self) -> RankerResult<Option<(RankedItem, RankedItem)>> {
        let store = self.lock()?;
        Ok(store.current_pair().and_then(|pair| {
            let first = store.get(&pair.first)?.clone();
            let second = store.get(&pair.second)?.clone();
            Some((first, second))
        }))
    }

    /// Snapshot of the ranking, highest rating first
    pub fn rankings(&self) -> RankerResult<Vec<RankedItem>> {
        Ok(self.lock()?.ranked_view().iter().cloned().collect())
    }

    /// Run `f` against the store while holding the lock
    pub fn with_store<T>(&self, f: impl FnOnce(&RatingStore) -> T) -> RankerResult<T> {
        let store = self.lock()?;
        Ok(f(&store))
    }

    /// Stop accepting writes and wait for queued writes to reach the gateway
    pub async fn close(mut self) -> Result<()> {
        let writer = self.lock()?.take_writer();
        drop(writer);

        if let Some(task) = self.writer_task.take() {
            task.await.context("Persistence writer task failed")?;
        }

        info!("Closed session '{}'", self.namespace);
        Ok(())
    }

    fn lock(&self) -> RankerResult<MutexGuard<'_, RatingStore>> {
        self.store.lock().map_err(|_| RankerError::Internal {
            message: "Failed to acquire rating store lock".to_string(),
        })
    }
}

impl Drop for RankingSession {
    fn drop(&mut self) {
        if self.writer_task.is_some() {
            warn!(
                "Session '{}' dropped without close; queued writes continue in the background",
                self.namespace
            );
        }
    }
}
