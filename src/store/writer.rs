//! Write-behind persistence
//!
//! Rating changes are queued on an unbounded channel and applied to the
//! gateway by a single background task, one write at a time. Writes therefore
//! reach the gateway in the order they were issued, and the caller never waits
//! on storage.

use crate::metrics::MetricsCollector;
use crate::rating::storage::PersistenceGateway;
use crate::types::RankedItem;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Handle used by the store to enqueue upserts
#[derive(Debug, Clone)]
pub struct PersistenceWriter {
    sender: mpsc::UnboundedSender<RankedItem>,
}

impl PersistenceWriter {
    /// Spawn the writer task on the current tokio runtime
    pub fn spawn(
        gateway: Arc<dyn PersistenceGateway>,
        metrics: Arc<MetricsCollector>,
    ) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::unbounded_channel::<RankedItem>();

        let handle = tokio::spawn(async move {
            while let Some(item) = receiver.recv().await {
                let id = item.id.clone();
                match gateway.upsert(item).await {
                    Ok(()) => {
                        debug!("Persisted rating for '{}'", id);
                        metrics.record_persistence_write(true);
                    }
                    Err(e) => {
                        warn!("Failed to persist rating for '{}': {}", id, e);
                        metrics.record_persistence_write(false);
                    }
                }
            }
            debug!("Persistence writer drained and stopped");
        });

        (Self { sender }, handle)
    }

    /// Queue an upsert; returns false if the writer task has stopped
    pub fn submit(&self, item: RankedItem) -> bool {
        match self.sender.send(item) {
            Ok(()) => true,
            Err(e) => {
                warn!("Persistence writer closed, dropping write for '{}'", e.0.id);
                false
            }
        }
    }
}
