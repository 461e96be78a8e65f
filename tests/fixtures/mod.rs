//! Test fixtures and gateway implementations for integration testing

#![allow(dead_code)]

use async_trait::async_trait;
use mockall::mock;
use pairwise_ranker::config::AppConfig;
use pairwise_ranker::error::Result;
use pairwise_ranker::metrics::MetricsCollector;
use pairwise_ranker::rating::{InMemoryGateway, PersistenceGateway};
use pairwise_ranker::types::{ItemId, PlayerState, RankedItem};
use pairwise_ranker::RankingSession;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Gateway {}

    #[async_trait]
    impl PersistenceGateway for Gateway {
        async fn upsert(&self, item: RankedItem) -> Result<()>;
        async fn lookup(&self, id: &ItemId) -> Result<Option<PlayerState>>;
    }
}

/// Gateway whose writes never complete
#[derive(Debug, Default)]
pub struct StalledGateway {
    attempts: AtomicUsize,
}

impl StalledGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of upserts that started
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for StalledGateway {
    async fn upsert(&self, _item: RankedItem) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn lookup(&self, _id: &ItemId) -> Result<Option<PlayerState>> {
        Ok(None)
    }
}

/// In-memory gateway that sleeps before every write
#[derive(Debug, Default)]
pub struct SlowGateway {
    inner: InMemoryGateway,
    delay: Duration,
}

impl SlowGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryGateway::new(),
            delay,
        }
    }

    pub fn upserts(&self) -> Vec<RankedItem> {
        self.inner.upserts()
    }

    pub fn stored(&self, id: &str) -> Option<PlayerState> {
        self.inner.stored(id)
    }
}

#[async_trait]
impl PersistenceGateway for SlowGateway {
    async fn upsert(&self, item: RankedItem) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upsert(item).await
    }

    async fn lookup(&self, id: &ItemId) -> Result<Option<PlayerState>> {
        self.inner.lookup(id).await
    }
}

/// `count` image file names: image_00.jpg, image_01.jpg, ...
pub fn image_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("image_{:02}.jpg", i)).collect()
}

/// Player state with the given rating and deviation
pub fn state(rating: f64, rd: f64) -> PlayerState {
    PlayerState {
        rating,
        rd,
        ..PlayerState::default()
    }
}

/// Default configuration with deterministic selection
pub fn seeded_config(seed: u64) -> AppConfig {
    let mut config = AppConfig::default();
    config.matchmaking.seed = Some(seed);
    config
}

/// Open a seeded session over `ids`
pub async fn open_session(
    namespace: &str,
    ids: Vec<String>,
    gateway: Arc<dyn PersistenceGateway>,
) -> RankingSession {
    RankingSession::open(
        namespace,
        ids,
        gateway,
        &seeded_config(42),
        Arc::new(MetricsCollector::new().unwrap()),
    )
    .await
    .unwrap()
}
