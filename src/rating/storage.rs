//! Rating persistence interface and implementations
//!
//! The ranking core only needs per-item upsert and lookup. This module defines
//! that contract and provides an in-memory gateway and a JSON-file gateway that
//! keeps one document per dataset namespace.

use crate::error::{RankerError, Result};
use crate::types::{ItemId, PlayerState, RankedItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Durable record for a single item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub item_id: ItemId,
    pub stats: PlayerState,
    pub last_updated: DateTime<Utc>,
}

impl RatingRecord {
    pub fn from_item(item: RankedItem) -> Self {
        Self {
            item_id: item.id,
            stats: item.stats,
            last_updated: Utc::now(),
        }
    }
}

/// Durable key-value store for item ratings
///
/// Both operations are independent per id; repeated upserts of the same item
/// are idempotent.
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Insert or replace the stored state of an item
    async fn upsert(&self, item: RankedItem) -> Result<()>;

    /// Fetch the stored state of an item, if any
    async fn lookup(&self, id: &ItemId) -> Result<Option<PlayerState>>;
}

/// In-memory gateway, also records every upsert in arrival order
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    records: RwLock<HashMap<ItemId, RatingRecord>>,
    upsert_log: RwLock<Vec<RankedItem>>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload stored states
    pub fn with_states(states: impl IntoIterator<Item = (ItemId, PlayerState)>) -> Self {
        let records = states
            .into_iter()
            .map(|(id, stats)| {
                let record = RatingRecord::from_item(RankedItem::new(id.clone(), stats));
                (id, record)
            })
            .collect();

        Self {
            records: RwLock::new(records),
            upsert_log: RwLock::new(Vec::new()),
        }
    }

    /// Every upsert received so far, oldest first
    pub fn upserts(&self) -> Vec<RankedItem> {
        self.upsert_log
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the stored state of an item
    pub fn stored(&self, id: &str) -> Option<PlayerState> {
        self.records
            .read()
            .ok()
            .and_then(|records| records.get(id).map(|record| record.stats))
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn upsert(&self, item: RankedItem) -> Result<()> {
        if let Ok(mut log) = self.upsert_log.write() {
            log.push(item.clone());
        }

        let mut records = self
            .records
            .write()
            .map_err(|_| RankerError::Internal {
                message: "Failed to acquire records write lock".to_string(),
            })?;
        records.insert(item.id.clone(), RatingRecord::from_item(item));
        Ok(())
    }

    async fn lookup(&self, id: &ItemId) -> Result<Option<PlayerState>> {
        let records = self.records.read().map_err(|_| RankerError::Internal {
            message: "Failed to acquire records read lock".to_string(),
        })?;
        Ok(records.get(id).map(|record| record.stats))
    }
}

/// Gateway backed by one JSON document per dataset namespace
#[derive(Debug)]
pub struct JsonFileGateway {
    path: PathBuf,
    records: Mutex<BTreeMap<ItemId, RatingRecord>>,
}

impl JsonFileGateway {
    /// Open (or create on first write) the document for `namespace` under `data_dir`
    pub async fn open(data_dir: impl AsRef<Path>, namespace: &str) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
            RankerError::Persistence {
                message: format!("Failed to create {}: {}", data_dir.display(), e),
            }
        })?;

        let path = data_dir.join(document_name(namespace));
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let list: Vec<RatingRecord> =
                    serde_json::from_slice(&bytes).map_err(|e| RankerError::Persistence {
                        message: format!("Corrupt ratings file {}: {}", path.display(), e),
                    })?;
                list.into_iter()
                    .map(|record| (record.item_id.clone(), record))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(RankerError::Persistence {
                    message: format!("Failed to read {}: {}", path.display(), e),
                }
                .into())
            }
        };

        info!(
            "Opened ratings store {} with {} records",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All stored records, ordered by item id
    pub async fn all_records(&self) -> Vec<RatingRecord> {
        self.records.lock().await.values().cloned().collect()
    }

    async fn flush(&self, records: &BTreeMap<ItemId, RatingRecord>) -> Result<()> {
        let list: Vec<&RatingRecord> = records.values().collect();
        let bytes = serde_json::to_vec_pretty(&list)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| RankerError::Persistence {
                message: format!("Failed to write {}: {}", tmp.display(), e),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| RankerError::Persistence {
                message: format!("Failed to replace {}: {}", self.path.display(), e),
            })?;

        debug!("Flushed {} records to {}", list.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl PersistenceGateway for JsonFileGateway {
    async fn upsert(&self, item: RankedItem) -> Result<()> {
        let mut records = self.records.lock().await;
        records.insert(item.id.clone(), RatingRecord::from_item(item));
        self.flush(&records).await
    }

    async fn lookup(&self, id: &ItemId) -> Result<Option<PlayerState>> {
        Ok(self.records.lock().await.get(id).map(|record| record.stats))
    }
}

/// File name for a namespace
///
/// Alphanumeric characters are kept as they are; every other character is
/// written as `_` plus the hex of each of its UTF-8 bytes, so distinct
/// namespaces never share a file.
fn document_name(namespace: &str) -> String {
    let mut safe = String::with_capacity(namespace.len());
    for c in namespace.chars() {
        if c.is_alphanumeric() {
            safe.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                safe.push_str(&format!("_{:02x}", byte));
            }
        }
    }
    format!("ratings_{}.json", safe)
}
