//! Transaction history store.
//!
//! Durable, deduplicated, bounded ledger of transaction attempts. Entries
//! are keyed by intent hash (adding a duplicate is a no-op), kept newest
//! first and truncated to a fixed cap before every write-through. The
//! in-memory list stays authoritative for the session even when the
//! write-through fails; persistence errors are logged, never thrown out of
//! a mutating action.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::types::{TransactionRecord, TransactionStatus};

/// Single keyed persistence slot backing the history ledger
#[async_trait]
pub trait KeyValueSlot: Send + Sync + 'static {
    /// Read the slot; `None` when nothing was ever written
    async fn read(&self) -> Result<Option<String>>;

    /// Overwrite the slot
    async fn write(&self, value: &str) -> Result<()>;

    /// Remove the slot entirely
    async fn erase(&self) -> Result<()>;
}

/// File-backed slot holding the serialized ledger as one JSON document
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl KeyValueSlot for FileSlot {
    async fn read(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to read history slot: {}", self.path.display())
            }),
        }
    }

    async fn write(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }
        tokio::fs::write(&self.path, value).await.with_context(|| {
            format!("Failed to write history slot: {}", self.path.display())
        })
    }

    async fn erase(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to erase history slot: {}", self.path.display())
            }),
        }
    }
}

/// In-memory slot for tests and ephemeral sessions
#[derive(Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueSlot for MemorySlot {
    async fn read(&self) -> Result<Option<String>> {
        Ok(self.value.lock().await.clone())
    }

    async fn write(&self, value: &str) -> Result<()> {
        *self.value.lock().await = Some(value.to_string());
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        *self.value.lock().await = None;
        Ok(())
    }
}

/// Fields that can change on an existing record
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub status: Option<TransactionStatus>,
    pub explorer_url: Option<String>,
}

impl RecordPatch {
    pub fn status(status: TransactionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

/// Aggregate counts over the ledger
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStatistics {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    /// Completed over total, as a percentage; 0 for an empty ledger
    pub success_rate: f64,
}

/// Bounded, deduplicated transaction ledger with write-through persistence
pub struct HistoryStore {
    slot: Arc<dyn KeyValueSlot>,
    entries: RwLock<Vec<TransactionRecord>>,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(slot: Arc<dyn KeyValueSlot>, max_entries: usize) -> Self {
        Self {
            slot,
            entries: RwLock::new(Vec::new()),
            max_entries,
        }
    }

    /// Load the persisted ledger, tolerating a missing or corrupt slot by
    /// starting empty. Legacy records missing `id` or `type` are
    /// back-filled in place.
    pub async fn load(&self) {
        let raw = match self.slot.read().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Could not read persisted history, starting empty");
                None
            }
        };

        let mut records: Vec<TransactionRecord> = match raw {
            Some(content) => match serde_json::from_str(&content) {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "Persisted history is corrupt, starting empty");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };

        for record in records.iter_mut() {
            if record.id.is_empty() {
                record.id = TransactionRecord::derive_id(record.intent_hash, record.timestamp);
            }
        }
        records.truncate(self.max_entries);

        let count = records.len();
        *self.entries.write().await = records;
        info!(count, "Transaction history loaded");
    }

    /// Append a record, newest first. A record whose intent hash already
    /// exists is skipped; this is a dedup invariant, not an update.
    /// Returns whether the record was added.
    pub async fn add(&self, mut record: TransactionRecord) -> bool {
        let mut entries = self.entries.write().await;

        if entries.iter().any(|r| r.intent_hash == record.intent_hash) {
            debug!(
                intent_hash = record.intent_hash,
                "Transaction already in history, skipping duplicate"
            );
            return false;
        }

        if record.id.is_empty() {
            record.id = TransactionRecord::derive_id(record.intent_hash, record.timestamp);
        }

        entries.insert(0, record);
        entries.truncate(self.max_entries);

        self.persist(&entries).await;
        true
    }

    /// Apply a patch to the record with the given intent hash; no-op when
    /// no record matches.
    pub async fn update(&self, intent_hash: u64, patch: RecordPatch) {
        let mut entries = self.entries.write().await;

        let Some(record) = entries.iter_mut().find(|r| r.intent_hash == intent_hash) else {
            debug!(intent_hash, "No history record to update");
            return;
        };

        if let Some(status) = patch.status {
            record.status = status;
        }
        if let Some(explorer_url) = patch.explorer_url {
            record.explorer_url = explorer_url;
        }

        self.persist(&entries).await;
    }

    /// Drop every entry and erase the persisted slot
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
        if let Err(e) = self.slot.erase().await {
            error!(error = %e, "Failed to erase persisted history");
        }
    }

    /// Flip pending records older than `max_age` to failed. Returns how
    /// many records were expired.
    pub async fn expire_stale_pending(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now().timestamp_millis() - max_age.num_milliseconds();
        let mut entries = self.entries.write().await;

        let mut expired = 0;
        for record in entries.iter_mut() {
            if record.status == TransactionStatus::Pending && record.timestamp < cutoff {
                record.status = TransactionStatus::Failed;
                expired += 1;
            }
        }

        if expired > 0 {
            warn!(expired, "Expired stale pending transactions");
            self.persist(&entries).await;
        }
        expired
    }

    pub async fn all(&self) -> Vec<TransactionRecord> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn find(&self, intent_hash: u64) -> Option<TransactionRecord> {
        self.entries
            .read()
            .await
            .iter()
            .find(|r| r.intent_hash == intent_hash)
            .cloned()
    }

    pub async fn by_status(&self, status: TransactionStatus) -> Vec<TransactionRecord> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|r| r.status == status)
            .cloned()
            .collect()
    }

    /// Entries whose token, amount or explorer URL contains the query;
    /// token matching is case-insensitive.
    pub async fn search(&self, query: &str) -> Vec<TransactionRecord> {
        let lowered = query.to_lowercase();
        self.entries
            .read()
            .await
            .iter()
            .filter(|r| {
                r.token
                    .as_deref()
                    .map(|t| t.to_lowercase().contains(&lowered))
                    .unwrap_or(false)
                    || r.amount
                        .as_deref()
                        .map(|a| a.contains(query))
                        .unwrap_or(false)
                    || r.explorer_url.contains(query)
            })
            .cloned()
            .collect()
    }

    /// Newest entry (the list is already newest-first)
    pub async fn most_recent(&self) -> Option<TransactionRecord> {
        self.entries.read().await.first().cloned()
    }

    /// The newest `count` entries
    pub async fn recent(&self, count: usize) -> Vec<TransactionRecord> {
        self.entries.read().await.iter().take(count).cloned().collect()
    }

    pub async fn statistics(&self) -> HistoryStatistics {
        let entries = self.entries.read().await;
        let total = entries.len();
        let pending = entries
            .iter()
            .filter(|r| r.status == TransactionStatus::Pending)
            .count();
        let completed = entries
            .iter()
            .filter(|r| r.status == TransactionStatus::Completed)
            .count();
        let failed = entries
            .iter()
            .filter(|r| r.status == TransactionStatus::Failed)
            .count();

        HistoryStatistics {
            total,
            pending,
            completed,
            failed,
            success_rate: if total > 0 {
                (completed as f64 / total as f64) * 100.0
            } else {
                0.0
            },
        }
    }

    /// Write the ledger through to the slot. The in-memory list is
    /// authoritative for the session even when this fails.
    async fn persist(&self, entries: &[TransactionRecord]) {
        let serialized = match serde_json::to_string(entries) {
            Ok(serialized) => serialized,
            Err(e) => {
                error!(error = %e, "Failed to serialize transaction history");
                return;
            }
        };

        if let Err(e) = self.slot.write(&serialized).await {
            error!(error = %e, "Failed to persist transaction history");
        }
    }
}
