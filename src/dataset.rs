//! Dataset store — the single shared slot holding the published table.
//!
//! The store owns exactly one immutable `Snapshot` (or none before the
//! first publish) plus its version counter. `publish` swaps the whole
//! snapshot under a write lock, so readers observe either the previous
//! table in full or the new one in full, never a mix. History is not
//! kept: a superseded snapshot lives only as long as queries admitted
//! against it still hold their `Arc`.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::table::Table;

/// One published dataset state: immutable table + version + timestamp.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub table: Arc<Table>,
    pub version: u64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Internal lock error")]
    LockPoisoned,
}

/// Holds the currently published snapshot. Writes go exclusively through
/// the lifecycle manager; everything else only reads.
pub struct DatasetStore {
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Install `table` as the current snapshot and return it.
    ///
    /// Versions start at 1 and increase by 1 per successful publish.
    /// Serialization of concurrent publishes is the caller's job (the
    /// lifecycle manager's ingest lock); the write lock here only
    /// guarantees readers never see a torn snapshot.
    pub fn publish(&self, table: Table) -> Result<Arc<Snapshot>, StoreError> {
        let mut guard = self.current.write().map_err(|_| StoreError::LockPoisoned)?;
        let version = guard.as_ref().map(|s| s.version).unwrap_or(0) + 1;
        let snapshot = Arc::new(Snapshot {
            table: Arc::new(table),
            version,
            published_at: Utc::now(),
        });
        *guard = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// The latest snapshot, or `None` before the first publish.
    pub fn current(&self) -> Result<Option<Arc<Snapshot>>, StoreError> {
        let guard = self.current.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(guard.clone())
    }

    /// Current version number; 0 means nothing has been published.
    pub fn version(&self) -> u64 {
        self.current
            .read()
            .ok()
            .and_then(|g| g.as_ref().map(|s| s.version))
            .unwrap_or(0)
    }
}

impl Default for DatasetStore {
    fn default() -> Self {
        Self::new()
    }
}
