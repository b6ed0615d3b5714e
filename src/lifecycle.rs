//! Lifecycle manager — the only writer of the dataset store.
//!
//! One ingestion pipeline for every input path (upload, URL fetch, warm
//! load): persist raw bytes to the slot file → decode → publish → rebind
//! the reasoning engine. The whole pipeline runs under a single async
//! mutex so concurrent ingests serialize and version numbers strictly
//! increase.
//!
//! Failure policy: persist/decode/fetch failures abort before publish and
//! leave the previous snapshot servable. A rebind failure after a
//! successful publish does NOT roll the data back — the binding is marked
//! `Failed` and queries degrade to `AgentUnavailable` until the next
//! successful ingest.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::dataset::DatasetStore;
use crate::engine::{EngineBinding, ReasoningEngine};
use crate::table::{decode, DecodeError};

/// Upload filename extensions accepted at the boundary.
const ACCEPTED_EXTENSIONS: &[&str] = &["csv", "tsv"];

/// Ingestion-time failures. All are non-fatal: the previously published
/// snapshot (if any) remains servable.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Only CSV/TSV uploads are accepted (got '{0}')")]
    FormatRejected(String),
    #[error("Could not persist upload: {0}")]
    PersistFailed(String),
    #[error("Could not decode dataset: {0}")]
    DecodeFailed(#[from] DecodeError),
    #[error("Could not fetch dataset from URL: {0}")]
    FetchFailed(String),
    #[error("Internal state error: {0}")]
    Internal(String),
}

/// What a successful ingestion produced.
#[derive(Debug, Clone, Copy)]
pub struct IngestReceipt {
    pub version: u64,
    pub rows: usize,
    pub columns: usize,
}

pub struct LifecycleManager {
    store: Arc<DatasetStore>,
    binding: Arc<RwLock<EngineBinding>>,
    engine: Arc<dyn ReasoningEngine>,
    slot_path: PathBuf,
    /// Critical section: at most one ingestion in flight.
    ingest_lock: tokio::sync::Mutex<()>,
    /// Async client for ingestion-by-URL, with a bounded timeout.
    http: reqwest::Client,
}

impl LifecycleManager {
    pub fn new(
        store: Arc<DatasetStore>,
        binding: Arc<RwLock<EngineBinding>>,
        engine: Arc<dyn ReasoningEngine>,
        slot_path: PathBuf,
        fetch_timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            store,
            binding,
            engine,
            slot_path,
            ingest_lock: tokio::sync::Mutex::new(()),
            http,
        }
    }

    pub fn slot_path(&self) -> &Path {
        &self.slot_path
    }

    /// Ingest an uploaded file body. The filename is only used for the
    /// format guard; the bytes always land in the same slot.
    pub async fn ingest_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<IngestReceipt, IngestError> {
        if !has_accepted_extension(filename) {
            return Err(IngestError::FormatRejected(filename.to_string()));
        }
        self.run_pipeline(bytes).await
    }

    /// Ingest by reference: fetch the bytes from an HTTP/HTTPS URL, then
    /// run the same pipeline. A fetch failure never touches the store.
    pub async fn ingest_from_url(&self, url: &str) -> Result<IngestReceipt, IngestError> {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(IngestError::FetchFailed(format!(
                "unsupported URL scheme in '{url}'"
            )));
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::FetchFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::FetchFailed(format!("HTTP {status}")));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestError::FetchFailed(e.to_string()))?;

        self.run_pipeline(bytes.to_vec()).await
    }

    /// Re-ingest the persisted slot file at startup, if one exists.
    ///
    /// Failures are logged and swallowed: a stale or corrupt slot must
    /// never prevent the service from starting empty.
    pub async fn warm_load(&self) {
        if !self.slot_path.exists() {
            tracing::info!("No persisted dataset slot; starting empty");
            return;
        }
        let bytes = match tokio::fs::read(&self.slot_path).await {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(error = %e, "Warm load: could not read slot file");
                return;
            }
        };
        match self.run_pipeline(bytes).await {
            Ok(receipt) => tracing::info!(
                version = receipt.version,
                rows = receipt.rows,
                columns = receipt.columns,
                "Warm load: dataset restored from slot"
            ),
            Err(e) => tracing::warn!(error = %e, "Warm load failed; starting empty"),
        }
    }

    /// persist → decode → publish → rebind, under the ingest lock.
    async fn run_pipeline(&self, bytes: Vec<u8>) -> Result<IngestReceipt, IngestError> {
        let _guard = self.ingest_lock.lock().await;

        // 1. Persist raw bytes first, so an accepted upload survives a
        //    later decode failure.
        if let Some(parent) = self.slot_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| IngestError::PersistFailed(e.to_string()))?;
        }
        tokio::fs::write(&self.slot_path, &bytes)
            .await
            .map_err(|e| IngestError::PersistFailed(e.to_string()))?;

        // 2. Decode. A failure here aborts with the previous snapshot
        //    (and binding) intact.
        let table = decode(&bytes)?;

        // 3. Publish atomically.
        let snapshot = self
            .store
            .publish(table)
            .map_err(|e| IngestError::Internal(e.to_string()))?;

        tracing::info!(
            version = snapshot.version,
            rows = snapshot.table.row_count(),
            columns = snapshot.table.column_count(),
            "Dataset published"
        );

        // 4. Rebind the engine to the new snapshot. Degrade, don't roll
        //    back: the table stays published even if binding fails.
        let engine = Arc::clone(&self.engine);
        let bind_table = Arc::clone(&snapshot.table);
        let version = snapshot.version;
        let bind_result =
            tokio::task::spawn_blocking(move || engine.bind(&bind_table)).await;

        let new_binding = match bind_result {
            Ok(Ok(handle)) => {
                tracing::info!(version, "Reasoning engine bound");
                EngineBinding::Bound { version, handle }
            }
            Ok(Err(e)) => {
                tracing::warn!(version, error = %e, "Engine rebind failed; queries degraded");
                EngineBinding::Failed {
                    version,
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                tracing::warn!(version, error = %e, "Engine rebind task panicked");
                EngineBinding::Failed {
                    version,
                    reason: "rebind task failed".to_string(),
                }
            }
        };

        *self
            .binding
            .write()
            .map_err(|_| IngestError::Internal("binding lock poisoned".into()))? = new_binding;

        Ok(IngestReceipt {
            version: snapshot.version,
            rows: snapshot.table.row_count(),
            columns: snapshot.table.column_count(),
        })
    }
}

fn has_accepted_extension(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
