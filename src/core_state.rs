//! Transport-agnostic application state.
//!
//! `CoreState` wires the dataset store, the engine binding, the
//! lifecycle manager and the query coordinator together and is shared
//! via `Arc` between the HTTP server and any future transport. The store
//! and binding are the only mutable pieces, and only the lifecycle
//! manager writes them.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;

use crate::config::Settings;
use crate::dataset::DatasetStore;
use crate::engine::{EngineBinding, OllamaEngine, ReasoningEngine};
use crate::lifecycle::LifecycleManager;
use crate::query::QueryCoordinator;
use crate::users::UserDirectory;

/// Read-only health report over the current snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub has_data: bool,
    pub rows: usize,
    pub columns: usize,
    pub version: u64,
    pub engine_bound: bool,
}

/// Metadata of the current snapshot; `None` when nothing is published.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub version: u64,
}

pub struct CoreState {
    pub settings: Settings,
    pub store: Arc<DatasetStore>,
    pub lifecycle: LifecycleManager,
    pub query: QueryCoordinator,
    pub users: UserDirectory,
    binding: Arc<RwLock<EngineBinding>>,
}

impl CoreState {
    /// Production wiring: Ollama-backed reasoning engine.
    pub fn new(settings: Settings) -> Self {
        let engine = Arc::new(OllamaEngine::new(
            &settings.engine_url,
            &settings.engine_model,
            settings.engine_timeout_secs,
        ));
        Self::with_engine(settings, engine)
    }

    /// Wiring with an injected engine (tests use `MockEngine`).
    pub fn with_engine(settings: Settings, engine: Arc<dyn ReasoningEngine>) -> Self {
        let store = Arc::new(DatasetStore::new());
        let binding = Arc::new(RwLock::new(EngineBinding::Unbound));
        let lifecycle = LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&binding),
            engine,
            settings.slot_path(),
            Duration::from_secs(settings.fetch_timeout_secs),
        );
        let query = QueryCoordinator::new(Arc::clone(&store), Arc::clone(&binding));

        Self {
            settings,
            store,
            lifecycle,
            query,
            users: UserDirectory::with_defaults(),
            binding,
        }
    }

    pub fn status(&self) -> StatusReport {
        let snapshot = self.store.current().ok().flatten();
        let engine_bound = self
            .binding
            .read()
            .map(|b| b.is_bound())
            .unwrap_or(false);
        match snapshot {
            Some(s) => StatusReport {
                has_data: true,
                rows: s.table.row_count(),
                columns: s.table.column_count(),
                version: s.version,
                engine_bound,
            },
            None => StatusReport {
                has_data: false,
                rows: 0,
                columns: 0,
                version: 0,
                engine_bound,
            },
        }
    }

    pub fn dataset_info(&self) -> Option<DatasetInfo> {
        let snapshot = self.store.current().ok().flatten()?;
        Some(DatasetInfo {
            rows: snapshot.table.row_count(),
            columns: snapshot.table.column_count(),
            column_names: snapshot.table.columns().to_vec(),
            version: snapshot.version,
        })
    }
}
