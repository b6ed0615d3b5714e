//! Query coordinator — admits questions and dispatches them against the
//! engine binding current at admission time.
//!
//! A query is pinned to the binding (and therefore the table version) it
//! was admitted with; a publish completing mid-flight does not affect it.
//! The coordinator holds no mutable state of its own and never retries:
//! repeated identical questions are independent dispatches and may yield
//! different answers from a non-deterministic engine.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::dataset::DatasetStore;
use crate::engine::EngineBinding;

/// A completed answer, tagged with the version it actually ran against.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
    pub version: u64,
}

/// Query-time failures. All are recoverable per-request and never touch
/// store state.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("Question cannot be empty")]
    EmptyQuestion,
    #[error("No dataset has been loaded")]
    NoData,
    #[error("Reasoning engine is not available: {0}")]
    AgentUnavailable(String),
    #[error("Reasoning engine failed: {0}")]
    EngineFailure(String),
    #[error("Internal state error: {0}")]
    Internal(String),
}

pub struct QueryCoordinator {
    store: Arc<DatasetStore>,
    binding: Arc<RwLock<EngineBinding>>,
}

impl QueryCoordinator {
    pub fn new(store: Arc<DatasetStore>, binding: Arc<RwLock<EngineBinding>>) -> Self {
        Self { store, binding }
    }

    /// Answer `question` against the currently bound dataset.
    ///
    /// Precondition order: empty question, then missing data, then
    /// missing engine binding. The binding (version + handle) is read
    /// once at admission; the blocking engine call runs on a blocking
    /// thread.
    pub async fn ask(&self, question: &str) -> Result<Answer, QueryError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(QueryError::EmptyQuestion);
        }

        let snapshot = self
            .store
            .current()
            .map_err(|e| QueryError::Internal(e.to_string()))?;
        if snapshot.is_none() {
            return Err(QueryError::NoData);
        }

        // Admission: pin the binding for the lifetime of this request.
        let (version, handle) = {
            let guard = self
                .binding
                .read()
                .map_err(|_| QueryError::Internal("binding lock poisoned".into()))?;
            match &*guard {
                EngineBinding::Bound { version, handle } => (*version, Arc::clone(handle)),
                EngineBinding::Failed { reason, .. } => {
                    return Err(QueryError::AgentUnavailable(reason.clone()))
                }
                EngineBinding::Unbound => {
                    return Err(QueryError::AgentUnavailable(
                        "engine has not been bound".into(),
                    ))
                }
            }
        };

        tracing::debug!(version, "Query admitted");

        let owned_question = question.to_string();
        let result =
            tokio::task::spawn_blocking(move || handle.answer(&owned_question)).await;

        match result {
            Ok(Ok(text)) => Ok(Answer {
                question: question.to_string(),
                answer: text,
                version,
            }),
            Ok(Err(e)) => Err(QueryError::EngineFailure(e.to_string())),
            Err(_) => Err(QueryError::EngineFailure("engine task failed".into())),
        }
    }
}
