//! Reasoning engine adapter — the boundary to the external LLM.
//!
//! `ReasoningEngine::bind` pairs the engine with one published table and
//! returns a `Handle` that answers questions against exactly that table.
//! The lifecycle manager rebuilds the binding on every publish; the query
//! coordinator only ever reads it.
//!
//! The production engine talks to a local Ollama instance over HTTP with
//! `reqwest::blocking`, so `bind` and `answer` must run on a blocking
//! thread (`tokio::task::spawn_blocking`), never directly on the async
//! runtime.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::table::Table;

/// Errors at the engine boundary. `bind`-time failures leave the binding
/// in `EngineBinding::Failed`; `answer`-time failures surface to the
/// caller as query errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Cannot reach reasoning engine at {0}")]
    Connection(String),
    #[error("Engine request timed out after {0}s")]
    Timeout(u64),
    #[error("Engine HTTP error: {0}")]
    Http(String),
    #[error("Engine returned HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },
    #[error("Could not parse engine response: {0}")]
    ResponseParsing(String),
    #[error("Model '{0}' is not available on the engine")]
    ModelUnavailable(String),
}

/// A question-answering handle bound to one table.
pub trait EngineHandle: Send + Sync {
    fn answer(&self, question: &str) -> Result<String, EngineError>;
}

/// Factory for handles. Binding may itself fail (engine down, model
/// missing), which is distinct from a failed answer.
pub trait ReasoningEngine: Send + Sync {
    fn bind(&self, table: &Table) -> Result<Arc<dyn EngineHandle>, EngineError>;
}

// ═══════════════════════════════════════════════════════════
// Binding state machine
// ═══════════════════════════════════════════════════════════

/// Two-phase state per published version: data first, capability second.
///
/// `Failed` means a table is published but the engine could not be bound
/// to it — data stays servable through the metadata surfaces while
/// queries report the engine as unavailable.
#[derive(Clone)]
pub enum EngineBinding {
    Unbound,
    Bound {
        version: u64,
        handle: Arc<dyn EngineHandle>,
    },
    Failed {
        version: u64,
        reason: String,
    },
}

impl EngineBinding {
    /// The bound handle plus the version it was built against, if any.
    pub fn bound(&self) -> Option<(u64, Arc<dyn EngineHandle>)> {
        match self {
            EngineBinding::Bound { version, handle } => Some((*version, Arc::clone(handle))),
            _ => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, EngineBinding::Bound { .. })
    }
}

impl std::fmt::Debug for EngineBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineBinding::Unbound => write!(f, "Unbound"),
            EngineBinding::Bound { version, .. } => write!(f, "Bound(v{version})"),
            EngineBinding::Failed { version, reason } => {
                write!(f, "Failed(v{version}: {reason})")
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Ollama engine
// ═══════════════════════════════════════════════════════════

/// Ollama-backed reasoning engine.
///
/// The blocking HTTP client is built inside `bind` so construction stays
/// cheap and runtime-safe; `bind` itself verifies the configured model is
/// present before handing out a handle.
pub struct OllamaEngine {
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaEngine {
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_client(&self) -> Result<reqwest::blocking::Client, EngineError> {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| EngineError::Http(e.to_string()))
    }

    fn list_models(&self, client: &reqwest::blocking::Client) -> Result<Vec<String>, EngineError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = client.get(&url).send().map_err(|e| {
            if e.is_connect() {
                EngineError::Connection(self.base_url.clone())
            } else {
                EngineError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| EngineError::ResponseParsing(e.to_string()))?;
        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }
}

impl ReasoningEngine for OllamaEngine {
    fn bind(&self, table: &Table) -> Result<Arc<dyn EngineHandle>, EngineError> {
        let client = self.build_client()?;

        let available = self.list_models(&client)?;
        if !available.iter().any(|m| m.starts_with(&self.model)) {
            return Err(EngineError::ModelUnavailable(self.model.clone()));
        }

        Ok(Arc::new(OllamaHandle {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            system: build_system_prompt(table),
            client,
            timeout_secs: self.timeout_secs,
        }))
    }
}

/// Handle bound to one table: carries the rendered dataset as the system
/// prompt so every question runs against the same data.
struct OllamaHandle {
    base_url: String,
    model: String,
    system: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

impl EngineHandle for OllamaHandle {
    fn answer(&self, question: &str) -> Result<String, EngineError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &self.model,
            prompt: question,
            system: &self.system,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                EngineError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                EngineError::Timeout(self.timeout_secs)
            } else {
                EngineError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EngineError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| EngineError::ResponseParsing(e.to_string()))?;
        Ok(parsed.response)
    }
}

/// Render the bound table into the system prompt handed to the model.
fn build_system_prompt(table: &Table) -> String {
    format!(
        "You answer questions about a single tabular dataset.\n\
         The dataset has {} rows and {} columns: {}.\n\
         The full dataset in CSV form follows.\n\n{}\n\
         Answer using only this data. Be concise and state numbers exactly.",
        table.row_count(),
        table.column_count(),
        table.columns().join(", "),
        table.to_csv_text(),
    )
}

// ═══════════════════════════════════════════════════════════
// Mock engine for tests
// ═══════════════════════════════════════════════════════════

/// Mock engine returning a configurable answer; can be told to fail at
/// bind time or at answer time. Questions reaching any of its handles
/// are recorded so tests can assert on what was actually dispatched.
pub struct MockEngine {
    response: String,
    fail_bind: bool,
    fail_answer: bool,
    questions: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            fail_bind: false,
            fail_answer: false,
            questions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    pub fn failing_answer(mut self) -> Self {
        self.fail_answer = true;
        self
    }

    /// Questions that reached the engine, in dispatch order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl ReasoningEngine for MockEngine {
    fn bind(&self, table: &Table) -> Result<Arc<dyn EngineHandle>, EngineError> {
        if self.fail_bind {
            return Err(EngineError::Connection("mock engine down".into()));
        }
        Ok(Arc::new(MockHandle {
            response: self.response.clone(),
            fail_answer: self.fail_answer,
            bound_columns: table.columns().to_vec(),
            questions: Arc::clone(&self.questions),
        }))
    }
}

struct MockHandle {
    response: String,
    fail_answer: bool,
    bound_columns: Vec<String>,
    questions: Arc<Mutex<Vec<String>>>,
}

impl EngineHandle for MockHandle {
    fn answer(&self, question: &str) -> Result<String, EngineError> {
        if self.fail_answer {
            return Err(EngineError::Timeout(1));
        }
        if let Ok(mut seen) = self.questions.lock() {
            seen.push(question.to_string());
        }
        Ok(format!(
            "{} [columns: {}]",
            self.response,
            self.bound_columns.join(",")
        ))
    }
}
