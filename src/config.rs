//! Runtime configuration — environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const APP_NAME: &str = "tableqa";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,tableqa=debug"
}

/// Application data directory: `~/.tableqa/` (falls back to a relative
/// directory when no home directory can be determined).
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".tableqa"))
        .unwrap_or_else(|| PathBuf::from(".tableqa"))
}

/// All runtime knobs. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the HTTP API binds to.
    pub bind_addr: SocketAddr,
    /// Directory holding the single dataset slot file.
    pub data_dir: PathBuf,
    /// Base URL of the Ollama instance backing the reasoning engine.
    pub engine_url: String,
    /// Model the engine binds to.
    pub engine_model: String,
    /// Timeout for one engine inference call.
    pub engine_timeout_secs: u64,
    /// Timeout for ingestion-by-URL fetches.
    pub fetch_timeout_secs: u64,
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let bind_addr = std::env::var("TABLEQA_BIND")
            .ok()
            .and_then(|v| match v.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!(value = %v, "Invalid TABLEQA_BIND, using default");
                    None
                }
            })
            .unwrap_or(defaults.bind_addr);

        Self {
            bind_addr,
            data_dir: std::env::var("TABLEQA_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            engine_url: std::env::var("TABLEQA_ENGINE_URL").unwrap_or(defaults.engine_url),
            engine_model: std::env::var("TABLEQA_MODEL").unwrap_or(defaults.engine_model),
            engine_timeout_secs: env_u64("TABLEQA_ENGINE_TIMEOUT_SECS", defaults.engine_timeout_secs),
            fetch_timeout_secs: env_u64("TABLEQA_FETCH_TIMEOUT_SECS", defaults.fetch_timeout_secs),
        }
    }

    /// The single overwritten location raw uploads are persisted to.
    /// Latest upload wins; there is no versioned file history.
    pub fn slot_path(&self) -> PathBuf {
        self.data_dir.join("dataset.csv")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            data_dir: default_data_dir(),
            engine_url: "http://localhost:11434".to_string(),
            engine_model: "llama3".to_string(),
            engine_timeout_secs: 300,
            fetch_timeout_secs: 30,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_local() {
        let settings = Settings::default();
        assert_eq!(settings.bind_addr.port(), 8000);
        assert_eq!(settings.engine_url, "http://localhost:11434");
        assert_eq!(settings.fetch_timeout_secs, 30);
    }

    #[test]
    fn slot_path_is_under_data_dir() {
        let settings = Settings {
            data_dir: PathBuf::from("/tmp/qa"),
            ..Settings::default()
        };
        assert_eq!(settings.slot_path(), PathBuf::from("/tmp/qa/dataset.csv"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
