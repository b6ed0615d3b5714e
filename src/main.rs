use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use tableqa::api::start_api_server;
use tableqa::config::{self, Settings};
use tableqa::CoreState;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let settings = Settings::from_env();
    let core = Arc::new(CoreState::new(settings.clone()));

    // Re-ingest the persisted slot from a previous run, if any.
    core.lifecycle.warm_load().await;

    let mut server = match start_api_server(core, settings.bind_addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start API server: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }

    tracing::info!("Shutting down");
    server.shutdown();
    server.wait().await;

    ExitCode::SUCCESS
}
