//! Startup helpers for the support-desk agent server.

use std::process::ExitCode;

use crate::config::AppConfig;
use crate::server::{self, AppState};

/// Run the server until Ctrl+C (used by the `support-desk-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting support desk agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };
    tracing::info!(
        assistant_model = %config.llm.assistant_model,
        knowledge_base = config.llm.vector_store_id.is_some(),
        desk_api = %config.desk.api_url,
        "configuration loaded"
    );

    let state = match AppState::new(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to create state: {e:#}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    };

    if let Err(e) = rt.block_on(server::run_server_with_shutdown(state, config.server.port, shutdown)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Read and validate the configuration from the environment.
///
/// # Errors
/// Returns an error if a variable is malformed or a required one is missing.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let config = AppConfig::from_env()?;
    config.validate()?;
    Ok(config)
}
