mod handlers;
mod metrics;
mod routes;

use algojudge_common::config::Settings;
use algojudge_engine::{Grader, LanguageConfigManager, NodeSandbox};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

pub struct AppState {
    pub grader: Grader,
    pub languages: Arc<LanguageConfigManager>,
    /// Cancellation handles of runs currently executing
    runs: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl AppState {
    pub fn new(languages: Arc<LanguageConfigManager>) -> Self {
        metrics::register();
        Self {
            grader: Grader::from_config(languages.clone()),
            languages,
            runs: Mutex::new(HashMap::new()),
        }
    }

    pub fn runs(&self) -> MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env();
    init_tracing(settings.json_logs);

    info!("AlgoJudge API booting...");

    let mut languages = LanguageConfigManager::load_or_builtin(&settings.languages_path)
        .context("Failed to load language configuration")?;
    languages.apply_settings(&settings);
    info!(
        languages = ?languages.list_languages(),
        runtime = %languages.runtime().command,
        timeout_ms = languages.runtime().timeout_ms,
        "Language configuration loaded"
    );

    match NodeSandbox::new(languages.runtime()).probe().await {
        Ok(version) => info!(version = %version, "JavaScript runtime available"),
        Err(e) => warn!(error = %e, "JavaScript runtime not available; every test case will fail"),
    }

    let state = Arc::new(AppState::new(Arc::new(languages)));
    let app = routes::routes().with_state(state);

    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;

    info!("HTTP server listening on {}", settings.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
