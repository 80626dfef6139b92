mod api;
mod batcher;
mod catalog;
mod completion;
mod config;
mod languages;
mod prompts;
mod reply;
mod runner;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::AppState;
use crate::batcher::RequestBatcher;
use crate::catalog::CourseCatalog;
use crate::completion::{CompletionClient, OpenAiClient};
use crate::config::ServiceConfig;
use crate::languages::LanguageTable;
use crate::prompts::{FeaturePrompts, PromptTable};
use crate::runner::ProcessRunner;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codementor=info".parse()?),
        )
        .init();

    info!("Starting Code Mentor gateway...");

    let config = ServiceConfig::from_env()?;
    info!("Loaded configuration: {:?}", config);

    // Load prompt tables
    let prompts = match &config.prompts_dir {
        Some(dir) => PromptTable::load_dir(dir)?,
        None => PromptTable::builtin(),
    };
    info!("Loaded system prompts for kinds: {:?}", prompts.kinds());

    let features = match &config.features_config {
        Some(path) => FeaturePrompts::load(path)?,
        None => FeaturePrompts::builtin()?,
    };
    if features.is_empty() {
        warn!("No feature prompts configured, /compiler-features will reject every request");
    } else {
        info!("Loaded {} feature prompts", features.len());
    }

    // Load language configurations
    let languages = LanguageTable::builtin()?;
    info!("Supported languages: {:?}", languages.supported_languages());

    let client: Arc<dyn CompletionClient> = Arc::new(
        OpenAiClient::new(
            &config.api_base_url,
            config.api_key.clone(),
            config.model.clone(),
            config.http_timeout,
        )
        .context("Failed to build completion client")?,
    );

    let batcher = RequestBatcher::spawn(Arc::clone(&client), prompts, config.batcher_config());
    info!(
        "Request batcher running (window {}ms)",
        config.batch_window.as_millis()
    );

    let runner = ProcessRunner::new(languages, config.runner_config());
    info!(
        "Process runner ready (deadline {}ms, scratch dir {:?})",
        config.run_deadline.as_millis(),
        config.scratch_dir
    );

    let catalog = CourseCatalog::new(config.courses_url.clone(), config.http_timeout)?;

    let state = AppState {
        batcher: batcher.clone(),
        client,
        runner: Arc::new(runner),
        features: Arc::new(features),
        catalog,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Listening on {}", config.bind_addr);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!(
        "Shut down cleanly after {} dispatched batches",
        batcher.batches_dispatched()
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
