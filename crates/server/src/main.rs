use std::sync::Arc;

use anyhow::{Context, Error as AnyhowError};
use server::{routes, state::AppState};
use services::services::{
    backup::BackupGuard,
    config::{ConfigError, GatewayConfig},
    fetch::{FetchError, WebFetcher},
    llm::{GroqClient, LlmError},
    owner::{ProcessTerminator, ShellRunner},
    storage::{FileStorage, LocalFileStorage},
};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Other(#[from] AnyhowError),
}

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(&filter_string)
        .or_else(|_| EnvFilter::try_new("warn,server=info,services=info,utils=info"))
        .context("Failed to create tracing filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    let config = GatewayConfig::from_env()?;
    tracing::debug!("Loaded configuration: {:?}", config);
    if !config.has_api_key() {
        tracing::warn!("GROQ_API_KEY is not set - chat, stt and tts will answer 500");
    }

    // Snapshot and optional restore happen before the listener binds.
    let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage);
    let report = BackupGuard::new(storage.clone(), &config)
        .run(config.auto_restore)
        .await;
    if !report.is_clean() {
        tracing::warn!(
            "Backup phase finished with {} failure(s); continuing",
            report.failures.len()
        );
    }

    let llm = Arc::new(GroqClient::from_config(&config)?);
    let fetcher = WebFetcher::from_config(&config)?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState::new(
        config,
        llm,
        fetcher,
        storage,
        Arc::new(ShellRunner),
        Arc::new(ProcessTerminator),
    );
    let app_router = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Server listening on http://{local_addr}");

    axum::serve(listener, app_router.into_make_service()).await?;
    Ok(())
}
