//! Application setup and initialization

pub mod database;
pub mod processing;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;
use tubely_processing::{FfmpegFastStart, FfprobeClassifier};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let state = processing::build_state(
        &config,
        Arc::new(VideoRepository::new(pool)),
        storage,
        Arc::new(FfprobeClassifier::new(config.ffprobe_path())),
        Arc::new(FfmpegFastStart::new(config.ffmpeg_path())),
    )
    .await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
