//! Ingestion pipeline wiring

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoStore;
use tubely_processing::{
    AspectClassifier, ContainerNormalizer, StreamStager, ThumbnailIngestor, VideoIngestor,
};
use tubely_storage::Storage;

const SCRATCH_PREFIX: &str = "tubely-upload-";

/// Create the asset and scratch directories and assemble both ingestors.
pub async fn build_state(
    config: &Config,
    store: Arc<dyn VideoStore>,
    storage: Arc<dyn Storage>,
    classifier: Arc<dyn AspectClassifier>,
    normalizer: Arc<dyn ContainerNormalizer>,
) -> Result<Arc<AppState>> {
    tokio::fs::create_dir_all(config.assets_root())
        .await
        .with_context(|| {
            format!(
                "Failed to create assets directory {}",
                config.assets_root().display()
            )
        })?;
    tokio::fs::create_dir_all(config.scratch_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to create scratch directory {}",
                config.scratch_dir().display()
            )
        })?;

    let videos = VideoIngestor::new(
        store.clone(),
        storage.clone(),
        classifier,
        normalizer,
        StreamStager::new(config.scratch_dir().clone(), SCRATCH_PREFIX),
        config.max_video_size_bytes(),
    )
    .with_distribution_root(config.s3_distribution().map(String::from));

    let thumbnails = ThumbnailIngestor::new(
        store,
        config.scratch_dir().clone(),
        config.assets_root().clone(),
        config.assets_base_url(),
        config.max_thumbnail_size_bytes(),
    );

    tracing::info!(
        scratch_dir = %config.scratch_dir().display(),
        assets_root = %config.assets_root().display(),
        max_video_mb = config.max_video_size_bytes() / 1024 / 1024,
        max_thumbnail_mb = config.max_thumbnail_size_bytes() / 1024 / 1024,
        "Ingestion pipeline ready"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        storage,
        videos: Arc::new(videos),
        thumbnails: Arc::new(thumbnails),
    }))
}
