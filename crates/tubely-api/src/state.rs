//! Application state shared by all handlers.

use std::sync::Arc;
use tubely_core::Config;
use tubely_processing::{ThumbnailIngestor, VideoIngestor};
use tubely_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub videos: Arc<VideoIngestor>,
    pub thumbnails: Arc<ThumbnailIngestor>,
}
