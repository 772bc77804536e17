//! Video upload orchestration.

use crate::aspect::{AspectBucket, AspectClassifier};
use crate::error::{IngestError, IngestResult};
use crate::keys::{plan_object_key, ObjectKey};
use crate::media_type::{ensure_video_mp4, VIDEO_MP4};
use crate::normalize::ContainerNormalizer;
use crate::stager::StreamStager;
use bytes::Bytes;
use futures::Stream;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Instant;
use tubely_core::models::Video;
use tubely_db::VideoStore;
use tubely_storage::Storage;
use uuid::Uuid;

/// One inbound upload. `byte_stream` is consumed exactly once.
pub struct UploadRequest<S> {
    pub video_id: Uuid,
    pub owner_id: Uuid,
    pub content_type: String,
    pub declared_size: Option<u64>,
    pub byte_stream: S,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub key: ObjectKey,
    pub public_url: String,
    pub video: Video,
}

/// Look up `video_id` and check that `user_id` owns it.
pub(crate) async fn authorize(
    store: &dyn VideoStore,
    video_id: Uuid,
    user_id: Uuid,
) -> IngestResult<Video> {
    let video = store
        .get_video(video_id)
        .await
        .map_err(IngestError::MetadataLookupFailed)?
        .ok_or(IngestError::VideoNotFound(video_id))?;

    if !video.is_owned_by(user_id) {
        tracing::warn!(
            video_id = %video_id,
            user_id = %user_id,
            owner_id = %video.user_id,
            "Upload rejected: caller does not own video"
        );
        return Err(IngestError::Forbidden { video_id, user_id });
    }

    Ok(video)
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Runs `Staged → Classified → Normalized → KeyPlanned → Uploaded → Done`.
///
/// Every temporary file is held by a guard, so each early return releases
/// what the earlier stages created.
pub struct VideoIngestor {
    store: Arc<dyn VideoStore>,
    storage: Arc<dyn Storage>,
    classifier: Arc<dyn AspectClassifier>,
    normalizer: Arc<dyn ContainerNormalizer>,
    stager: StreamStager,
    max_video_size: u64,
    distribution_root: Option<String>,
}

impl VideoIngestor {
    pub fn new(
        store: Arc<dyn VideoStore>,
        storage: Arc<dyn Storage>,
        classifier: Arc<dyn AspectClassifier>,
        normalizer: Arc<dyn ContainerNormalizer>,
        stager: StreamStager,
        max_video_size: u64,
    ) -> Self {
        Self {
            store,
            storage,
            classifier,
            normalizer,
            stager,
            max_video_size,
            distribution_root: None,
        }
    }

    /// Publish URLs under this root (e.g. a CDN domain) instead of the
    /// storage backend's own URL.
    pub fn with_distribution_root(mut self, root: Option<String>) -> Self {
        self.distribution_root = root.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn max_video_size(&self) -> u64 {
        self.max_video_size
    }

    pub async fn authorize(&self, video_id: Uuid, user_id: Uuid) -> IngestResult<Video> {
        authorize(self.store.as_ref(), video_id, user_id).await
    }

    /// Full pipeline: ownership, content type, then [`Self::ingest_authorized`].
    pub async fn ingest<S, E>(&self, request: UploadRequest<S>) -> IngestResult<IngestOutcome>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let video = self.authorize(request.video_id, request.owner_id).await?;
        self.ingest_authorized(
            video,
            &request.content_type,
            request.declared_size,
            request.byte_stream,
        )
        .await
    }

    /// Pipeline for a record whose ownership was already checked.
    #[tracing::instrument(skip_all, fields(video.id = %video.id, user.id = %video.user_id))]
    pub async fn ingest_authorized<S, E>(
        &self,
        mut video: Video,
        content_type: &str,
        declared_size: Option<u64>,
        byte_stream: S,
    ) -> IngestResult<IngestOutcome>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let started = Instant::now();
        ensure_video_mp4(content_type)?;

        let stage_start = Instant::now();
        let staged = self
            .stager
            .stage(byte_stream, self.max_video_size, declared_size)
            .await?;
        tracing::info!(
            stage = "staged",
            size_bytes = staged.size(),
            duration_ms = elapsed_ms(stage_start),
            "Upload staged"
        );

        let stage_start = Instant::now();
        let bucket: AspectBucket = self.classifier.classify(staged.path()).await?;
        tracing::info!(
            stage = "classified",
            bucket = %bucket,
            duration_ms = elapsed_ms(stage_start),
            "Video classified"
        );

        let stage_start = Instant::now();
        let normalized = self.normalizer.normalize(staged.path()).await?;
        staged.discard();
        tracing::info!(
            stage = "normalized",
            size_bytes = normalized.size(),
            duration_ms = elapsed_ms(stage_start),
            "Video normalized"
        );

        let key = plan_object_key(bucket, &mut rand::rngs::OsRng)?;
        let storage_key = key.to_string();

        let stage_start = Instant::now();
        let reader = normalized.open().await?;
        let storage_url = self
            .storage
            .put_stream(
                &storage_key,
                VIDEO_MP4,
                Some(normalized.size()),
                Box::pin(reader),
            )
            .await
            .map_err(IngestError::UploadFailed)?;
        drop(normalized);
        tracing::info!(
            stage = "uploaded",
            storage.key = %storage_key,
            storage.backend = %self.storage.backend_type(),
            duration_ms = elapsed_ms(stage_start),
            "Video uploaded"
        );

        let public_url = match &self.distribution_root {
            Some(root) => key.public_url(root),
            None => storage_url,
        };

        video.video_url = Some(public_url.clone());
        let video = match self.store.update_video(&video).await {
            Ok(updated) => updated,
            Err(source) => {
                tracing::warn!(
                    error = %source,
                    storage.key = %storage_key,
                    "Metadata update failed; stored object is orphaned"
                );
                return Err(IngestError::MetadataUpdateFailed {
                    video_id: video.id,
                    location: storage_key,
                    source,
                });
            }
        };

        tracing::info!(
            stage = "done",
            video_url = %public_url,
            duration_ms = elapsed_ms(started),
            "Video upload complete"
        );

        Ok(IngestOutcome {
            key,
            public_url,
            video,
        })
    }
}
