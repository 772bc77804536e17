//! Thumbnail uploads: stage in scratch, then move into the asset directory.

use crate::error::{IngestError, IngestResult};
use crate::ingest::{authorize, UploadRequest};
use crate::keys::random_token;
use crate::media_type::thumbnail_extension;
use crate::stager::StreamStager;
use bytes::Bytes;
use futures::Stream;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tubely_core::models::Video;
use tubely_db::VideoStore;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ThumbnailOutcome {
    pub filename: String,
    pub public_url: String,
    pub video: Video,
}

pub struct ThumbnailIngestor {
    store: Arc<dyn VideoStore>,
    stager: StreamStager,
    assets_root: PathBuf,
    assets_base_url: String,
    max_thumbnail_size: u64,
}

impl ThumbnailIngestor {
    /// Uploads are staged in `scratch_dir` so the served `assets_root` only
    /// ever holds finished files. Both directories must exist.
    pub fn new(
        store: Arc<dyn VideoStore>,
        scratch_dir: impl Into<PathBuf>,
        assets_root: impl Into<PathBuf>,
        assets_base_url: impl Into<String>,
        max_thumbnail_size: u64,
    ) -> Self {
        Self {
            store,
            stager: StreamStager::new(scratch_dir, "tubely-thumb-"),
            assets_root: assets_root.into(),
            assets_base_url: assets_base_url.into(),
            max_thumbnail_size,
        }
    }

    pub fn assets_root(&self) -> &Path {
        &self.assets_root
    }

    pub fn max_thumbnail_size(&self) -> u64 {
        self.max_thumbnail_size
    }

    pub async fn authorize(&self, video_id: Uuid, user_id: Uuid) -> IngestResult<Video> {
        authorize(self.store.as_ref(), video_id, user_id).await
    }

    pub async fn ingest<S, E>(&self, request: UploadRequest<S>) -> IngestResult<ThumbnailOutcome>
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

    #[tracing::instrument(skip_all, fields(video.id = %video.id, user.id = %video.user_id))]
    pub async fn ingest_authorized<S, E>(
        &self,
        mut video: Video,
        content_type: &str,
        declared_size: Option<u64>,
        byte_stream: S,
    ) -> IngestResult<ThumbnailOutcome>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        let start = std::time::Instant::now();
        let extension = thumbnail_extension(content_type)?;

        let staged = self
            .stager
            .stage(byte_stream, self.max_thumbnail_size, declared_size)
            .await?;
        let size = staged.size();

        let filename = format!("{}.{}", random_token(&mut rand::rngs::OsRng)?, extension);
        staged.persist(&self.assets_root.join(&filename)).await?;

        let public_url = format!("{}/{}", self.assets_base_url.trim_end_matches('/'), filename);

        video.thumbnail_url = Some(public_url.clone());
        let video = self.store.update_video(&video).await.map_err(|source| {
            tracing::warn!(
                error = %source,
                filename = %filename,
                "Metadata update failed; thumbnail file remains in assets"
            );
            IngestError::MetadataUpdateFailed {
                video_id: video.id,
                location: filename.clone(),
                source,
            }
        })?;

        tracing::info!(
            filename = %filename,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Thumbnail stored"
        );

        Ok(ThumbnailOutcome {
            filename,
            public_url,
            video,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::InMemoryVideoStore;
    use futures::{stream, StreamExt};
    use std::io;
    use tempfile::tempdir;

    fn body(data: &'static [u8]) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
        stream::iter(vec![Ok(Bytes::from_static(data))])
    }

    fn files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    struct Setup {
        scratch: tempfile::TempDir,
        assets: tempfile::TempDir,
        store: InMemoryVideoStore,
        video: Video,
        ingestor: ThumbnailIngestor,
    }

    fn setup() -> Setup {
        let scratch = tempdir().unwrap();
        let assets = tempdir().unwrap();
        let store = InMemoryVideoStore::new();
        let video = Video::new(Uuid::new_v4(), "Boots", "");
        store.insert(video.clone());
        let ingestor = ThumbnailIngestor::new(
            Arc::new(store.clone()),
            scratch.path(),
            assets.path(),
            "http://localhost:8091/assets/",
            64,
        );
        Setup {
            scratch,
            assets,
            store,
            video,
            ingestor,
        }
    }

    fn request(
        video: &Video,
        content_type: &str,
        data: &'static [u8],
    ) -> UploadRequest<impl Stream<Item = Result<Bytes, io::Error>> + Send> {
        UploadRequest {
            video_id: video.id,
            owner_id: video.user_id,
            content_type: content_type.to_string(),
            declared_size: None,
            byte_stream: body(data),
        }
    }

    #[tokio::test]
    async fn test_thumbnail_written_under_random_name() {
        let Setup {
            scratch,
            assets,
            store,
            video,
            ingestor,
        } = setup();

        let outcome = ingestor
            .ingest(request(&video, "image/png", b"\x89PNG fake"))
            .await
            .unwrap();

        assert!(outcome.filename.ends_with(".png"));
        assert_eq!(outcome.filename.len(), 43 + ".png".len());
        assert_eq!(
            outcome.public_url,
            format!("http://localhost:8091/assets/{}", outcome.filename)
        );
        assert_eq!(files(assets.path()), vec![outcome.filename.clone()]);
        assert!(files(scratch.path()).is_empty());
        assert_eq!(
            std::fs::read(assets.path().join(&outcome.filename)).unwrap(),
            b"\x89PNG fake"
        );
        assert_eq!(
            store.get(video.id).unwrap().thumbnail_url,
            Some(outcome.public_url)
        );
    }

    #[tokio::test]
    async fn test_thumbnail_rejects_non_image() {
        let Setup {
            scratch,
            assets,
            video,
            ingestor,
            ..
        } = setup();

        let result = ingestor.ingest(request(&video, "video/mp4", b"data")).await;

        assert!(matches!(result, Err(IngestError::UnsupportedMediaType(_))));
        assert!(files(assets.path()).is_empty());
        assert!(files(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_oversize_thumbnail_leaves_nothing() {
        let Setup {
            scratch,
            assets,
            video,
            ingestor,
            ..
        } = setup();

        let result = ingestor
            .ingest(request(&video, "image/jpeg", &[7u8; 128]))
            .await;

        assert!(matches!(result, Err(IngestError::PayloadTooLarge { limit: 64 })));
        assert!(files(assets.path()).is_empty());
        assert!(files(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_thumbnail_requires_owner() {
        let Setup {
            scratch,
            assets,
            video,
            ingestor,
            ..
        } = setup();

        let mut req = request(&video, "image/png", b"png");
        req.owner_id = Uuid::new_v4();
        let result = ingestor.ingest(req).await;

        assert!(matches!(result, Err(IngestError::Forbidden { .. })));
        assert!(files(assets.path()).is_empty());
        assert!(files(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_upload_is_not_in_assets() {
        let Setup {
            scratch,
            assets,
            video,
            ingestor,
            ..
        } = setup();
        let (release, released) = tokio::sync::oneshot::channel::<()>();

        let byte_stream = stream::iter(vec![Ok(Bytes::from_static(b"\x89PNG"))]).chain(
            stream::once(async move {
                let _ = released.await;
                Ok::<_, io::Error>(Bytes::from_static(b" rest"))
            }),
        );
        let upload = ingestor.ingest_authorized(video, "image/png", None, byte_stream);

        let observe = async {
            let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
            while files(scratch.path()).is_empty() {
                assert!(std::time::Instant::now() < deadline, "upload never staged");
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            assert!(files(assets.path()).is_empty());
            release.send(()).unwrap();
        };

        let (outcome, ()) = tokio::join!(upload, observe);
        let outcome = outcome.unwrap();

        assert_eq!(files(assets.path()), vec![outcome.filename.clone()]);
        assert_eq!(
            std::fs::read(assets.path().join(&outcome.filename)).unwrap(),
            b"\x89PNG rest"
        );
        assert!(files(scratch.path()).is_empty());
    }

    #[tokio::test]
    async fn test_thumbnail_metadata_failure_reports_filename() {
        let Setup {
            scratch,
            assets,
            store,
            video,
            ingestor,
        } = setup();
        store.fail_updates(true);

        let result = ingestor.ingest(request(&video, "image/gif", b"GIF89a")).await;

        match result {
            Err(IngestError::MetadataUpdateFailed { location, .. }) => {
                assert!(location.ends_with(".gif"));
                assert_eq!(files(assets.path()), vec![location]);
                assert!(files(scratch.path()).is_empty());
            }
            other => panic!("expected MetadataUpdateFailed, got {:?}", other),
        }
    }
}
