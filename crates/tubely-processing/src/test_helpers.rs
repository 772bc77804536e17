//! In-process doubles for the pipeline's collaborators.

use crate::aspect::{AspectBucket, AspectClassifier};
use crate::error::{IngestError, IngestResult};
use crate::normalize::{processing_path, ContainerNormalizer, NormalizedFile};
use crate::tool::run_tool;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tubely_core::models::Video;
use tubely_core::AppError;
use tubely_db::VideoStore;
use uuid::Uuid;

/// Video store backed by a shared map. Clones see the same records.
#[derive(Clone, Default)]
pub struct InMemoryVideoStore {
    videos: Arc<Mutex<HashMap<Uuid, Video>>>,
    fail_updates: Arc<AtomicBool>,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn videos(&self) -> MutexGuard<'_, HashMap<Uuid, Video>> {
        self.videos.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, video: Video) {
        self.videos().insert(video.id, video);
    }

    pub fn get(&self, id: Uuid) -> Option<Video> {
        self.videos().get(&id).cloned()
    }

    /// Make every subsequent `update_video` fail.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.get(id))
    }

    async fn update_video(&self, video: &Video) -> Result<Video, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("connection reset by peer".to_string()));
        }
        let mut videos = self.videos();
        let Some(slot) = videos.get_mut(&video.id) else {
            return Err(AppError::NotFound(format!("Video {} not found", video.id)));
        };
        *slot = Video {
            updated_at: chrono::Utc::now(),
            ..video.clone()
        };
        Ok(slot.clone())
    }
}

/// Classifier that reports a fixed ratio string, or fails like a crashed probe.
pub struct StaticClassifier {
    ratio: Option<String>,
}

impl StaticClassifier {
    pub fn ratio(ratio: &str) -> Self {
        Self {
            ratio: Some(ratio.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { ratio: None }
    }
}

#[async_trait]
impl AspectClassifier for StaticClassifier {
    async fn classify(&self, path: &Path) -> IngestResult<AspectBucket> {
        if !path.exists() {
            return Err(IngestError::ProbeFailed(format!(
                "{} does not exist",
                path.display()
            )));
        }
        match &self.ratio {
            Some(ratio) => Ok(AspectBucket::from_ratio(ratio)),
            None => Err(IngestError::ProbeFailed(
                "ffprobe exited with exit status: 1".to_string(),
            )),
        }
    }
}

/// Normalizer that copies its input verbatim and counts invocations.
#[derive(Default)]
pub struct CopyNormalizer {
    fail: bool,
    calls: AtomicUsize,
}

impl CopyNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes a partial output, then fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContainerNormalizer for CopyNormalizer {
    async fn normalize(&self, input: &Path) -> IngestResult<NormalizedFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = processing_path(input);

        if self.fail {
            let partial = tempfile::TempPath::from_path(&output);
            tokio::fs::write(&partial, b"moov")
                .await
                .map_err(|e| IngestError::NormalizeFailed(e.to_string()))?;
            return Err(IngestError::NormalizeFailed(
                "ffmpeg exited with exit status: 1".to_string(),
            ));
        }

        tokio::fs::copy(input, &output)
            .await
            .map_err(|e| IngestError::NormalizeFailed(e.to_string()))?;
        NormalizedFile::from_path(output)
    }
}

/// Render a one-second test pattern MP4 into `dir`.
///
/// Returns `None` when ffmpeg is not installed.
pub async fn synth_clip(dir: &Path, width: u32, height: u32) -> Option<PathBuf> {
    let output = dir.join(format!("clip-{}x{}.mp4", width, height));
    let source = format!("testsrc=size={}x{}:rate=10:duration=1", width, height);

    let args = [
        "-nostdin",
        "-v",
        "error",
        "-f",
        "lavfi",
        "-i",
        source.as_str(),
        "-c:v",
        "mpeg4",
        "-pix_fmt",
        "yuv420p",
        "-y",
    ]
    .into_iter()
    .map(std::ffi::OsStr::new)
    .chain(std::iter::once(output.as_os_str()));

    run_tool("ffmpeg", args).await.ok()?;
    output.exists().then_some(output)
}
