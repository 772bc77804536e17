//! Fast-start remux of staged MP4 files.

use crate::error::{IngestError, IngestResult};
use crate::tool::{check_media_path, run_tool};
use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Remuxed copy of a staged upload. Dropping it removes the file.
#[derive(Debug)]
pub struct NormalizedFile {
    path: TempPath,
    size: u64,
}

impl NormalizedFile {
    /// Take ownership of an already written file at `path`.
    pub fn from_path(path: impl Into<PathBuf>) -> IngestResult<Self> {
        let path = TempPath::from_path(path);
        let size = std::fs::metadata(&path)
            .map_err(|e| IngestError::NormalizeFailed(format!("missing output: {}", e)))?
            .len();
        Ok(Self { path, size })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn open(&self) -> IngestResult<tokio::fs::File> {
        tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| IngestError::NormalizeFailed(format!("open output: {}", e)))
    }
}

/// Output location for a normalized copy of `input`.
pub fn processing_path(input: &Path) -> PathBuf {
    let mut raw: OsString = input.as_os_str().to_owned();
    raw.push(".processing");
    PathBuf::from(raw)
}

/// Rewrites a container so it can be played before it is fully downloaded.
///
/// The input file is left untouched.
#[async_trait]
pub trait ContainerNormalizer: Send + Sync {
    async fn normalize(&self, input: &Path) -> IngestResult<NormalizedFile>;
}

/// Normalizer backed by `ffmpeg -c copy -movflags faststart`.
#[derive(Debug, Clone)]
pub struct FfmpegFastStart {
    ffmpeg_path: String,
}

impl FfmpegFastStart {
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl Default for FfmpegFastStart {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl ContainerNormalizer for FfmpegFastStart {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn normalize(&self, input: &Path) -> IngestResult<NormalizedFile> {
        check_media_path(input).map_err(|e| IngestError::NormalizeFailed(e.to_string()))?;

        let output_path = processing_path(input);
        // Removes partial output on every exit path.
        let guard = TempPath::from_path(&output_path);
        let start = std::time::Instant::now();

        let args: [&OsStr; 12] = [
            OsStr::new("-nostdin"),
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-c"),
            OsStr::new("copy"),
            OsStr::new("-movflags"),
            OsStr::new("faststart"),
            OsStr::new("-f"),
            OsStr::new("mp4"),
            output_path.as_os_str(),
        ];

        run_tool(&self.ffmpeg_path, args)
            .await
            .map_err(|e| IngestError::NormalizeFailed(e.to_string()))?;

        let size = tokio::fs::metadata(&output_path)
            .await
            .map_err(|e| IngestError::NormalizeFailed(format!("missing output: {}", e)))?
            .len();
        if size == 0 {
            return Err(IngestError::NormalizeFailed("empty output".to_string()));
        }

        tracing::info!(
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Fast-start remux completed"
        );

        Ok(NormalizedFile { path: guard, size })
    }
}
