//! Bounded copy of an inbound byte stream into scratch storage.

use crate::error::{IngestError, IngestResult};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

/// A file in scratch storage owned by exactly one request.
///
/// Dropping it removes the file.
#[derive(Debug)]
pub struct StagedFile {
    path: TempPath,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remove the file now, ignoring "already gone".
    pub fn discard(self) {
        let path = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(error = %e, path = %path.display(), "Failed to remove staged file");
            }
        }
    }

    /// Move the file to `dest`, releasing it from scratch cleanup.
    ///
    /// Falls back to copy-then-remove when a rename is refused (e.g. scratch
    /// and `dest` are on different filesystems).
    pub async fn persist(self, dest: &Path) -> IngestResult<()> {
        match self.path.persist(dest) {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::debug!(
                    error = %e.error,
                    dest = %dest.display(),
                    "Rename refused, copying staged file"
                );
                copy_into_place(e.path, dest).await
            }
        }
    }
}

/// Copy `source` to `dest`; a partial `dest` is removed on failure and `source`
/// is removed either way.
async fn copy_into_place(source: TempPath, dest: &Path) -> IngestResult<()> {
    let target = TempPath::from_path(dest);
    tokio::fs::copy(&source, &target).await.map_err(|e| {
        IngestError::StagingFailed(format!("persist to {}: {}", dest.display(), e))
    })?;
    target.keep().map_err(|e| {
        IngestError::StagingFailed(format!("persist to {}: {}", dest.display(), e.error))
    })?;
    drop(source);
    Ok(())
}

/// Copies request bodies into process-unique files under a scratch directory.
#[derive(Debug, Clone)]
pub struct StreamStager {
    scratch_dir: PathBuf,
    prefix: String,
}

impl StreamStager {
    pub fn new(scratch_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            prefix: prefix.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Copy `stream` to EOF into a fresh scratch file.
    ///
    /// Fails with `PayloadTooLarge` as soon as more than `size_limit` bytes have
    /// been read, or before anything is written if `declared_size` already
    /// exceeds it. On any failure the partial file is removed.
    pub async fn stage<S, E>(
        &self,
        stream: S,
        size_limit: u64,
        declared_size: Option<u64>,
    ) -> IngestResult<StagedFile>
    where
        S: Stream<Item = Result<Bytes, E>> + Send,
        E: Display,
    {
        if let Some(declared) = declared_size {
            if declared > size_limit {
                return Err(IngestError::PayloadTooLarge { limit: size_limit });
            }
        }

        let start = std::time::Instant::now();

        let (file, path) = tempfile::Builder::new()
            .prefix(&self.prefix)
            .tempfile_in(&self.scratch_dir)
            .map_err(|e| {
                IngestError::StagingFailed(format!(
                    "create scratch file in {}: {}",
                    self.scratch_dir.display(),
                    e
                ))
            })?
            .into_parts();

        let mut file = tokio::fs::File::from_std(file);
        let mut stream = std::pin::pin!(stream);
        let mut size: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| IngestError::StagingFailed(format!("read body: {}", e)))?;

            size += chunk.len() as u64;
            if size > size_limit {
                tracing::warn!(
                    limit_bytes = size_limit,
                    read_bytes = size,
                    "Upload exceeded size limit, aborting copy"
                );
                return Err(IngestError::PayloadTooLarge { limit: size_limit });
            }

            file.write_all(&chunk)
                .await
                .map_err(|e| IngestError::StagingFailed(format!("write scratch file: {}", e)))?;
        }

        file.flush()
            .await
            .map_err(|e| IngestError::StagingFailed(format!("flush scratch file: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| IngestError::StagingFailed(format!("sync scratch file: {}", e)))?;
        drop(file);

        tracing::debug!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Upload staged"
        );

        Ok(StagedFile { path, size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;
    use tempfile::tempdir;

    fn chunks(parts: Vec<&'static [u8]>) -> impl Stream<Item = Result<Bytes, io::Error>> + Send {
        stream::iter(parts.into_iter().map(|p| Ok(Bytes::from_static(p))))
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_copies_all_bytes() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let staged = stager
            .stage(chunks(vec![b"hello ", b"world"]), 1024, Some(11))
            .await
            .unwrap();

        assert_eq!(staged.size(), 11);
        assert_eq!(std::fs::read(staged.path()).unwrap(), b"hello world");
        assert!(staged.path().starts_with(dir.path()));
        let name = staged.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("tubely-upload-"));
    }

    #[tokio::test]
    async fn test_staged_file_removed_on_drop() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let staged = stager.stage(chunks(vec![b"abc"]), 16, None).await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_discard_tolerates_already_removed() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let staged = stager.stage(chunks(vec![b"abc"]), 16, None).await.unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        staged.discard();
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_oversize_stream_fails_and_leaves_nothing() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let result = stager
            .stage(chunks(vec![b"0123456789", b"0123456789"]), 15, None)
            .await;

        assert!(matches!(result, Err(IngestError::PayloadTooLarge { limit: 15 })));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_declared_oversize_rejected_before_file_created() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let result = stager.stage(chunks(vec![b"x"]), 15, Some(16)).await;

        assert!(matches!(result, Err(IngestError::PayloadTooLarge { .. })));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_exact_limit_is_accepted() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let staged = stager.stage(chunks(vec![b"12345"]), 5, Some(5)).await.unwrap();
        assert_eq!(staged.size(), 5);
    }

    #[tokio::test]
    async fn test_stream_error_removes_partial_file() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path(), "tubely-upload-");

        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "client went away")),
        ]);

        let result = stager.stage(body, 1024, None).await;

        match result {
            Err(IngestError::StagingFailed(msg)) => assert!(msg.contains("client went away")),
            other => panic!("expected StagingFailed, got {:?}", other),
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_scratch_dir_is_staging_failure() {
        let dir = tempdir().unwrap();
        let stager = StreamStager::new(dir.path().join("missing"), "tubely-upload-");

        let result = stager.stage(chunks(vec![b"abc"]), 16, None).await;
        assert!(matches!(result, Err(IngestError::StagingFailed(_))));
    }

    #[tokio::test]
    async fn test_persist_moves_file_out_of_scratch() {
        let scratch = tempdir().unwrap();
        let assets = tempdir().unwrap();
        let stager = StreamStager::new(scratch.path(), "tubely-thumb-");

        let staged = stager.stage(chunks(vec![b"png"]), 16, None).await.unwrap();
        let dest = assets.path().join("token.png");
        staged.persist(&dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"png");
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_copy_into_place_removes_source() {
        let scratch = tempdir().unwrap();
        let assets = tempdir().unwrap();
        let stager = StreamStager::new(scratch.path(), "tubely-thumb-");

        let staged = stager.stage(chunks(vec![b"gif"]), 16, None).await.unwrap();
        let dest = assets.path().join("token.gif");
        copy_into_place(staged.path, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"gif");
        assert_eq!(entries(scratch.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_persist_cleans_up_both_sides() {
        let scratch = tempdir().unwrap();
        let assets = tempdir().unwrap();
        let stager = StreamStager::new(scratch.path(), "tubely-thumb-");

        let staged = stager.stage(chunks(vec![b"jpg"]), 16, None).await.unwrap();
        let dest = assets.path().join("missing-dir").join("token.jpg");
        let result = staged.persist(&dest).await;

        assert!(matches!(result, Err(IngestError::StagingFailed(_))));
        assert_eq!(entries(scratch.path()), 0);
        assert_eq!(entries(assets.path()), 0);
    }
}
