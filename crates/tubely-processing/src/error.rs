use thiserror::Error;
use tubely_core::AppError;
use tubely_storage::StorageError;
use uuid::Uuid;

/// Failures of a single ingestion request.
///
/// Every variant is per-request; none of them leaves a temporary file behind.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Video {0} not found")]
    VideoNotFound(Uuid),

    #[error("User {user_id} does not own video {video_id}")]
    Forbidden { video_id: Uuid, user_id: Uuid },

    #[error("Metadata lookup failed: {0}")]
    MetadataLookupFailed(#[source] AppError),

    #[error("Upload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Staging failed: {0}")]
    StagingFailed(String),

    #[error("Probe failed: {0}")]
    ProbeFailed(String),

    #[error("Normalize failed: {0}")]
    NormalizeFailed(String),

    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Upload to object store failed: {0}")]
    UploadFailed(#[source] StorageError),

    /// The object (or asset file) at `location` was written and stays in place.
    #[error("Metadata update failed for video {video_id}; {location} remains stored")]
    MetadataUpdateFailed {
        video_id: Uuid,
        location: String,
        #[source]
        source: AppError,
    },
}

pub type IngestResult<T> = Result<T, IngestError>;

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedMediaType(content_type) => {
                AppError::UnsupportedMediaType(content_type)
            }
            IngestError::VideoNotFound(_) => AppError::NotFound("Unable to find video".to_string()),
            IngestError::Forbidden { .. } => {
                AppError::Forbidden("You are not the owner of this video".to_string())
            }
            IngestError::MetadataLookupFailed(source) => source,
            IngestError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(format!(
                "Upload exceeds the maximum allowed size of {} MB",
                limit / 1024 / 1024
            )),
            err @ (IngestError::StagingFailed(_)
            | IngestError::ProbeFailed(_)
            | IngestError::NormalizeFailed(_)) => AppError::MediaProcessing(err.to_string()),
            err @ IngestError::EntropyUnavailable(_) => AppError::Internal(err.to_string()),
            IngestError::UploadFailed(source) => AppError::UploadFailed(source.to_string()),
            err @ IngestError::MetadataUpdateFailed { .. } => {
                AppError::MetadataUpdateFailed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tubely_core::ErrorMetadata;

    #[test]
    fn test_status_mapping() {
        let cases: Vec<(IngestError, u16)> = vec![
            (IngestError::UnsupportedMediaType("video/avi".into()), 400),
            (IngestError::VideoNotFound(Uuid::nil()), 404),
            (
                IngestError::Forbidden {
                    video_id: Uuid::nil(),
                    user_id: Uuid::nil(),
                },
                403,
            ),
            (IngestError::PayloadTooLarge { limit: 1 << 30 }, 413),
            (IngestError::StagingFailed("disk full".into()), 400),
            (IngestError::ProbeFailed("exit status 1".into()), 400),
            (IngestError::NormalizeFailed("no output".into()), 400),
            (
                IngestError::UploadFailed(StorageError::UploadFailed("reset".into())),
                400,
            ),
            (
                IngestError::MetadataUpdateFailed {
                    video_id: Uuid::nil(),
                    location: "landscape/abc".into(),
                    source: AppError::Internal("db down".into()),
                },
                400,
            ),
            (IngestError::EntropyUnavailable("getrandom".into()), 500),
        ];

        for (err, status) in cases {
            let label = err.to_string();
            let app: AppError = err.into();
            assert_eq!(app.http_status_code(), status, "{}", label);
        }
    }

    #[test]
    fn test_unsupported_media_type_client_message() {
        let app: AppError = IngestError::UnsupportedMediaType("video/avi".into()).into();
        assert_eq!(app.client_message(), "Invalid file type");
    }

    #[test]
    fn test_lookup_failure_keeps_underlying_error() {
        let app: AppError =
            IngestError::MetadataLookupFailed(AppError::Internal("pool timed out".into())).into();
        assert!(matches!(app, AppError::Internal(_)));
    }
}
