//! Display-aspect-ratio probing and bucketing.

use crate::error::{IngestError, IngestResult};
use crate::tool::{check_media_path, run_tool};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::path::Path;

/// Storage namespace for a video, derived from its display aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectBucket {
    Landscape,
    Portrait,
    Other,
}

impl AspectBucket {
    /// Exact label match on the probed ratio string. No numeric tolerance:
    /// `"16:10"` or `"1920:1080"` land in `Other`.
    pub fn from_ratio(ratio: &str) -> Self {
        match ratio {
            "16:9" => AspectBucket::Landscape,
            "9:16" => AspectBucket::Portrait,
            _ => AspectBucket::Other,
        }
    }

    /// Object key folder for this bucket.
    pub fn folder(&self) -> &'static str {
        match self {
            AspectBucket::Landscape => "landscape",
            AspectBucket::Portrait => "portrait",
            AspectBucket::Other => "other",
        }
    }
}

impl fmt::Display for AspectBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

/// Decides which bucket a staged video belongs to.
///
/// Implementations must be read-only with respect to the file.
#[async_trait]
pub trait AspectClassifier: Send + Sync {
    async fn classify(&self, path: &Path) -> IngestResult<AspectBucket>;
}

/// Classifier backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeClassifier {
    ffprobe_path: String,
}

impl FfprobeClassifier {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

impl Default for FfprobeClassifier {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    display_aspect_ratio: Option<String>,
}

/// Interpret ffprobe's JSON for the first video stream.
pub fn parse_probe_output(stdout: &[u8]) -> IngestResult<AspectBucket> {
    let output: ProbeOutput = serde_json::from_slice(stdout)
        .map_err(|e| IngestError::ProbeFailed(format!("unparsable ffprobe output: {}", e)))?;

    let stream = output
        .streams
        .first()
        .ok_or_else(|| IngestError::ProbeFailed("no video stream found".to_string()))?;

    Ok(stream
        .display_aspect_ratio
        .as_deref()
        .map(AspectBucket::from_ratio)
        .unwrap_or(AspectBucket::Other))
}

#[async_trait]
impl AspectClassifier for FfprobeClassifier {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    async fn classify(&self, path: &Path) -> IngestResult<AspectBucket> {
        check_media_path(path).map_err(|e| IngestError::ProbeFailed(e.to_string()))?;

        let args: [&OsStr; 9] = [
            OsStr::new("-v"),
            OsStr::new("error"),
            OsStr::new("-print_format"),
            OsStr::new("json"),
            OsStr::new("-select_streams"),
            OsStr::new("v:0"),
            OsStr::new("-show_entries"),
            OsStr::new("stream=display_aspect_ratio"),
            path.as_os_str(),
        ];

        let output = run_tool(&self.ffprobe_path, args)
            .await
            .map_err(|e| IngestError::ProbeFailed(e.to_string()))?;

        let bucket = parse_probe_output(&output.stdout)?;
        tracing::info!(bucket = %bucket, "Aspect ratio classified");
        Ok(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_ratio_mapping() {
        assert_eq!(AspectBucket::from_ratio("16:9"), AspectBucket::Landscape);
        assert_eq!(AspectBucket::from_ratio("9:16"), AspectBucket::Portrait);
        assert_eq!(AspectBucket::from_ratio("4:3"), AspectBucket::Other);
        assert_eq!(AspectBucket::from_ratio("16:10"), AspectBucket::Other);
        assert_eq!(AspectBucket::from_ratio("1920:1080"), AspectBucket::Other);
        assert_eq!(AspectBucket::from_ratio(" 16:9"), AspectBucket::Other);
    }

    #[test]
    fn test_folders() {
        assert_eq!(AspectBucket::Landscape.folder(), "landscape");
        assert_eq!(AspectBucket::Portrait.to_string(), "portrait");
        assert_eq!(
            serde_json::to_string(&AspectBucket::Other).unwrap(),
            "\"other\""
        );
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{"programs":[],"streams":[{"display_aspect_ratio":"9:16"}]}"#;
        assert_eq!(parse_probe_output(json).unwrap(), AspectBucket::Portrait);

        let json = br#"{"streams":[{"display_aspect_ratio":"16:9"}]}"#;
        assert_eq!(parse_probe_output(json).unwrap(), AspectBucket::Landscape);
    }

    #[test]
    fn test_parse_probe_output_without_ratio_is_other() {
        let json = br#"{"streams":[{}]}"#;
        assert_eq!(parse_probe_output(json).unwrap(), AspectBucket::Other);
    }

    #[test]
    fn test_parse_probe_output_failures() {
        assert!(matches!(
            parse_probe_output(br#"{"streams":[]}"#),
            Err(IngestError::ProbeFailed(_))
        ));
        assert!(matches!(
            parse_probe_output(br#"{}"#),
            Err(IngestError::ProbeFailed(_))
        ));
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(IngestError::ProbeFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_probe_failure() {
        let classifier = FfprobeClassifier::new("tubely-missing-ffprobe");
        let result = classifier.classify(Path::new("/tmp/does-not-matter.mp4")).await;
        assert!(matches!(result, Err(IngestError::ProbeFailed(_))));
    }

    #[tokio::test]
    async fn test_non_media_file_is_probe_failure() {
        if run_tool("ffprobe", ["-version"]).await.is_err() {
            eprintln!("ffprobe not available, skipping");
            return;
        }

        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), b"definitely not an mp4").unwrap();

        let result = FfprobeClassifier::default().classify(file.path()).await;
        assert!(matches!(result, Err(IngestError::ProbeFailed(_))));
    }
}
