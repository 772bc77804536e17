//! Tubely Processing Library
//!
//! The media ingestion pipeline. An upload moves through
//! `Received → Staged → Classified → Normalized → KeyPlanned → Uploaded → Done`;
//! every temporary file is owned by a guard that deletes it on drop, so any
//! early return (or panic) releases what earlier stages allocated.
//!
//! - [`stager`]: bounded copy of the inbound byte stream into scratch storage
//! - [`aspect`]: display-aspect-ratio probe and bucketing
//! - [`normalize`]: fast-start remux
//! - [`keys`]: random object keys namespaced by aspect bucket
//! - [`ingest`]: the video orchestrator
//! - [`thumbnail`]: the two-stage thumbnail variant writing to the asset directory

pub mod aspect;
pub mod error;
pub mod ingest;
pub mod keys;
pub mod media_type;
pub mod normalize;
pub mod stager;
pub mod thumbnail;
mod tool;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use aspect::{AspectBucket, AspectClassifier, FfprobeClassifier};
pub use error::{IngestError, IngestResult};
pub use ingest::{IngestOutcome, UploadRequest, VideoIngestor};
pub use keys::{plan_object_key, random_token, ObjectKey};
pub use normalize::{ContainerNormalizer, FfmpegFastStart, NormalizedFile};
pub use stager::{StagedFile, StreamStager};
pub use thumbnail::{ThumbnailIngestor, ThumbnailOutcome};
