//! Random object keys namespaced by aspect bucket.

use crate::aspect::AspectBucket;
use crate::error::{IngestError, IngestResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::TryRngCore;
use std::fmt;

/// Entropy per generated name.
pub const TOKEN_BYTES: usize = 32;

/// `TOKEN_BYTES` random bytes, URL-safe base64 without padding.
pub fn random_token<R>(rng: &mut R) -> IngestResult<String>
where
    R: TryRngCore + ?Sized,
{
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes)
        .map_err(|e| IngestError::EntropyUnavailable(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Location of a video in the object store: `{folder}/{token}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub bucket: AspectBucket,
    pub token: String,
}

impl ObjectKey {
    pub fn folder(&self) -> &'static str {
        self.bucket.folder()
    }

    /// URL of this key under a distribution root such as a CDN domain.
    pub fn public_url(&self, distribution_root: &str) -> String {
        format!("{}/{}", distribution_root.trim_end_matches('/'), self)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder(), self.token)
    }
}

/// Plan a fresh key for `bucket`. Keys are never checked for collisions.
pub fn plan_object_key<R>(bucket: AspectBucket, rng: &mut R) -> IngestResult<ObjectKey>
where
    R: TryRngCore + ?Sized,
{
    Ok(ObjectKey {
        bucket,
        token: random_token(rng)?,
    })
}
