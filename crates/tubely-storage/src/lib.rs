//! Tubely Storage Library
//!
//! Durable object store abstraction and its backends (S3 and local filesystem).
//!
//! # Storage key format
//!
//! Uploaded videos are stored under `{folder}/{token}` where `folder` is the
//! aspect bucket (`landscape`, `portrait`, `other`) and `token` is a random
//! URL-safe identifier. Keys must not contain `..` or a leading `/`; every
//! backend rejects such keys with [`StorageError::InvalidKey`].

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{validate_key, ByteReader, Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
