//! Pixport Storage Library
//!
//! This crate provides the storage abstraction and implementations for
//! Pixport. It includes the Storage trait, implementations for S3-compatible
//! providers and the local filesystem, and upload-key derivation.
//!
//! # Storage key format
//!
//! Uploaded images live under the `uploads/` prefix:
//!
//! - **Flat upload**: `uploads/{millis}-{uuid}.{ext}`
//! - **Folder upload**: `uploads/{folder}-{batch_tag}/{rest...}/{millis}-{uuid}.{ext}`
//!
//! The batch tag is a random segment appended to the first folder component
//! so separate batches uploading the same folder name never collide. Keys
//! must not contain `..` or a leading `/`. Key generation is centralized in
//! the `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{sanitize_filename, UploadKeyBuilder, UPLOADS_PREFIX};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use pixport_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectInfo, Storage, StorageError, StorageResult};
