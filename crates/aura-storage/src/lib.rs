//! Object storage abstraction for the gallery pipeline.
//!
//! This crate provides the `ObjectStorage` trait and its backends: S3 (via
//! `object_store`), local filesystem, and an in-memory store for tests.
//!
//! # Key layout
//!
//! All keys are produced by the `keys` module so every backend and caller
//! agrees on the layout:
//!
//! - originals: `{album_slug}/{filename}`
//! - compressed derivatives: `{album_slug}/compressed/{filename}`
//! - face thumbnails: `faces/{external_key}.jpg`
//! - transient face crops: `temp_faces/{photo_id}_{index}.jpg`
//!
//! Keys must not contain `..` or a leading `/`.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use aura_core::StorageBackend;
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ObjectStorage, StorageError, StorageResult};
