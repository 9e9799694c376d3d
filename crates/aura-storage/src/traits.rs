//! Storage abstraction trait
//!
//! This module defines the ObjectStorage trait that all storage backends
//! must implement.

use aura_core::{AppError, StorageBackend};
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

// Orphan rule: StorageError is local, so the bridge into AppError lives here.
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::UploadFailed(msg) => AppError::Storage(msg),
            StorageError::DownloadFailed(msg) => AppError::Storage(msg),
            StorageError::DeleteFailed(msg) => AppError::Storage(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::BackendError(msg) => AppError::Storage(msg),
            StorageError::IoError(err) => AppError::Internal(format!("IO error: {}", err)),
            StorageError::ConfigError(msg) => AppError::Config(msg),
        }
    }
}

/// Storage abstraction trait
///
/// All backends (S3, local filesystem, in-memory) implement this trait so the
/// ingestion and deletion services can work against any of them without
/// coupling to implementation details.
///
/// **Key format:** see the crate root documentation and the `keys` module.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write an object at the given key, replacing any existing object.
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Read an object's bytes by key.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete an object by key. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Copy an object from one key to another, replacing the destination.
    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()>;

    /// List all object keys starting with the given prefix, sorted.
    ///
    /// For directory-style sweeps the prefix must end with `/`; without it,
    /// backends disagree on whether `a/b-2` matches the prefix `a/b`.
    async fn list_by_prefix(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
