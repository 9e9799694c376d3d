//! Aura Core Library
//!
//! Core domain models, error types, and configuration shared across all
//! Aura components.
//!
//! The `sqlx` feature gates the database-backed pieces (`FromRow` derives and
//! the `Database` error variant); disable it for consumers that never touch
//! the metadata store.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, FaceSettings, MediaSettings};
pub use error::AppError;
pub use storage_types::StorageBackend;
