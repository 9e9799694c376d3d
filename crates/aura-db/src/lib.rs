//! Aura Metadata Store
//!
//! Postgres repositories for albums, photos, face identities, users, and
//! permissions, plus the narrow async store traits the services program
//! against. `test_support` carries an in-memory implementation of those
//! traits for downstream tests.

pub mod db;
pub mod stores;
pub mod test_support;

// Re-export commonly used types
pub use db::{
    AlbumRepository, FaceRepository, PermissionRepository, PhotoRepository, UserRepository,
};
pub use stores::{
    AlbumCascade, AlbumStore, BlurBackfillRow, FaceStore, PermissionStore, PhotoCascade,
    PhotoStore,
};
