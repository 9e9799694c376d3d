//! Narrow async store traits the services program against.
//!
//! The Postgres repositories implement these by delegation; `test_support`
//! carries an in-memory implementation. Services take `Arc<dyn ...Store>` so
//! tests never need a database.

use async_trait::async_trait;
use aura_core::{
    models::{Album, AlbumResolution, FaceIdentity, NewAlbum, NewPhoto, Photo, PhotoFaceLink},
    AppError,
};
use uuid::Uuid;

use crate::db::{AlbumRepository, FaceRepository, PermissionRepository, PhotoRepository};

/// Everything the post-commit cleanup needs after an album cascade: the
/// deleted album row, its photo filenames, and the identity keys whose last
/// reference lived in this album.
#[derive(Clone, Debug)]
pub struct AlbumCascade {
    pub album: Album,
    pub photo_filenames: Vec<String>,
    pub orphaned_face_keys: Vec<String>,
}

/// Post-commit cleanup data for a single-photo cascade.
#[derive(Clone, Debug)]
pub struct PhotoCascade {
    pub photo: Photo,
    pub orphaned_face_keys: Vec<String>,
}

/// A photo awaiting blur backfill, joined with the album slug that prefixes
/// its object key.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct BlurBackfillRow {
    pub photo_id: Uuid,
    pub album_id: Uuid,
    pub filename: String,
    pub album_slug: String,
}

#[async_trait]
pub trait AlbumStore: Send + Sync {
    /// Create the album under its slug or return the existing one.
    async fn resolve_for_upload(&self, new_album: NewAlbum) -> Result<AlbumResolution, AppError>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError>;

    /// Delete the album and its dependent rows in one transaction. External
    /// state (objects, provider entries) is the caller's to clean up after.
    async fn delete_album_cascade(&self, slug: &str) -> Result<AlbumCascade, AppError>;
}

#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Insert the photo row with its atomic album-counter increment.
    async fn insert_photo(&self, new_photo: NewPhoto) -> Result<Photo, AppError>;

    async fn photos_missing_blur(&self) -> Result<Vec<BlurBackfillRow>, AppError>;

    async fn set_blur_data_url(&self, photo_id: Uuid, blur_data_url: &str)
        -> Result<(), AppError>;

    /// Delete one photo with link cleanup, identity GC, and the atomic
    /// counter decrement.
    async fn delete_photo_cascade(
        &self,
        album_slug: &str,
        filename: &str,
    ) -> Result<PhotoCascade, AppError>;
}

#[async_trait]
pub trait FaceStore: Send + Sync {
    /// Insert-or-ignore on the unique external key.
    async fn upsert_identity(&self, external_id: &str) -> Result<(), AppError>;

    async fn insert_link(
        &self,
        photo_id: Uuid,
        face_external_id: &str,
        album_id: Uuid,
    ) -> Result<PhotoFaceLink, AppError>;

    async fn set_identity_name(
        &self,
        external_id: &str,
        name: &str,
    ) -> Result<FaceIdentity, AppError>;

    async fn list_identities(&self) -> Result<Vec<FaceIdentity>, AppError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Idempotent on the unique (user, album) pair.
    async fn grant(&self, user_id: Uuid, album_id: Uuid) -> Result<(), AppError>;

    async fn readable_album_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError>;
}

#[async_trait]
impl AlbumStore for AlbumRepository {
    async fn resolve_for_upload(&self, new_album: NewAlbum) -> Result<AlbumResolution, AppError> {
        AlbumRepository::resolve_for_upload(self, new_album).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Album>, AppError> {
        AlbumRepository::get_by_slug(self, slug).await
    }

    async fn delete_album_cascade(&self, slug: &str) -> Result<AlbumCascade, AppError> {
        AlbumRepository::delete_album_cascade(self, slug).await
    }
}

#[async_trait]
impl PhotoStore for PhotoRepository {
    async fn insert_photo(&self, new_photo: NewPhoto) -> Result<Photo, AppError> {
        PhotoRepository::insert_photo(self, new_photo).await
    }

    async fn photos_missing_blur(&self) -> Result<Vec<BlurBackfillRow>, AppError> {
        PhotoRepository::photos_missing_blur(self).await
    }

    async fn set_blur_data_url(
        &self,
        photo_id: Uuid,
        blur_data_url: &str,
    ) -> Result<(), AppError> {
        PhotoRepository::set_blur_data_url(self, photo_id, blur_data_url).await
    }

    async fn delete_photo_cascade(
        &self,
        album_slug: &str,
        filename: &str,
    ) -> Result<PhotoCascade, AppError> {
        PhotoRepository::delete_photo_cascade(self, album_slug, filename).await
    }
}

#[async_trait]
impl FaceStore for FaceRepository {
    async fn upsert_identity(&self, external_id: &str) -> Result<(), AppError> {
        FaceRepository::upsert_identity(self, external_id).await
    }

    async fn insert_link(
        &self,
        photo_id: Uuid,
        face_external_id: &str,
        album_id: Uuid,
    ) -> Result<PhotoFaceLink, AppError> {
        FaceRepository::insert_link(self, photo_id, face_external_id, album_id).await
    }

    async fn set_identity_name(
        &self,
        external_id: &str,
        name: &str,
    ) -> Result<FaceIdentity, AppError> {
        FaceRepository::set_identity_name(self, external_id, name).await
    }

    async fn list_identities(&self) -> Result<Vec<FaceIdentity>, AppError> {
        FaceRepository::list_identities(self).await
    }
}

#[async_trait]
impl PermissionStore for PermissionRepository {
    async fn grant(&self, user_id: Uuid, album_id: Uuid) -> Result<(), AppError> {
        PermissionRepository::grant(self, user_id, album_id).await
    }

    async fn readable_album_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, AppError> {
        PermissionRepository::readable_album_ids(self, user_id).await
    }
}
