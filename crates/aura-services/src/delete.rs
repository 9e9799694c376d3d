//! Album and photo deletion.
//!
//! Deletes run in two phases: one database transaction removes the rows in
//! foreign-key order and reports which face identities lost their last link,
//! then external state (provider collection entries, stored objects) is
//! cleaned up best-effort. A failed external delete is logged, never
//! surfaced; re-running the delete is the recovery path.

use std::sync::Arc;

use aura_core::AppError;
use aura_db::{AlbumCascade, AlbumStore, PhotoCascade, PhotoStore};
use aura_faces::FaceProvider;
use aura_storage::{keys, ObjectStorage};

#[derive(Clone)]
pub struct DeletionService {
    albums: Arc<dyn AlbumStore>,
    photos: Arc<dyn PhotoStore>,
    storage: Arc<dyn ObjectStorage>,
    provider: Arc<dyn FaceProvider>,
    collection_id: String,
}

impl DeletionService {
    pub fn new(
        albums: Arc<dyn AlbumStore>,
        photos: Arc<dyn PhotoStore>,
        storage: Arc<dyn ObjectStorage>,
        provider: Arc<dyn FaceProvider>,
        collection_id: String,
    ) -> Self {
        Self {
            albums,
            photos,
            storage,
            provider,
            collection_id,
        }
    }

    /// Delete an album with everything in it.
    #[tracing::instrument(skip(self))]
    pub async fn delete_album(&self, slug: &str) -> Result<AlbumCascade, AppError> {
        let cascade = self.albums.delete_album_cascade(slug).await?;

        // Rows are gone; everything past this point is irreversible external
        // cleanup and must not fail the call.
        self.cleanup_orphaned_identities(&cascade.orphaned_face_keys)
            .await;
        self.sweep_prefix(&format!("{}/", cascade.album.slug)).await;

        tracing::info!(
            album_id = %cascade.album.id,
            photos = cascade.photo_filenames.len(),
            orphaned_identities = cascade.orphaned_face_keys.len(),
            "Album deleted"
        );
        Ok(cascade)
    }

    /// Delete a single photo from an album.
    #[tracing::instrument(skip(self))]
    pub async fn delete_photo(
        &self,
        album_slug: &str,
        filename: &str,
    ) -> Result<PhotoCascade, AppError> {
        let cascade = self.photos.delete_photo_cascade(album_slug, filename).await?;

        self.cleanup_orphaned_identities(&cascade.orphaned_face_keys)
            .await;
        self.delete_object(&keys::original_key(album_slug, filename))
            .await;
        self.delete_object(&keys::compressed_key(album_slug, filename))
            .await;

        tracing::info!(
            photo_id = %cascade.photo.id,
            orphaned_identities = cascade.orphaned_face_keys.len(),
            "Photo deleted"
        );
        Ok(cascade)
    }

    /// Drop identities that lost their last link from the provider
    /// collection and remove their promoted thumbnails.
    async fn cleanup_orphaned_identities(&self, external_keys: &[String]) {
        if external_keys.is_empty() {
            return;
        }

        if let Err(error) = self
            .provider
            .delete_faces(&self.collection_id, external_keys)
            .await
        {
            tracing::warn!(
                keys = external_keys.len(),
                error = %error,
                "Failed to remove orphaned faces from the collection"
            );
        }

        for key in external_keys {
            self.delete_object(&keys::face_thumbnail_key(key)).await;
        }
    }

    async fn sweep_prefix(&self, prefix: &str) {
        let object_keys = match self.storage.list_by_prefix(prefix).await {
            Ok(object_keys) => object_keys,
            Err(error) => {
                tracing::warn!(prefix, error = %error, "Failed to list objects for deletion");
                return;
            }
        };

        for key in object_keys {
            self.delete_object(&key).await;
        }
    }

    async fn delete_object(&self, key: &str) {
        if let Err(error) = self.storage.delete(key).await {
            tracing::warn!(key, error = %error, "Failed to delete object");
        }
    }
}
